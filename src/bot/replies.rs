//! Fixed reply texts.

use rand::seq::IndexedRandom;

/// Sent when a non-admin tries a privileged command.
pub const REFUSAL: &str = "I don't take orders from you. Only my boss can use that.";

pub const FIGHT_PROMPT: &str = "Enter hater's name:";
pub const FIGHT_STOPPED: &str = "Fight mode stopped.";

/// Pool the mention reaction draws from.
pub const TAUNTS: &[&str] = &[
    "Watch how you talk about my boss!",
    "Mention my boss again and see what happens.",
    "My boss is busy. Take it up with me.",
    "Careful, I'm listening to every word about the boss.",
];

pub fn random_taunt() -> &'static str {
    TAUNTS.choose(&mut rand::rng()).copied().unwrap_or(TAUNTS[0])
}

pub fn help(prefix: &str) -> String {
    format!(
        "My prefix is {prefix}. Commands: {prefix} group on <name>, {prefix} nickname on <name>, \
         {prefix} tid, {prefix} uid [@mention], {prefix} fyt on|off, {prefix} stop"
    )
}

pub fn group_locked(name: &str) -> String {
    format!("Group name locked to: {name}. Now only admin can change it.")
}

pub fn nicknames_locked(nickname: &str) -> String {
    format!("All nicknames locked to: {nickname}. Now only admin can change them.")
}

pub fn group_id(conversation_id: &str) -> String {
    format!("Group ID: {conversation_id}")
}

pub fn user_id(user_id: &str) -> String {
    format!("User ID: {user_id}")
}

pub fn own_id(user_id: &str) -> String {
    format!("Your ID: {user_id}")
}

pub fn rename_scold(author_id: &str) -> String {
    format!("Don't change the group name, it's locked. @{author_id}")
}

pub fn nickname_scold(author_id: &str) -> String {
    format!("Don't change anyone's nickname, they're locked. @{author_id}")
}
