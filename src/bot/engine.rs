//! Warden engine - reacts to chat events with commands and lock enforcement.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bot::client::{ChatClient, ChatEvent, IncomingMessage, NicknameChange, ThreadRename};
use crate::bot::commands::{Command, CommandKind};
use crate::bot::registry::ConversationRegistry;
use crate::bot::replies;

/// Engine settings taken from the active configuration.
#[derive(Debug, Clone)]
pub struct WardenConfig {
    pub prefix: String,
    pub admin_id: String,
}

/// A platform call that failed while handling an event.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    Send(String),
    Rename(String),
    Nickname { participant_id: String, message: String },
    Participants(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send(e) => write!(f, "failed to send message: {}", e),
            Self::Rename(e) => write!(f, "failed to change thread name: {}", e),
            Self::Nickname { participant_id, message } => {
                write!(f, "failed to change nickname of {}: {}", participant_id, message)
            }
            Self::Participants(e) => write!(f, "failed to fetch participants: {}", e),
        }
    }
}

impl std::error::Error for CommandError {}

type HandlerResult = Result<(), CommandError>;

/// The warden engine.
pub struct WardenEngine {
    config: WardenConfig,
    client: Arc<dyn ChatClient>,
    registry: Arc<ConversationRegistry>,
}

impl WardenEngine {
    pub fn new(
        config: WardenConfig,
        client: Arc<dyn ChatClient>,
        registry: Arc<ConversationRegistry>,
    ) -> Self {
        Self { config, client, registry }
    }

    fn is_admin(&self, user_id: &str) -> bool {
        user_id == self.config.admin_id
    }

    /// Handle one platform event. Failures are logged, never propagated.
    pub async fn handle_event(&self, event: ChatEvent) {
        let result = match event {
            ChatEvent::Message(msg) => self.handle_message(msg).await,
            ChatEvent::ThreadRenamed(rename) => self.handle_thread_rename(rename).await,
            ChatEvent::NicknameChanged(change) => self.handle_nickname_change(change).await,
        };

        if let Err(e) = result {
            warn!("Command error: {e}");
        }
    }

    async fn handle_message(&self, msg: IncomingMessage) -> HandlerResult {
        if msg.mentions.iter().any(|id| self.is_admin(id)) {
            // A failed taunt must not block command handling below
            if let Err(e) = self.reply(&msg.conversation_id, replies::random_taunt()).await {
                warn!("Taunt failed: {e}");
            }
        }

        let Some(cmd) = Command::parse(&msg.text, &self.config.prefix) else {
            return Ok(());
        };
        debug!("Command {:?} from {} in {}", cmd.kind, msg.sender_id, msg.conversation_id);

        match cmd.kind {
            CommandKind::Group => self.handle_group(&msg, &cmd).await,
            CommandKind::Nickname => self.handle_nickname(&msg, &cmd).await,
            CommandKind::Tid => self.reply(&msg.conversation_id, &replies::group_id(&msg.conversation_id)).await,
            CommandKind::Uid => self.handle_uid(&msg).await,
            CommandKind::Fight => self.handle_fight(&msg, &cmd).await,
            CommandKind::Stop => self.handle_stop(&msg).await,
            CommandKind::Unknown => {
                if self.is_admin(&msg.sender_id) {
                    self.reply(&msg.conversation_id, &replies::help(&self.config.prefix)).await
                } else {
                    self.reply(&msg.conversation_id, replies::REFUSAL).await
                }
            }
        }
    }

    async fn handle_group(&self, msg: &IncomingMessage, cmd: &Command) -> HandlerResult {
        if !self.is_admin(&msg.sender_id) {
            return self.reply(&msg.conversation_id, replies::REFUSAL).await;
        }
        if cmd.sub_command() != Some("on") {
            return Ok(());
        }

        let name = cmd.tail();
        self.registry.lock_group_name(&msg.conversation_id, &name).await;
        info!("🔒 Group name of {} locked to {:?}", msg.conversation_id, name);

        self.client
            .change_thread_name(&msg.conversation_id, &name)
            .await
            .map_err(CommandError::Rename)?;
        self.reply(&msg.conversation_id, &replies::group_locked(&name)).await
    }

    /// Sets every non-admin participant's nickname, one call each. The first
    /// failure aborts the remaining calls.
    async fn handle_nickname(&self, msg: &IncomingMessage, cmd: &Command) -> HandlerResult {
        if !self.is_admin(&msg.sender_id) {
            return self.reply(&msg.conversation_id, replies::REFUSAL).await;
        }
        if cmd.sub_command() != Some("on") {
            return Ok(());
        }

        let nickname = cmd.tail();
        self.registry.lock_nickname(&msg.conversation_id, &nickname).await;
        info!("🔒 Nicknames in {} locked to {:?}", msg.conversation_id, nickname);

        let participants = self
            .client
            .participants(&msg.conversation_id)
            .await
            .map_err(CommandError::Participants)?;

        for participant_id in participants.iter().filter(|id| !self.is_admin(id)) {
            self.client
                .change_nickname(&msg.conversation_id, participant_id, &nickname)
                .await
                .map_err(|message| CommandError::Nickname {
                    participant_id: participant_id.clone(),
                    message,
                })?;
        }

        self.reply(&msg.conversation_id, &replies::nicknames_locked(&nickname)).await
    }

    async fn handle_uid(&self, msg: &IncomingMessage) -> HandlerResult {
        let text = match msg.mentions.first() {
            Some(id) => replies::user_id(id),
            None => replies::own_id(&msg.sender_id),
        };
        self.reply(&msg.conversation_id, &text).await
    }

    async fn handle_fight(&self, msg: &IncomingMessage, cmd: &Command) -> HandlerResult {
        if !self.is_admin(&msg.sender_id) {
            return self.reply(&msg.conversation_id, replies::REFUSAL).await;
        }

        match cmd.sub_command() {
            Some("on") => {
                self.registry.arm_fight(&msg.conversation_id).await;
                info!("⚔️ Fight armed in {}", msg.conversation_id);
                self.reply(&msg.conversation_id, replies::FIGHT_PROMPT).await
            }
            Some("off") => self.stop_fight(&msg.conversation_id).await,
            _ => Ok(()),
        }
    }

    /// Non-admins get no reply at all here.
    async fn handle_stop(&self, msg: &IncomingMessage) -> HandlerResult {
        if !self.is_admin(&msg.sender_id) {
            return Ok(());
        }
        self.stop_fight(&msg.conversation_id).await
    }

    async fn stop_fight(&self, conversation_id: &str) -> HandlerResult {
        if self.registry.stop_fight(conversation_id).await {
            info!("🛑 Fight stopped in {}", conversation_id);
            self.reply(conversation_id, replies::FIGHT_STOPPED).await
        } else {
            Ok(())
        }
    }

    async fn handle_thread_rename(&self, rename: ThreadRename) -> HandlerResult {
        let Some(locked) = self.registry.locked_group_name(&rename.conversation_id).await else {
            return Ok(());
        };
        if self.is_admin(&rename.author_id) || rename.new_name == locked {
            return Ok(());
        }

        info!(
            "🔁 Reverting rename of {} by {} ({:?} -> {:?})",
            rename.conversation_id, rename.author_id, rename.new_name, locked
        );
        self.client
            .change_thread_name(&rename.conversation_id, &locked)
            .await
            .map_err(CommandError::Rename)?;
        self.reply(&rename.conversation_id, &replies::rename_scold(&rename.author_id)).await
    }

    async fn handle_nickname_change(&self, change: NicknameChange) -> HandlerResult {
        let Some(locked) = self.registry.locked_nickname(&change.conversation_id).await else {
            return Ok(());
        };
        if self.is_admin(&change.author_id) || change.new_nickname == locked {
            return Ok(());
        }

        info!(
            "🔁 Reverting nickname of {} in {} set by {}",
            change.participant_id, change.conversation_id, change.author_id
        );
        self.client
            .change_nickname(&change.conversation_id, &change.participant_id, &locked)
            .await
            .map_err(|message| CommandError::Nickname {
                participant_id: change.participant_id.clone(),
                message,
            })?;
        self.reply(&change.conversation_id, &replies::nickname_scold(&change.author_id)).await
    }

    async fn reply(&self, conversation_id: &str, text: &str) -> HandlerResult {
        self.client.send_message(conversation_id, text).await.map_err(CommandError::Send)
    }
}
