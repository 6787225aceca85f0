//! Telegram client using teloxide.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, ChatMemberUpdated, MessageEntityKind};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::bot::client::{
    ChatClient, ChatEvent, Connector, IncomingMessage, NicknameChange, Session, ThreadRename,
};

type EventSender = mpsc::UnboundedSender<ChatEvent>;

fn parse_chat_id(conversation_id: &str) -> Result<ChatId, String> {
    conversation_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| format!("Invalid chat ID: {conversation_id}"))
}

fn parse_user_id(user_id: &str) -> Result<UserId, String> {
    user_id
        .parse::<u64>()
        .map(UserId)
        .map_err(|_| format!("Invalid user ID: {user_id}"))
}

/// Telegram API client.
///
/// Nicknames map onto administrator custom titles, the only per-chat
/// display name a bot can set.
pub struct TelegramClient {
    bot: Bot,
    /// The bot's own user, which can never retitle itself.
    bot_id: UserId,
}

impl TelegramClient {
    pub fn new(bot: Bot, bot_id: UserId) -> Self {
        Self { bot, bot_id }
    }
}

/// Only administrators the bot promoted itself can be retitled; the owner never can.
fn can_retitle(kind: &ChatMemberKind) -> bool {
    matches!(kind, ChatMemberKind::Administrator(a) if a.can_be_edited)
}

/// IDs of `(user, retitleable)` members, skipping the bot itself.
fn retitleable_ids(members: impl IntoIterator<Item = (UserId, bool)>, bot_id: UserId) -> Vec<String> {
    members
        .into_iter()
        .filter(|&(id, editable)| editable && id != bot_id)
        .map(|(id, _)| id.0.to_string())
        .collect()
}

#[async_trait]
impl ChatClient for TelegramClient {
    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), String> {
        let chat_id = parse_chat_id(conversation_id)?;
        self.bot.send_message(chat_id, text).await.map(|_| ()).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    async fn change_thread_name(&self, conversation_id: &str, name: &str) -> Result<(), String> {
        info!("✏️ Setting title of chat {} to {:?}", conversation_id, name);
        let chat_id = parse_chat_id(conversation_id)?;
        self.bot.set_chat_title(chat_id, name).await.map(|_| ()).map_err(|e| {
            let msg = format!("Failed to set chat title: {e}");
            warn!("{}", msg);
            msg
        })
    }

    async fn change_nickname(
        &self,
        conversation_id: &str,
        participant_id: &str,
        nickname: &str,
    ) -> Result<(), String> {
        let chat_id = parse_chat_id(conversation_id)?;
        let user_id = parse_user_id(participant_id)?;
        self.bot
            .set_chat_administrator_custom_title(chat_id, user_id, nickname)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to set custom title: {e}");
                warn!("{}", msg);
                msg
            })
    }

    /// Bots can only list administrators, so that is the participant list,
    /// narrowed to the ones whose title the bot is allowed to change.
    async fn participants(&self, conversation_id: &str) -> Result<Vec<String>, String> {
        let chat_id = parse_chat_id(conversation_id)?;
        let admins = self.bot.get_chat_administrators(chat_id).await.map_err(|e| {
            let msg = format!("Failed to get chat admins: {e}");
            warn!("{}", msg);
            msg
        })?;

        Ok(retitleable_ids(admins.iter().map(|m| (m.user.id, can_retitle(&m.kind))), self.bot_id))
    }
}

/// Logs in with `{"token": "<bot token>"}` credentials.
pub struct TelegramConnector;

#[async_trait]
impl Connector for TelegramConnector {
    async fn login(&self, credentials: &serde_json::Value) -> Result<Session, String> {
        let token = credentials
            .get("token")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "credentials must contain a \"token\" string".to_string())?;

        let bot = Bot::new(token);
        let me = bot.get_me().await.map_err(|e| format!("Login failed: {e}"))?;
        info!("Logged in as @{} ({})", me.username(), me.id);

        let (tx, rx) = mpsc::unbounded_channel::<ChatEvent>();

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(forward_message))
            .branch(Update::filter_chat_member().endpoint(forward_chat_member));

        let listener_gone = tx.clone();
        let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
            .dependencies(dptree::deps![tx])
            .build();
        // Polling stops once the receiving side of this session is dropped
        tokio::spawn(async move {
            tokio::select! {
                _ = dispatcher.dispatch() => {}
                _ = listener_gone.closed() => {}
            }
            info!("Telegram dispatcher stopped");
        });

        let client: Arc<dyn ChatClient> = Arc::new(TelegramClient::new(bot, me.id));
        Ok(Session { client, events: rx })
    }
}

fn emit(tx: &EventSender, event: ChatEvent) {
    if tx.send(event).is_err() {
        warn!("Event listener is gone, dropping Telegram update");
    }
}

async fn forward_message(msg: Message, tx: EventSender) -> ResponseResult<()> {
    let Some(ref user) = msg.from else {
        return Ok(());
    };
    let conversation_id = msg.chat.id.0.to_string();
    let sender_id = user.id.0.to_string();

    if let Some(title) = msg.new_chat_title() {
        emit(&tx, ChatEvent::ThreadRenamed(ThreadRename {
            conversation_id,
            author_id: sender_id,
            new_name: title.to_string(),
        }));
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    let mentions = msg
        .entities()
        .unwrap_or_default()
        .iter()
        .filter_map(|e| match &e.kind {
            MessageEntityKind::TextMention { user } => Some(user.id.0.to_string()),
            _ => None,
        })
        .collect();

    emit(&tx, ChatEvent::Message(IncomingMessage {
        conversation_id,
        sender_id,
        text: text.to_string(),
        mentions,
    }));
    Ok(())
}

fn custom_title(kind: &ChatMemberKind) -> Option<&str> {
    match kind {
        ChatMemberKind::Owner(o) => o.custom_title.as_deref(),
        ChatMemberKind::Administrator(a) => a.custom_title.as_deref(),
        _ => None,
    }
}

async fn forward_chat_member(update: ChatMemberUpdated, tx: EventSender) -> ResponseResult<()> {
    let old_title = custom_title(&update.old_chat_member.kind);
    let new_title = custom_title(&update.new_chat_member.kind);
    if old_title == new_title {
        return Ok(());
    }

    emit(&tx, ChatEvent::NicknameChanged(NicknameChange {
        conversation_id: update.chat.id.0.to_string(),
        author_id: update.from.id.0.to_string(),
        participant_id: update.new_chat_member.user.id.0.to_string(),
        new_nickname: new_title.unwrap_or_default().to_string(),
    }));
    Ok(())
}
