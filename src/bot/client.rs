//! Chat platform boundary: the calls the bot makes and the events it receives.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// A text message posted in a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    /// User IDs mentioned in the message, in order of appearance.
    pub mentions: Vec<String>,
}

/// Someone renamed a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadRename {
    pub conversation_id: String,
    pub author_id: String,
    pub new_name: String,
}

/// Someone changed a participant's nickname.
#[derive(Debug, Clone, PartialEq)]
pub struct NicknameChange {
    pub conversation_id: String,
    pub author_id: String,
    pub participant_id: String,
    pub new_nickname: String,
}

/// Events delivered by the platform listener.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Message(IncomingMessage),
    ThreadRenamed(ThreadRename),
    NicknameChanged(NicknameChange),
}

/// Outbound calls against the chat platform.
///
/// Implementations must tolerate concurrent calls: fight timers of several
/// conversations share one client with the event listener.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), String>;

    async fn change_thread_name(&self, conversation_id: &str, name: &str) -> Result<(), String>;

    async fn change_nickname(
        &self,
        conversation_id: &str,
        participant_id: &str,
        nickname: &str,
    ) -> Result<(), String>;

    async fn participants(&self, conversation_id: &str) -> Result<Vec<String>, String>;
}

/// A logged-in platform session.
pub struct Session {
    pub client: Arc<dyn ChatClient>,
    pub events: mpsc::UnboundedReceiver<ChatEvent>,
}

/// Logs into the chat platform with stored credentials.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn login(&self, credentials: &serde_json::Value) -> Result<Session, String>;
}
