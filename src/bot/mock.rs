//! Recording platform doubles for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bot::client::{ChatClient, ChatEvent, Connector, Session};

/// One outbound platform call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send { conversation_id: String, text: String },
    Rename { conversation_id: String, name: String },
    Nickname { conversation_id: String, participant_id: String, nickname: String },
    Participants { conversation_id: String },
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    participants: HashMap<String, Vec<String>>,
    /// Successful sends allowed before every further send fails.
    send_budget: Option<usize>,
    fail_renames: bool,
    /// Fail the nickname call for this participant.
    fail_nickname_for: Option<String>,
}

/// Records every call; failures are opt-in.
#[derive(Default)]
pub struct MockChatClient {
    state: Mutex<MockState>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_participants(self, conversation_id: &str, ids: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .participants
            .insert(conversation_id.to_string(), ids.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn fail_sends_after(&self, successes: usize) {
        self.state.lock().unwrap().send_budget = Some(successes);
    }

    pub fn fail_renames(&self) {
        self.state.lock().unwrap().fail_renames = true;
    }

    pub fn fail_nickname_for(&self, participant_id: &str) {
        self.state.lock().unwrap().fail_nickname_for = Some(participant_id.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Texts successfully sent to `conversation_id`, in order.
    pub fn sent_to(&self, conversation_id: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send { conversation_id: id, text } if id == conversation_id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn renames(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Rename { conversation_id, name } => Some((conversation_id, name)),
                _ => None,
            })
            .collect()
    }

    /// `(participant, nickname)` pairs set so far.
    pub fn nicknames(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Nickname { participant_id, nickname, .. } => Some((participant_id, nickname)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), String> {
        let mut state = self.state.lock().unwrap();
        if let Some(budget) = state.send_budget.as_mut() {
            if *budget == 0 {
                return Err("send failed".to_string());
            }
            *budget -= 1;
        }
        state.calls.push(Call::Send {
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn change_thread_name(&self, conversation_id: &str, name: &str) -> Result<(), String> {
        let mut state = self.state.lock().unwrap();
        if state.fail_renames {
            return Err("rename failed".to_string());
        }
        state.calls.push(Call::Rename {
            conversation_id: conversation_id.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    async fn change_nickname(
        &self,
        conversation_id: &str,
        participant_id: &str,
        nickname: &str,
    ) -> Result<(), String> {
        let mut state = self.state.lock().unwrap();
        if state.fail_nickname_for.as_deref() == Some(participant_id) {
            return Err("nickname failed".to_string());
        }
        state.calls.push(Call::Nickname {
            conversation_id: conversation_id.to_string(),
            participant_id: participant_id.to_string(),
            nickname: nickname.to_string(),
        });
        Ok(())
    }

    async fn participants(&self, conversation_id: &str) -> Result<Vec<String>, String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Participants { conversation_id: conversation_id.to_string() });
        Ok(state.participants.get(conversation_id).cloned().unwrap_or_default())
    }
}

/// Hands out a prepared client and keeps the event sender for the test to drive.
pub struct MockConnector {
    pub client: Arc<MockChatClient>,
    events_tx: Mutex<Option<mpsc::UnboundedSender<ChatEvent>>>,
    /// Logins still allowed to succeed; `None` means unlimited.
    logins_left: Mutex<Option<usize>>,
}

impl MockConnector {
    pub fn new(client: Arc<MockChatClient>) -> Self {
        Self { client, events_tx: Mutex::new(None), logins_left: Mutex::new(None) }
    }

    pub fn rejecting() -> Self {
        Self::limited(Arc::new(MockChatClient::new()), 0)
    }

    /// Accept the first `logins` logins, reject every one after.
    pub fn limited(client: Arc<MockChatClient>, logins: usize) -> Self {
        Self { logins_left: Mutex::new(Some(logins)), ..Self::new(client) }
    }

    /// Deliver an event to the most recent session's listener.
    pub fn emit(&self, event: ChatEvent) -> bool {
        match self.events_tx.lock().unwrap().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn login(&self, _credentials: &serde_json::Value) -> Result<Session, String> {
        if let Some(left) = self.logins_left.lock().unwrap().as_mut() {
            if *left == 0 {
                return Err("login rejected".to_string());
            }
            *left -= 1;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events_tx.lock().unwrap() = Some(tx);
        let client: Arc<dyn ChatClient> = self.client.clone();
        Ok(Session { client, events: rx })
    }
}
