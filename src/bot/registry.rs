//! Per-conversation state: name locks and fight sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::info;

use crate::bot::client::ChatClient;
use crate::bot::fight::{self, ActivationError, FightPlan, FightSession};

/// Locks set by the admin for one conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockState {
    pub group_name: Option<String>,
    pub nickname: Option<String>,
}

/// In-memory registry keyed by conversation ID.
///
/// Locks are never released; they last until restart.
#[derive(Default)]
pub struct ConversationRegistry {
    locks: Mutex<HashMap<String, LockState>>,
    fights: Mutex<HashMap<String, FightSession>>,
    next_run_id: AtomicU64,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock_group_name(&self, conversation_id: &str, name: &str) {
        let mut locks = self.locks.lock().await;
        locks.entry(conversation_id.to_string()).or_default().group_name = Some(name.to_string());
    }

    pub async fn lock_nickname(&self, conversation_id: &str, nickname: &str) {
        let mut locks = self.locks.lock().await;
        locks.entry(conversation_id.to_string()).or_default().nickname = Some(nickname.to_string());
    }

    pub async fn locks(&self, conversation_id: &str) -> LockState {
        self.locks.lock().await.get(conversation_id).cloned().unwrap_or_default()
    }

    /// Locked group name, if one is set and non-empty.
    pub async fn locked_group_name(&self, conversation_id: &str) -> Option<String> {
        self.locks(conversation_id).await.group_name.filter(|n| !n.is_empty())
    }

    /// Locked nickname, if one is set and non-empty.
    pub async fn locked_nickname(&self, conversation_id: &str) -> Option<String> {
        self.locks(conversation_id).await.nickname.filter(|n| !n.is_empty())
    }

    /// Start a fresh armed session, cancelling any timer the old one had.
    pub async fn arm_fight(&self, conversation_id: &str) {
        let mut fights = self.fights.lock().await;
        if let Some(old) = fights.get_mut(conversation_id) {
            old.cancel();
        }
        fights.insert(conversation_id.to_string(), FightSession::armed());
    }

    /// Deactivate the conversation's session. Returns whether a session existed.
    pub async fn stop_fight(&self, conversation_id: &str) -> bool {
        let mut fights = self.fights.lock().await;
        match fights.get_mut(conversation_id) {
            Some(session) => {
                session.cancel();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub async fn fight_phase(&self, conversation_id: &str) -> fight::FightPhase {
        self.fights
            .lock()
            .await
            .get(conversation_id)
            .map(FightSession::phase)
            .unwrap_or(fight::FightPhase::Idle)
    }

    pub async fn has_active_fight(&self, conversation_id: &str) -> bool {
        self.fights.lock().await.get(conversation_id).is_some_and(|s| s.active)
    }

    /// Move an armed (or running) session into Running with `plan`.
    ///
    /// A timer left over from a previous activation is cancelled first.
    pub async fn activate_fight(
        self: &Arc<Self>,
        conversation_id: &str,
        plan: FightPlan,
        client: Arc<dyn ChatClient>,
    ) -> Result<(), ActivationError> {
        let mut fights = self.fights.lock().await;
        let session = match fights.get_mut(conversation_id) {
            Some(s) if s.active => s,
            _ => return Err(ActivationError::NoActiveSession),
        };

        if let Some(old) = session.task.take() {
            old.abort();
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed) + 1;
        let delay = plan.delay;
        info!(
            "⚔️ Fight activated in {} against {:?} ({} lines every {:?})",
            conversation_id,
            plan.hater_name,
            plan.messages.len(),
            delay
        );
        session.load(plan, run_id);
        session.task = Some(fight::spawn_timer(
            Arc::clone(self),
            client,
            conversation_id.to_string(),
            run_id,
            delay,
        ));
        Ok(())
    }

    /// Message for the next tick of run `run_id`, or `None` if that run should end.
    pub(crate) async fn next_fight_message(&self, conversation_id: &str, run_id: u64) -> Option<String> {
        let fights = self.fights.lock().await;
        let session = fights.get(conversation_id)?;
        if !session.active || session.run_id != run_id {
            return None;
        }
        session.compose()
    }

    pub(crate) async fn advance_fight(&self, conversation_id: &str, run_id: u64) {
        let mut fights = self.fights.lock().await;
        if let Some(session) = fights.get_mut(conversation_id)
            && session.run_id == run_id
        {
            session.current_index += 1;
        }
    }

    /// Called by the timer itself after a failed send.
    pub(crate) async fn halt_fight(&self, conversation_id: &str, run_id: u64) {
        let mut fights = self.fights.lock().await;
        if let Some(session) = fights.get_mut(conversation_id)
            && session.run_id == run_id
        {
            session.active = false;
            // Dropping our own handle detaches it; the loop exits right after.
            session.task = None;
        }
    }
}
