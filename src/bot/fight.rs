//! Fight sessions: a per-conversation timer that cycles through scripted lines.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::bot::client::ChatClient;
use crate::bot::registry::ConversationRegistry;

/// Tick interval when the activation request gives none (or a non-positive one).
pub const DEFAULT_DELAY: Duration = Duration::from_millis(3000);

/// Why an activation request was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    /// `fyt on` was never issued for the conversation, or the session was stopped.
    NoActiveSession,
    /// No platform client is logged in for the admin.
    NotInitialized,
}

impl fmt::Display for ActivationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveSession => write!(f, "No active fight session"),
            Self::NotInitialized => write!(f, "Bot not initialized"),
        }
    }
}

impl std::error::Error for ActivationError {}

/// Convert the requested delay in seconds into a tick interval.
pub fn resolve_delay(seconds: Option<f64>) -> Duration {
    match seconds {
        Some(s) if s.is_finite() && s > 0.0 => {
            Duration::from_secs_f64(s).max(Duration::from_millis(1))
        }
        _ => DEFAULT_DELAY,
    }
}

/// What the external trigger supplies to start a fight.
#[derive(Debug, Clone, PartialEq)]
pub struct FightPlan {
    pub hater_name: String,
    pub messages: Vec<String>,
    pub delay: Duration,
}

impl FightPlan {
    /// `messages` is newline-delimited; every line (even an empty one) is a slot in the cycle.
    pub fn new(hater_name: &str, messages: &str, delay_seconds: Option<f64>) -> Self {
        Self {
            hater_name: hater_name.to_string(),
            messages: messages.split('\n').map(str::to_string).collect(),
            delay: resolve_delay(delay_seconds),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FightPhase {
    Idle,
    Armed,
    Running,
}

/// Per-conversation fight state.
#[derive(Debug)]
pub struct FightSession {
    pub active: bool,
    /// Set to 1 on arming. Nothing advances it; activation happens over HTTP.
    pub step: u32,
    pub hater_name: Option<String>,
    pub messages: Vec<String>,
    pub delay: Duration,
    pub current_index: usize,
    /// Identifies the timer allowed to drive this session.
    pub(crate) run_id: u64,
    pub(crate) task: Option<JoinHandle<()>>,
}

impl FightSession {
    pub fn armed() -> Self {
        Self {
            active: true,
            step: 1,
            hater_name: None,
            messages: Vec::new(),
            delay: DEFAULT_DELAY,
            current_index: 0,
            run_id: 0,
            task: None,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> FightPhase {
        match (self.active, &self.task) {
            (false, _) => FightPhase::Idle,
            (true, None) => FightPhase::Armed,
            (true, Some(_)) => FightPhase::Running,
        }
    }

    /// Load a plan, resetting the cycle to the first line.
    pub(crate) fn load(&mut self, plan: FightPlan, run_id: u64) {
        self.hater_name = Some(plan.hater_name);
        self.messages = plan.messages;
        self.delay = plan.delay;
        self.current_index = 0;
        self.run_id = run_id;
    }

    /// Text for the current tick: `"{hater} {line}"`, cycling through the lines.
    pub fn compose(&self) -> Option<String> {
        if self.messages.is_empty() {
            return None;
        }
        let line = &self.messages[self.current_index % self.messages.len()];
        let hater = self.hater_name.as_deref().unwrap_or("");
        Some(format!("{hater} {line}"))
    }

    /// Stop the timer now. Safe to call on an already idle session.
    pub(crate) fn cancel(&mut self) {
        self.active = false;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawn the repeating send loop for one activation of a conversation's fight.
///
/// The first message goes out one `delay` after activation. The loop ends when
/// the session is stopped, replaced by a newer run, or a send fails.
pub(crate) fn spawn_timer(
    registry: Arc<ConversationRegistry>,
    client: Arc<dyn ChatClient>,
    conversation_id: String,
    run_id: u64,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + delay, delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(text) = registry.next_fight_message(&conversation_id, run_id).await else {
                debug!("Fight timer {} for {} no longer active", run_id, conversation_id);
                break;
            };

            match client.send_message(&conversation_id, &text).await {
                Ok(()) => registry.advance_fight(&conversation_id, run_id).await,
                Err(e) => {
                    error!("⚔️ Fight message to {} failed, stopping: {}", conversation_id, e);
                    registry.halt_fight(&conversation_id, run_id).await;
                    break;
                }
            }
        }

        info!("⚔️ Fight timer {} for {} finished", run_id, conversation_id);
    })
}
