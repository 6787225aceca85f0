//! Process-level service: configuration, platform sessions and the event listener.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::bot::{
    ActivationError, ChatClient, Connector, ConversationRegistry, FightPlan, WardenConfig,
    WardenEngine,
};
use crate::config::{BotConfig, ConfigError, ConfigStore};

pub struct Service {
    store: ConfigStore,
    config: RwLock<Option<BotConfig>>,
    /// Logged-in clients keyed by the admin identity they act for.
    sessions: RwLock<HashMap<String, Arc<dyn ChatClient>>>,
    registry: Arc<ConversationRegistry>,
    connector: Arc<dyn Connector>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Service {
    pub fn new(store: ConfigStore, connector: Arc<dyn Connector>) -> Self {
        Self {
            store,
            config: RwLock::new(None),
            sessions: RwLock::new(HashMap::new()),
            registry: Arc::new(ConversationRegistry::new()),
            connector,
            listener: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &Arc<ConversationRegistry> {
        &self.registry
    }

    pub async fn config(&self) -> Option<BotConfig> {
        self.config.read().await.clone()
    }

    pub async fn is_initialized(&self) -> bool {
        match self.config.read().await.as_ref() {
            Some(cfg) => self.sessions.read().await.contains_key(&cfg.admin_id),
            None => false,
        }
    }

    /// Load the saved configuration at startup. Returns whether one was found.
    pub async fn load_persisted(&self) -> Result<bool, ConfigError> {
        match self.store.load()? {
            Some(cfg) => {
                info!("Loaded saved configuration from {}", self.store.path().display());
                *self.config.write().await = Some(cfg);
                Ok(true)
            }
            None => {
                info!("No saved configuration found.");
                Ok(false)
            }
        }
    }

    /// Validate and persist a form submission, then start the bot in the background.
    pub async fn configure(
        self: &Arc<Self>,
        credentials: &str,
        prefix: Option<&str>,
        admin_id: &str,
    ) -> Result<(), ConfigError> {
        let cfg = BotConfig::from_submission(credentials, prefix, admin_id)?;
        self.store.save(&cfg)?;
        info!("⚙️ Configuration saved (prefix {:?}, admin {})", cfg.prefix, cfg.admin_id);
        *self.config.write().await = Some(cfg);

        let service = Arc::clone(self);
        tokio::spawn(async move { service.initialize().await });
        Ok(())
    }

    /// Log in with the current configuration and start handling events.
    ///
    /// Any previous listener is torn down first, so a login failure leaves
    /// the bot uninitialized rather than running under an outdated config.
    pub async fn initialize(&self) {
        let Some(cfg) = self.config().await else {
            return;
        };

        if let Some(old) = self.listener.lock().await.take() {
            info!("Stopping previous event listener");
            old.abort();
        }
        self.sessions.write().await.clear();

        info!("🔑 Initializing bot for admin {}...", cfg.admin_id);
        let session = match self.connector.login(&cfg.credentials).await {
            Ok(s) => s,
            Err(e) => {
                error!("Login error: {e}");
                return;
            }
        };

        self.sessions.write().await.insert(cfg.admin_id.clone(), Arc::clone(&session.client));

        let engine = WardenEngine::new(
            WardenConfig { prefix: cfg.prefix.clone(), admin_id: cfg.admin_id.clone() },
            session.client,
            Arc::clone(&self.registry),
        );
        let mut events = session.events;
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                engine.handle_event(event).await;
            }
            warn!("Event stream closed");
        });

        if let Some(old) = self.listener.lock().await.replace(handle) {
            // Another initialize won the race; keep only the newest listener
            old.abort();
        }
        info!("🚀 Bot is now listening for events...");
    }

    /// Start the fight timer for an armed conversation.
    pub async fn activate_fight(
        &self,
        conversation_id: &str,
        plan: FightPlan,
    ) -> Result<(), ActivationError> {
        if !self.registry.has_active_fight(conversation_id).await {
            return Err(ActivationError::NoActiveSession);
        }

        let client = {
            let admin_id = self.config.read().await.as_ref().map(|c| c.admin_id.clone());
            let sessions = self.sessions.read().await;
            admin_id.and_then(|id| sessions.get(&id).cloned())
        };
        let Some(client) = client else {
            return Err(ActivationError::NotInitialized);
        };

        self.registry.activate_fight(conversation_id, plan, client).await
    }
}
