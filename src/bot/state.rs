//! Shared application state.
//!
//! Built once at startup and handed to every component by `Arc`; there are
//! no globals. Tests build it from a fake client and an in-memory store.

use std::sync::Arc;

use tracing::info;

use crate::cache::{Cooldowns, MessageCache};
use crate::client::ChatClient;
use crate::config::Config;
use crate::guards::{ContentClassifier, Enforcer, ProphylacticMode};
use crate::permissions::Permissions;
use crate::render::EscalationRenderer;
use crate::storage::{SettingsRepo, Store};
use crate::violations::ViolationStore;

pub struct AppState {
    pub config: Arc<Config>,

    /// Outbound chat operations.
    pub client: Arc<dyn ChatClient>,

    pub store: Arc<dyn Store>,

    /// Per-group settings with serialized writes.
    pub settings: SettingsRepo,

    /// Admin and whitelist resolution with group-info caching.
    pub permissions: Permissions,

    pub violations: Arc<ViolationStore>,

    /// Reply, business-card and dedup cooldowns.
    pub cooldowns: Cooldowns,

    /// Recent messages, kept even when a guard deleted them.
    pub messages: MessageCache,

    pub prophylactic: Arc<ProphylacticMode>,

    pub classifier: Arc<dyn ContentClassifier>,

    pub enforcer: Arc<Enforcer>,
}

impl AppState {
    /// Assemble the state, restoring violation records and prophylactic
    /// mode from the store.
    pub async fn build(
        config: Config,
        client: Arc<dyn ChatClient>,
        store: Arc<dyn Store>,
        classifier: Arc<dyn ContentClassifier>,
        renderer: Arc<dyn EscalationRenderer>,
    ) -> Self {
        let config = Arc::new(config);
        let permissions = Permissions::new(
            client.clone(),
            store.clone(),
            config.bot_id.clone(),
            config.owner_ids.clone(),
        );
        let violations = Arc::new(ViolationStore::load(store.clone(), config.policies.clone()).await);
        let prophylactic =
            Arc::new(ProphylacticMode::load(store.clone(), config.prophylactic.clone()).await);
        let cooldowns = Cooldowns::default();
        let enforcer = Arc::new(Enforcer::new(
            client.clone(),
            violations.clone(),
            permissions.clone(),
            renderer,
            config.policies.clone(),
            cooldowns.clone(),
        ));
        info!(
            "State ready (prophylactic mode {})",
            if prophylactic.is_active() { "on" } else { "off" }
        );

        Self {
            settings: SettingsRepo::new(store.clone()),
            config,
            client,
            store,
            permissions,
            violations,
            cooldowns,
            messages: MessageCache::default(),
            prophylactic,
            classifier,
            enforcer,
        }
    }

    pub fn bot_id(&self) -> &str {
        &self.config.bot_id
    }

    /// Check if a user is a bot owner.
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.config.owner_ids.iter().any(|id| id == user_id)
    }
}
