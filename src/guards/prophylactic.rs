//! Defensive mode.
//!
//! A burst of uploads in one group switches anti-media on for everyone,
//! regardless of group toggles, until the ephemeral sweeper clears it.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::ProphylacticPolicy;
use crate::storage::{ProphylacticConfig, Store};

pub struct ProphylacticMode {
    store: Arc<dyn Store>,
    policy: ProphylacticPolicy,
    state: RwLock<ProphylacticConfig>,
    uploads: DashMap<String, VecDeque<i64>>,
}

impl ProphylacticMode {
    pub fn new(store: Arc<dyn Store>, policy: ProphylacticPolicy) -> Self {
        Self {
            store,
            policy,
            state: RwLock::new(ProphylacticConfig::default()),
            uploads: DashMap::new(),
        }
    }

    /// Mode restored from the store. An unreadable state starts inactive.
    pub async fn load(store: Arc<dyn Store>, policy: ProphylacticPolicy) -> Self {
        let this = Self::new(store, policy);
        match this.store.read_prophylactic().await {
            Ok(config) => *this.state.write() = config,
            Err(e) => warn!("Failed to load prophylactic state: {}", e),
        }
        this
    }

    pub fn policy(&self) -> &ProphylacticPolicy {
        &self.policy
    }

    pub fn is_active(&self) -> bool {
        self.state.read().active
    }

    pub fn snapshot(&self) -> ProphylacticConfig {
        self.state.read().clone()
    }

    /// Count an upload; returns `true` when this upload switched the mode on.
    pub async fn record_upload(&self, thread_id: &str, now_ms: i64) -> bool {
        let window = self.policy.burst_window.as_millis() as i64;
        let burst = {
            let mut times = self.uploads.entry(thread_id.to_string()).or_default();
            while times.front().is_some_and(|at| now_ms - at >= window) {
                times.pop_front();
            }
            times.push_back(now_ms);
            times.len() > self.policy.burst_uploads
        };
        if !burst {
            return false;
        }

        let snapshot = {
            let mut state = self.state.write();
            if state.active {
                return false;
            }
            state.activate(thread_id, now_ms);
            state.clone()
        };
        self.uploads.remove(thread_id);
        info!("Prophylactic mode activated by upload burst in {}", thread_id);
        self.persist(&snapshot).await;
        true
    }

    /// Clear the mode once it has timed out. Returns `true` when cleared.
    pub async fn expire_if_due(&self, now_ms: i64) -> bool {
        let timeout = self.policy.timeout.as_millis() as i64;
        let snapshot = {
            let mut state = self.state.write();
            if !state.is_expired(now_ms, timeout) {
                return false;
            }
            state.clear();
            state.clone()
        };
        info!("Prophylactic mode cleared");
        self.persist(&snapshot).await;
        true
    }

    /// Forget upload counters that fell out of the burst window.
    pub fn prune_uploads(&self, now_ms: i64) {
        let window = self.policy.burst_window.as_millis() as i64;
        self.uploads
            .retain(|_, times| times.back().is_some_and(|at| now_ms - at < window));
    }

    async fn persist(&self, config: &ProphylacticConfig) {
        if let Err(e) = self.store.write_prophylactic(config).await {
            warn!("Failed to persist prophylactic state: {}", e);
        }
    }
}
