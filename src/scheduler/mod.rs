//! Periodic sweepers.
//!
//! One decay sweeper per striking guard, each on that guard's own interval,
//! plus one coarse sweeper for ephemeral state: cooldowns, expired mutes,
//! prophylactic mode expiry and the upload and message-rate trackers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bot::AppState;
use crate::client::{OutgoingMessage, ThreadType};
use crate::guards::{FloodTracker, GuardKind};
use crate::i18n::{DEFAULT_LOCALE, get_text};
use crate::utils::now_ms;

/// Interval of the ephemeral sweeper.
pub const EPHEMERAL_INTERVAL: Duration = Duration::from_secs(60);

/// What one ephemeral sweep did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EphemeralSweep {
    pub cooldowns_expired: usize,
    pub mutes_pruned: usize,
    pub prophylactic_cleared: bool,
}

pub struct Sweepers {
    state: Arc<AppState>,
    flood: FloodTracker,
}

impl Sweepers {
    pub fn new(state: Arc<AppState>, flood: FloodTracker) -> Self {
        Self { state, flood }
    }

    /// One decay pass over a guard's records. Returns whether anything changed.
    pub async fn decay_tick(&self, kind: GuardKind, now_ms: i64) -> bool {
        let policy = self.state.config.policies.get(kind);
        self.state.violations.sweep(kind, policy.decay_window, now_ms).await
    }

    /// One pass over the ephemeral maps.
    pub async fn ephemeral_tick(&self, now_ms: i64) -> EphemeralSweep {
        let cooldowns_expired = self.state.cooldowns.expire(now_ms);
        let mutes_pruned = match self.state.settings.prune_expired_mutes(now_ms).await {
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to prune expired mutes: {}", e);
                0
            }
        };

        let trigger = self.state.prophylactic.snapshot().trigger_thread;
        let prophylactic_cleared = self.state.prophylactic.expire_if_due(now_ms).await;
        if prophylactic_cleared && let Some(thread_id) = trigger {
            self.announce_cleared(&thread_id).await;
        }
        self.state.prophylactic.prune_uploads(now_ms);

        let window = self.state.config.spam.window.as_millis() as i64;
        self.flood.prune(now_ms, window);

        if cooldowns_expired > 0 || mutes_pruned > 0 {
            debug!("Expired {} cooldown entries, {} mutes", cooldowns_expired, mutes_pruned);
        }
        EphemeralSweep {
            cooldowns_expired,
            mutes_pruned,
            prophylactic_cleared,
        }
    }

    async fn announce_cleared(&self, thread_id: &str) {
        let locale = match self.state.settings.load(thread_id).await {
            Ok(settings) => settings.locale().to_string(),
            Err(_) => DEFAULT_LOCALE.to_string(),
        };
        let text = get_text(&locale, "prophylactic.cleared");
        if let Err(e) = self
            .state
            .client
            .send_message(OutgoingMessage::text(text), thread_id, ThreadType::Group)
            .await
        {
            warn!("Failed to announce end of prophylactic mode: {}", e);
        }
    }

    /// Start every sweeper. They run until aborted at shutdown.
    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles: Vec<JoinHandle<()>> = GuardKind::STRIKING
            .iter()
            .map(|&kind| {
                let sweepers = self.clone();
                let every = sweepers.state.config.policies.get(kind).sweep_interval;
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(every);
                    loop {
                        ticker.tick().await;
                        sweepers.decay_tick(kind, now_ms()).await;
                    }
                })
            })
            .collect();

        let sweepers = self.clone();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(EPHEMERAL_INTERVAL);
            loop {
                ticker.tick().await;
                sweepers.ephemeral_tick(now_ms()).await;
            }
        }));
        info!("Started {} sweepers", handles.len());
        handles
    }
}
