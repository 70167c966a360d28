//! Prophylactic (defensive) mode singleton.

use serde::{Deserialize, Serialize};

/// Global defensive mode switched on by upload bursts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProphylacticConfig {
    pub active: bool,
    /// Unix ms when the mode was switched on.
    pub activated_at: Option<i64>,
    /// Group whose burst triggered the mode.
    pub trigger_thread: Option<String>,
}

impl ProphylacticConfig {
    pub fn activate(&mut self, thread_id: &str, now_ms: i64) {
        self.active = true;
        self.activated_at = Some(now_ms);
        self.trigger_thread = Some(thread_id.to_string());
    }

    /// Whether the mode has outlived `timeout_ms`.
    pub fn is_expired(&self, now_ms: i64, timeout_ms: i64) -> bool {
        match (self.active, self.activated_at) {
            (true, Some(at)) => now_ms - at >= timeout_ms,
            // active without a start time can never expire on its own
            (true, None) => false,
            (false, _) => false,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
