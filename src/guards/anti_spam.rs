//! Message-rate guard.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{Guard, GuardInput, GuardKind, Verdict};
use crate::config::SpamLimits;

/// Recent message times per user, per group (in-memory, lock-free across
/// groups).
#[derive(Clone, Default)]
pub struct FloodTracker {
    data: Arc<DashMap<String, HashMap<String, VecDeque<i64>>>>,
}

impl FloodTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message and return how many the user sent inside `window_ms`.
    pub fn record_message(&self, thread_id: &str, user_id: &str, now_ms: i64, window_ms: i64) -> usize {
        let mut group = self.data.entry(thread_id.to_string()).or_default();
        let times = group.entry(user_id.to_string()).or_default();
        while times.front().is_some_and(|at| now_ms - at >= window_ms) {
            times.pop_front();
        }
        times.push_back(now_ms);
        times.len()
    }

    /// Reset all data for a user in a group.
    pub fn reset_user(&self, thread_id: &str, user_id: &str) {
        if let Some(mut group) = self.data.get_mut(thread_id) {
            group.remove(user_id);
        }
    }

    /// Drop users whose last message fell out of the window.
    pub fn prune(&self, now_ms: i64, window_ms: i64) {
        self.data.retain(|_, group| {
            group.retain(|_, times| times.back().is_some_and(|at| now_ms - at < window_ms));
            !group.is_empty()
        });
    }
}

pub struct AntiSpamGuard {
    tracker: FloodTracker,
    limits: SpamLimits,
}

impl AntiSpamGuard {
    pub fn new(limits: SpamLimits) -> Self {
        Self {
            tracker: FloodTracker::new(),
            limits,
        }
    }

    pub fn tracker(&self) -> &FloodTracker {
        &self.tracker
    }
}

#[async_trait]
impl Guard for AntiSpamGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::AntiSpam
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        let message = input.message;
        let sent = self.tracker.record_message(
            &message.thread_id,
            message.sender_id(),
            input.now_ms,
            self.limits.window.as_millis() as i64,
        );
        if sent > self.limits.max_messages {
            Verdict::violation(format!("{} messages in {:?}", sent, self.limits.window))
        } else {
            Verdict::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::GroupSettings;
    use crate::test_helpers::{group_message, guard_input_at};

    #[test]
    fn test_window_slides() {
        let tracker = FloodTracker::new();
        for i in 0..5 {
            assert_eq!(tracker.record_message("g1", "u1", i * 100, 4_000), i as usize + 1);
        }
        assert_eq!(tracker.record_message("g1", "u1", 4_050, 4_000), 5);
        assert_eq!(tracker.record_message("g1", "u2", 4_050, 4_000), 1);
        tracker.reset_user("g1", "u1");
        assert_eq!(tracker.record_message("g1", "u1", 4_100, 4_000), 1);
    }

    #[test]
    fn test_prune_drops_idle_users() {
        let tracker = FloodTracker::new();
        tracker.record_message("g1", "u1", 0, 4_000);
        tracker.record_message("g2", "u2", 3_000, 4_000);
        tracker.prune(5_000, 4_000);
        assert_eq!(tracker.record_message("g1", "u1", 5_000, 4_000), 1);
        assert_eq!(tracker.record_message("g2", "u2", 5_000, 4_000), 2);
    }

    #[tokio::test]
    async fn test_sixth_message_in_window_is_spam() {
        let guard = AntiSpamGuard::new(SpamLimits::default());
        let settings = GroupSettings::new("g1");
        for i in 0..5 {
            let msg = group_message("g1", "u1", &format!("m{}", i));
            assert!(guard.decide(&guard_input_at(&msg, &settings, i * 500)).await.is_pass());
        }
        let msg = group_message("g1", "u1", "m5");
        assert!(!guard.decide(&guard_input_at(&msg, &settings, 2_600)).await.is_pass());
    }
}
