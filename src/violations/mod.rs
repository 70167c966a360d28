//! Violation store.
//!
//! Keeps every guard's strike records in memory, writes each mutation
//! through to the [`Store`], and implements the decay sweep. Mutations
//! happen under one lock, and persistence of a guard's map is serialized so
//! the last write always carries the latest state.
//!
//! A failed write is logged and the in-memory record stays authoritative;
//! the next successful write persists it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::GuardPolicies;
use crate::guards::GuardKind;
use crate::storage::{Store, ViolationMap, ViolationRecord};

pub struct ViolationStore {
    store: Arc<dyn Store>,
    policies: GuardPolicies,
    records: Mutex<HashMap<GuardKind, ViolationMap>>,
    persist_locks: HashMap<GuardKind, tokio::sync::Mutex<()>>,
}

impl ViolationStore {
    /// Empty store.
    pub fn new(store: Arc<dyn Store>, policies: GuardPolicies) -> Self {
        let persist_locks = GuardKind::STRIKING
            .iter()
            .map(|kind| (*kind, tokio::sync::Mutex::new(())))
            .collect();
        Self {
            store,
            policies,
            records: Mutex::new(HashMap::new()),
            persist_locks,
        }
    }

    /// Store primed with whatever the backend holds. Unreadable guards
    /// start empty.
    pub async fn load(store: Arc<dyn Store>, policies: GuardPolicies) -> Self {
        let this = Self::new(store, policies);
        for kind in GuardKind::STRIKING {
            match this.store.read_violations(kind).await {
                Ok(map) => {
                    this.records.lock().insert(kind, map);
                }
                Err(e) => warn!("Failed to load {} violations, starting empty: {}", kind, e),
            }
        }
        this
    }

    /// Add a strike and return the updated record.
    pub async fn record_violation(
        &self,
        guard: GuardKind,
        thread_id: &str,
        user_id: &str,
        name: &str,
        now_ms: i64,
    ) -> ViolationRecord {
        let cap = self.policies.get(guard).history_cap;
        let record = {
            let mut records = self.records.lock();
            let record = records
                .entry(guard)
                .or_default()
                .entry(thread_id.to_string())
                .or_default()
                .entry(user_id.to_string())
                .or_default();
            record.strike(now_ms, name, cap);
            record.clone()
        };
        debug!(
            "{} strike {} for {} in {}",
            guard, record.count, user_id, thread_id
        );
        self.persist(guard).await;
        record
    }

    /// Forget a user's strikes for a guard.
    pub async fn reset_violation(&self, guard: GuardKind, thread_id: &str, user_id: &str) {
        let removed = {
            let mut records = self.records.lock();
            let Some(map) = records.get_mut(&guard) else {
                return;
            };
            let removed = match map.get_mut(thread_id) {
                Some(users) => users.remove(user_id).is_some(),
                None => false,
            };
            if map.get(thread_id).is_some_and(|users| users.is_empty()) {
                map.remove(thread_id);
            }
            removed
        };
        if removed {
            self.persist(guard).await;
        }
    }

    /// Snapshot of every record of a guard.
    pub fn read_all(&self, guard: GuardKind) -> ViolationMap {
        self.records.lock().get(&guard).cloned().unwrap_or_default()
    }

    pub fn get(&self, guard: GuardKind, thread_id: &str, user_id: &str) -> Option<ViolationRecord> {
        self.records
            .lock()
            .get(&guard)?
            .get(thread_id)?
            .get(user_id)
            .cloned()
    }

    /// Current strikes of a user across all guards.
    pub fn counts_for(&self, thread_id: &str, user_id: &str) -> Vec<(GuardKind, u32)> {
        let records = self.records.lock();
        let mut counts: Vec<_> = records
            .iter()
            .filter_map(|(kind, map)| {
                let count = map.get(thread_id)?.get(user_id)?.count;
                Some((*kind, count))
            })
            .collect();
        counts.sort();
        counts
    }

    /// Drop strikes older than `decay_window`, delete empty records and
    /// threads, and persist only when something changed.
    pub async fn sweep(&self, guard: GuardKind, decay_window: Duration, now_ms: i64) -> bool {
        let cutoff = now_ms - decay_window.as_millis() as i64;
        let changed = {
            let mut records = self.records.lock();
            let Some(map) = records.get_mut(&guard) else {
                return false;
            };
            let mut changed = false;
            for users in map.values_mut() {
                for record in users.values_mut() {
                    changed |= record.decay(cutoff);
                }
                let before = users.len();
                users.retain(|_, record| record.count > 0);
                changed |= users.len() != before;
            }
            let before = map.len();
            map.retain(|_, users| !users.is_empty());
            changed |= map.len() != before;
            changed
        };
        if changed {
            debug!("Decay sweep changed {} records", guard);
            self.persist(guard).await;
        }
        changed
    }

    async fn persist(&self, guard: GuardKind) {
        let _serial = match self.persist_locks.get(&guard) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        let snapshot = self.read_all(guard);
        if let Err(e) = self.store.write_violations(guard, &snapshot).await {
            warn!("Failed to persist {} violations: {}", guard, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const MIN: i64 = 60_000;

    fn store() -> (Arc<MemoryStore>, ViolationStore) {
        let backend = Arc::new(MemoryStore::new());
        let violations = ViolationStore::new(backend.clone(), GuardPolicies::default());
        (backend, violations)
    }

    #[tokio::test]
    async fn test_record_then_read_all() {
        let (backend, violations) = store();
        violations.record_violation(GuardKind::AntiBot, "g1", "u1", "Lan", 1_000).await;
        let record = violations
            .record_violation(GuardKind::AntiBot, "g1", "u1", "Lan", 2_000)
            .await;
        assert_eq!(record.count, 2);

        let all = violations.read_all(GuardKind::AntiBot);
        assert_eq!(all["g1"]["u1"].times, vec![1_000, 2_000]);
        assert_eq!(
            backend.read_violations(GuardKind::AntiBot).await.unwrap(),
            all
        );
    }

    #[tokio::test]
    async fn test_history_never_exceeds_cap() {
        let (_, violations) = store();
        for i in 0..10 {
            violations
                .record_violation(GuardKind::AntiLink, "g1", "u1", "Lan", i)
                .await;
        }
        let record = violations.get(GuardKind::AntiLink, "g1", "u1").unwrap();
        assert_eq!(record.count, 10);
        assert_eq!(record.times, vec![7, 8, 9]);
    }

    #[tokio::test]
    async fn test_reset_removes_empty_thread() {
        let (_, violations) = store();
        violations.record_violation(GuardKind::AntiSpam, "g1", "u1", "", 0).await;
        violations.reset_violation(GuardKind::AntiSpam, "g1", "u1").await;
        assert!(violations.read_all(GuardKind::AntiSpam).is_empty());
        assert!(violations.get(GuardKind::AntiSpam, "g1", "u1").is_none());
    }

    #[tokio::test]
    async fn test_sweep_decays_and_is_idempotent() {
        let (backend, violations) = store();
        let window = Duration::from_secs(30 * 60);
        violations.record_violation(GuardKind::AntiBot, "g1", "old", "", 0).await;
        violations.record_violation(GuardKind::AntiBot, "g1", "mixed", "", 0).await;
        violations.record_violation(GuardKind::AntiBot, "g1", "mixed", "", 20 * MIN).await;
        violations.record_violation(GuardKind::AntiBot, "g2", "old", "", MIN).await;
        let writes_before = backend.write_count();

        let now = 40 * MIN;
        assert!(violations.sweep(GuardKind::AntiBot, window, now).await);
        let all = violations.read_all(GuardKind::AntiBot);
        assert_eq!(all.len(), 1);
        assert_eq!(all["g1"].len(), 1);
        let mixed = &all["g1"]["mixed"];
        assert_eq!(mixed.count, 1);
        assert_eq!(mixed.count as usize, mixed.times.len());
        assert_eq!(backend.write_count(), writes_before + 1);

        assert!(!violations.sweep(GuardKind::AntiBot, window, now).await);
        assert_eq!(backend.write_count(), writes_before + 1);
    }

    #[tokio::test]
    async fn test_load_restores_records() {
        let backend = Arc::new(MemoryStore::new());
        {
            let first = ViolationStore::new(backend.clone(), GuardPolicies::default());
            first.record_violation(GuardKind::AntiNude, "g1", "u1", "", 5).await;
        }
        let second = ViolationStore::load(backend, GuardPolicies::default()).await;
        assert_eq!(second.get(GuardKind::AntiNude, "g1", "u1").unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_counts_for_user() {
        let (_, violations) = store();
        violations.record_violation(GuardKind::AntiSpam, "g1", "u1", "", 0).await;
        violations.record_violation(GuardKind::AntiBot, "g1", "u1", "", 0).await;
        violations.record_violation(GuardKind::AntiBot, "g1", "u1", "", 1).await;
        assert_eq!(
            violations.counts_for("g1", "u1"),
            vec![(GuardKind::AntiBot, 2), (GuardKind::AntiSpam, 1)]
        );
    }
}
