//! Group settings access with per-group write serialization.
//!
//! Reads always go to the store (no caching across messages) so a toggle is
//! visible on the very next message. Mutations of one group run under that
//! group's mutex, which removes lost updates between concurrent commands.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::{GroupSettings, Store, StoreError};

#[derive(Clone)]
pub struct SettingsRepo {
    store: Arc<dyn Store>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SettingsRepo {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn lock_for(&self, thread_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Fresh settings for a group, created and persisted on first sight.
    pub async fn load(&self, thread_id: &str) -> Result<GroupSettings, StoreError> {
        if let Some(settings) = self.store.read_group(thread_id).await? {
            return Ok(settings);
        }

        let lock = self.lock_for(thread_id);
        let _guard = lock.lock().await;
        // another task may have created it while we waited
        if let Some(settings) = self.store.read_group(thread_id).await? {
            return Ok(settings);
        }
        let settings = GroupSettings::new(thread_id);
        self.store.write_group(&settings).await?;
        debug!("Created settings for group {}", thread_id);
        Ok(settings)
    }

    /// Read, mutate and persist a group's settings atomically with respect
    /// to other updates of the same group.
    ///
    /// The closure returns `(changed, value)`; nothing is written when
    /// `changed` is false.
    pub async fn update<R, F>(&self, thread_id: &str, mutate: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut GroupSettings) -> (bool, R),
    {
        let lock = self.lock_for(thread_id);
        let _guard = lock.lock().await;

        let mut settings = self
            .store
            .read_group(thread_id)
            .await?
            .unwrap_or_else(|| GroupSettings::new(thread_id));
        let (changed, value) = mutate(&mut settings);
        if changed {
            self.store.write_group(&settings).await?;
            debug!("Updated settings for group {}", thread_id);
        }
        Ok(value)
    }

    /// Remove expired mutes from every group. Only groups holding an
    /// expired entry are rewritten. Returns how many entries were removed.
    pub async fn prune_expired_mutes(&self, now_ms: i64) -> Result<usize, StoreError> {
        let all = self.store.read_group_settings().await?;
        let mut removed = 0;
        for (thread_id, settings) in all {
            if settings.mute_list.values().all(|m| m.is_active(now_ms)) {
                continue;
            }
            removed += self
                .update(&thread_id, |s| {
                    let n = s.prune_mutes(now_ms);
                    (n > 0, n)
                })
                .await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guards::GuardKind;
    use crate::storage::{MemoryStore, MuteEntry};

    #[tokio::test]
    async fn test_load_creates_once() {
        let store = Arc::new(MemoryStore::new());
        let repo = SettingsRepo::new(store.clone());
        let first = repo.load("g1").await.unwrap();
        assert_eq!(first.thread_id, "g1");
        repo.load("g1").await.unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let repo = SettingsRepo::new(store.clone());

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.update("g1", |s| {
                        s.bad_words.push(format!("w{}", i));
                        (true, ())
                    })
                    .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let settings = repo.load("g1").await.unwrap();
        assert_eq!(settings.bad_words.len(), 20);
    }

    #[tokio::test]
    async fn test_unchanged_update_skips_write() {
        let store = Arc::new(MemoryStore::new());
        let repo = SettingsRepo::new(store.clone());
        let enabled = repo
            .update("g1", |s| (false, s.is_enabled(GuardKind::AntiSpam)))
            .await
            .unwrap();
        assert!(!enabled);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_prune_expired_mutes_rewrites_only_affected_groups() {
        let mut g1 = GroupSettings::new("g1");
        g1.mute_list.insert("u1".into(), MuteEntry { name: "A".into(), until: Some(1_000) });
        g1.mute_list.insert("u2".into(), MuteEntry { name: "B".into(), until: None });
        let mut g2 = GroupSettings::new("g2");
        g2.mute_list.insert("u3".into(), MuteEntry { name: "C".into(), until: Some(90_000) });
        let store = Arc::new(MemoryStore::new().with_group(g1).with_group(g2));
        let repo = SettingsRepo::new(store.clone());
        let writes = store.write_count();

        assert_eq!(repo.prune_expired_mutes(5_000).await.unwrap(), 1);
        assert_eq!(store.write_count(), writes + 1);

        let g1 = repo.load("g1").await.unwrap();
        assert!(!g1.mute_list.contains_key("u1"));
        assert!(g1.mute_list.contains_key("u2"));
        assert!(repo.load("g2").await.unwrap().mute_list.contains_key("u3"));

        assert_eq!(repo.prune_expired_mutes(5_000).await.unwrap(), 0);
        assert_eq!(store.write_count(), writes + 1);
    }
}
