//! In-memory backend for tests and dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{GroupSettings, ProphylacticConfig, Store, StoreError, ViolationMap};
use crate::guards::GuardKind;

#[derive(Default)]
struct Inner {
    groups: HashMap<String, GroupSettings>,
    admins: Vec<String>,
    prophylactic: ProphylacticConfig,
    violations: HashMap<GuardKind, ViolationMap>,
    writes: usize,
}

/// Volatile [`Store`] that counts writes.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a group's settings without counting a write.
    pub fn with_group(self, settings: GroupSettings) -> Self {
        self.inner
            .lock()
            .groups
            .insert(settings.thread_id.clone(), settings);
        self
    }

    pub fn with_admins(self, admins: Vec<String>) -> Self {
        self.inner.lock().admins = admins;
        self
    }

    /// Number of write calls so far.
    pub fn write_count(&self) -> usize {
        self.inner.lock().writes
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read_group_settings(&self) -> Result<HashMap<String, GroupSettings>, StoreError> {
        Ok(self.inner.lock().groups.clone())
    }

    async fn read_group(&self, thread_id: &str) -> Result<Option<GroupSettings>, StoreError> {
        Ok(self.inner.lock().groups.get(thread_id).cloned())
    }

    async fn write_group(&self, settings: &GroupSettings) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.writes += 1;
        inner.groups.insert(settings.thread_id.clone(), settings.clone());
        Ok(())
    }

    async fn read_admins(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.lock().admins.clone())
    }

    async fn write_admins(&self, admins: &[String]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.writes += 1;
        inner.admins = admins.to_vec();
        Ok(())
    }

    async fn read_prophylactic(&self) -> Result<ProphylacticConfig, StoreError> {
        Ok(self.inner.lock().prophylactic.clone())
    }

    async fn write_prophylactic(&self, config: &ProphylacticConfig) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.writes += 1;
        inner.prophylactic = config.clone();
        Ok(())
    }

    async fn read_violations(&self, guard: GuardKind) -> Result<ViolationMap, StoreError> {
        Ok(self.inner.lock().violations.get(&guard).cloned().unwrap_or_default())
    }

    async fn write_violations(&self, guard: GuardKind, records: &ViolationMap) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.writes += 1;
        inner.violations.insert(guard, records.clone());
        Ok(())
    }
}
