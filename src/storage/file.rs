//! JSON-file backend.
//!
//! Layout under the data directory:
//!
//! - `groupSettings.json`: thread id -> settings
//! - `admins.json`: global admin ids
//! - `prophylactic.json`: defensive mode singleton
//! - `violations/<guard>.json`: violation map per guard

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use super::{GroupSettings, ProphylacticConfig, Store, StoreError, ViolationMap};
use crate::guards::GuardKind;

pub struct FileStore {
    root: PathBuf,
    /// Serializes read-modify-write cycles on the shared files.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (and create) the data directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let violations = root.join("violations");
        tokio::fs::create_dir_all(&violations)
            .await
            .map_err(|source| StoreError::Io {
                path: violations.display().to_string(),
                source,
            })?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join("groupSettings.json")
    }

    fn admins_path(&self) -> PathBuf {
        self.root.join("admins.json")
    }

    fn prophylactic_path(&self) -> PathBuf {
        self.root.join("prophylactic.json")
    }

    fn violations_path(&self, guard: GuardKind) -> PathBuf {
        self.root.join("violations").join(format!("{}.json", guard.as_str()))
    }
}

/// Read a JSON file, returning the default when it does not exist yet.
async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.display().to_string(),
                source,
            });
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Write through a temporary file and rename, so readers never see a
/// half-written document.
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    let io_err = |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    };
    tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

#[async_trait]
impl Store for FileStore {
    async fn read_group_settings(&self) -> Result<HashMap<String, GroupSettings>, StoreError> {
        read_json(&self.settings_path()).await
    }

    async fn read_group(&self, thread_id: &str) -> Result<Option<GroupSettings>, StoreError> {
        let mut all = self.read_group_settings().await?;
        Ok(all.remove(thread_id).map(|mut s| {
            s.thread_id = thread_id.to_string();
            s
        }))
    }

    async fn write_group(&self, settings: &GroupSettings) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read_group_settings().await?;
        all.insert(settings.thread_id.clone(), settings.clone());
        write_json(&self.settings_path(), &all).await
    }

    async fn read_admins(&self) -> Result<Vec<String>, StoreError> {
        read_json(&self.admins_path()).await
    }

    async fn write_admins(&self, admins: &[String]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.admins_path(), admins).await
    }

    async fn read_prophylactic(&self) -> Result<ProphylacticConfig, StoreError> {
        read_json(&self.prophylactic_path()).await
    }

    async fn write_prophylactic(&self, config: &ProphylacticConfig) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.prophylactic_path(), config).await
    }

    async fn read_violations(&self, guard: GuardKind) -> Result<ViolationMap, StoreError> {
        read_json(&self.violations_path(guard)).await
    }

    async fn write_violations(&self, guard: GuardKind, records: &ViolationMap) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.violations_path(guard), records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ListEntry, ViolationRecord};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_missing_files_read_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.read_group_settings().await.unwrap().is_empty());
        assert!(store.read_admins().await.unwrap().is_empty());
        assert!(!store.read_prophylactic().await.unwrap().active);
        assert!(store.read_violations(GuardKind::AntiSpam).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_group_writes_do_not_clobber_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let mut g1 = GroupSettings::new("g1");
        g1.anti_link = true;
        let mut g2 = GroupSettings::new("g2");
        g2.white_list.insert("u1".into(), ListEntry::named("Lan"));
        store.write_group(&g1).await.unwrap();
        store.write_group(&g2).await.unwrap();

        assert_eq!(store.read_group("g1").await.unwrap(), Some(g1));
        assert_eq!(store.read_group("g2").await.unwrap(), Some(g2));
        assert_eq!(store.read_group("g3").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_violations_are_per_guard() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let mut map = ViolationMap::new();
        map.entry("g1".into()).or_default().insert(
            "u1".into(),
            ViolationRecord { count: 1, times: vec![42], name: "Lan".into() },
        );
        store.write_violations(GuardKind::AntiBot, &map).await.unwrap();

        assert_eq!(store.read_violations(GuardKind::AntiBot).await.unwrap(), map);
        assert!(store.read_violations(GuardKind::AntiLink).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("admins.json"), b"{not json").await.unwrap();
        assert!(matches!(store.read_admins().await, Err(StoreError::Json { .. })));
    }
}
