//! Persistence layer.
//!
//! Group settings, global admins, the prophylactic singleton and violation
//! records live behind the [`Store`] trait. Two durable backends exist:
//! JSON files (the default) and MongoDB. [`MemoryStore`] backs tests and
//! dry runs.

mod file;
mod memory;
pub mod models;
mod mongo;
mod settings_repo;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::guards::GuardKind;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use models::*;
pub use mongo::MongoStore;
pub use settings_repo::SettingsRepo;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

/// Durable key-value storage used by the pipeline.
#[async_trait]
pub trait Store: Send + Sync {
    async fn read_group_settings(&self) -> Result<HashMap<String, GroupSettings>, StoreError>;

    async fn read_group(&self, thread_id: &str) -> Result<Option<GroupSettings>, StoreError>;

    async fn write_group(&self, settings: &GroupSettings) -> Result<(), StoreError>;

    async fn read_admins(&self) -> Result<Vec<String>, StoreError>;

    async fn write_admins(&self, admins: &[String]) -> Result<(), StoreError>;

    async fn read_prophylactic(&self) -> Result<ProphylacticConfig, StoreError>;

    async fn write_prophylactic(&self, config: &ProphylacticConfig) -> Result<(), StoreError>;

    async fn read_violations(&self, guard: GuardKind) -> Result<ViolationMap, StoreError>;

    async fn write_violations(&self, guard: GuardKind, records: &ViolationMap) -> Result<(), StoreError>;
}
