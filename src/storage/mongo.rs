//! MongoDB backend.
//!
//! One document per group in `group_settings`, one document per guard in
//! `violations`, and the admin list and prophylactic singleton in `global`.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, ReplaceOptions};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{GroupSettings, ProphylacticConfig, Store, StoreError, ViolationMap};
use crate::guards::GuardKind;

const ADMINS_ID: &str = "admins";
const PROPHYLACTIC_ID: &str = "prophylactic";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AdminsDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProphylacticDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(flatten)]
    config: ProphylacticConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ViolationsDoc {
    #[serde(rename = "_id")]
    guard: String,
    #[serde(default)]
    records: ViolationMap,
}

/// MongoDB-backed [`Store`].
#[derive(Debug, Clone)]
pub struct MongoStore {
    groups: Collection<GroupSettings>,
    admins: Collection<AdminsDoc>,
    prophylactic: Collection<ProphylacticDoc>,
    violations: Collection<ViolationsDoc>,
}

fn upsert() -> ReplaceOptions {
    ReplaceOptions::builder().upsert(true).build()
}

impl MongoStore {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// # Errors
    /// Returns error if the connection or the initial ping fails.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        let db = client.database(db_name);
        Ok(Self {
            groups: db.collection("group_settings"),
            admins: db.collection("global"),
            prophylactic: db.collection("global"),
            violations: db.collection("violations"),
        })
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn read_group_settings(&self) -> Result<HashMap<String, GroupSettings>, StoreError> {
        let cursor = self.groups.find(doc! {}).await?;
        let all: Vec<GroupSettings> = cursor.try_collect().await?;
        Ok(all.into_iter().map(|s| (s.thread_id.clone(), s)).collect())
    }

    async fn read_group(&self, thread_id: &str) -> Result<Option<GroupSettings>, StoreError> {
        let filter = doc! { "threadId": thread_id };
        Ok(self.groups.find_one(filter).await?)
    }

    async fn write_group(&self, settings: &GroupSettings) -> Result<(), StoreError> {
        let filter = doc! { "threadId": settings.thread_id.as_str() };
        self.groups
            .replace_one(filter, settings)
            .with_options(upsert())
            .await?;
        debug!("Saved group settings for {}", settings.thread_id);
        Ok(())
    }

    async fn read_admins(&self) -> Result<Vec<String>, StoreError> {
        let found = self.admins.find_one(doc! { "_id": ADMINS_ID }).await?;
        Ok(found.map(|d| d.ids).unwrap_or_default())
    }

    async fn write_admins(&self, admins: &[String]) -> Result<(), StoreError> {
        let document = AdminsDoc {
            id: ADMINS_ID.to_string(),
            ids: admins.to_vec(),
        };
        self.admins
            .replace_one(doc! { "_id": ADMINS_ID }, &document)
            .with_options(upsert())
            .await?;
        Ok(())
    }

    async fn read_prophylactic(&self) -> Result<ProphylacticConfig, StoreError> {
        let found = self
            .prophylactic
            .find_one(doc! { "_id": PROPHYLACTIC_ID })
            .await?;
        Ok(found.map(|d| d.config).unwrap_or_default())
    }

    async fn write_prophylactic(&self, config: &ProphylacticConfig) -> Result<(), StoreError> {
        let document = ProphylacticDoc {
            id: PROPHYLACTIC_ID.to_string(),
            config: config.clone(),
        };
        self.prophylactic
            .replace_one(doc! { "_id": PROPHYLACTIC_ID }, &document)
            .with_options(upsert())
            .await?;
        Ok(())
    }

    async fn read_violations(&self, guard: GuardKind) -> Result<ViolationMap, StoreError> {
        let found = self
            .violations
            .find_one(doc! { "_id": guard.as_str() })
            .await?;
        Ok(found.map(|d| d.records).unwrap_or_default())
    }

    async fn write_violations(&self, guard: GuardKind, records: &ViolationMap) -> Result<(), StoreError> {
        let document = ViolationsDoc {
            guard: guard.as_str().to_string(),
            records: records.clone(),
        };
        self.violations
            .replace_one(doc! { "_id": guard.as_str() }, &document)
            .with_options(upsert())
            .await?;
        debug!("Saved {} violation records", guard);
        Ok(())
    }
}
