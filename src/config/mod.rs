//! Configuration module for Warden.
//!
//! Loads configuration from environment variables.

mod policy;

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

pub use policy::{Escalation, GuardPolicies, GuardPolicy, NudeThresholds, ProphylacticPolicy, SpamLimits};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: String, value: String },
}

/// Persistence backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    File { data_dir: PathBuf },
    Mongo { uri: String, database: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// The bot's own user id.
    pub bot_id: String,

    /// Global admin ids (comma-separated `OWNER_IDS`).
    /// These users are exempt from every guard in every group.
    pub owner_ids: Vec<String>,

    // Bridge
    pub bridge_url: String,
    pub bridge_token: Option<String>,
    pub ingress_addr: SocketAddr,
    pub ingress_secret: Option<String>,

    pub storage: StorageBackend,

    /// Nudity classifier endpoint; the guard passes everything when unset.
    pub classifier_url: Option<String>,

    /// Where escalation cards are rendered.
    pub render_dir: PathBuf,

    /// Thread that receives router diagnostics.
    pub log_thread_id: Option<String>,

    pub command_prefix: String,

    pub policies: GuardPolicies,
    pub spam: SpamLimits,
    pub nude: NudeThresholds,
    pub prophylactic: ProphylacticPolicy,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_id = non_empty("BOT_ID").ok_or(ConfigError::Missing("BOT_ID"))?;
        let bridge_url = non_empty("BRIDGE_URL").ok_or(ConfigError::Missing("BRIDGE_URL"))?;

        let owner_ids = lookup("OWNER_IDS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let ingress_raw = non_empty("INGRESS_ADDR").unwrap_or_else(|| "0.0.0.0:8088".to_string());
        let ingress_addr = ingress_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "INGRESS_ADDR".to_string(),
            value: ingress_raw.clone(),
        })?;

        let storage = match non_empty("STORAGE_BACKEND").as_deref().unwrap_or("file") {
            "file" => StorageBackend::File {
                data_dir: PathBuf::from(non_empty("DATA_DIR").unwrap_or_else(|| "./data".to_string())),
            },
            "mongodb" | "mongo" => StorageBackend::Mongo {
                uri: non_empty("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?,
                database: non_empty("MONGODB_DATABASE").unwrap_or_else(|| "warden".to_string()),
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND".to_string(),
                    value: other.to_string(),
                });
            }
        };

        let render_dir = non_empty("RENDER_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("warden"));

        let policies = GuardPolicies::from_lookup(&non_empty)?;

        Ok(Self {
            bot_id,
            owner_ids,
            bridge_url,
            bridge_token: non_empty("BRIDGE_TOKEN"),
            ingress_addr,
            ingress_secret: non_empty("INGRESS_SECRET"),
            storage,
            classifier_url: non_empty("CLASSIFIER_URL"),
            render_dir,
            log_thread_id: non_empty("LOG_THREAD_ID"),
            command_prefix: non_empty("COMMAND_PREFIX").unwrap_or_else(|| "!".to_string()),
            policies,
            spam: SpamLimits::default(),
            nude: NudeThresholds::default(),
            prophylactic: ProphylacticPolicy::default(),
        })
    }
}
