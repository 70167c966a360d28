//! In-memory caches built on Moka and DashMap.
//!
//! - [`TypedCache`] - typed wrapper over a Moka cache with TTL/TTI
//! - [`MessageCache`] - recent messages for quote and recall lookups
//! - [`Cooldowns`] - reply / business-card / dedup timestamps, swept
//!   periodically

mod config;
mod cooldowns;
mod messages;
mod typed;

pub use config::CacheConfig;
pub use cooldowns::{CooldownTtls, Cooldowns, content_hash};
pub use messages::{CachedMessage, MessageCache};
pub use typed::TypedCache;
