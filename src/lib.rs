//! Warden - moderation and dispatch pipeline for a group chat bot.
//!
//! ## Architecture
//!
//! - `config` - environment configuration and per-guard policies
//! - `client` - chat-client contract, HTTP bridge and event ingress
//! - `storage` - JSON-file, MongoDB and in-memory stores
//! - `cache` - Moka-backed caches and cooldown maps
//! - `permissions` - admin and whitelist resolution
//! - `violations` - strike records and decay
//! - `guards` - guard stages and enforcement
//! - `pipeline` - per-message sequencer and command dispatch
//! - `events` - group, reaction and recall handlers
//! - `bot` - shared state, event router and runtime
//! - `scheduler` - periodic sweepers
//! - `render` - escalation cards
//! - `i18n` - localized texts

pub mod bot;
pub mod cache;
pub mod client;
pub mod config;
pub mod events;
pub mod guards;
pub mod i18n;
pub mod permissions;
pub mod pipeline;
pub mod render;
pub mod scheduler;
pub mod storage;
pub mod test_helpers;
pub mod utils;
pub mod violations;
