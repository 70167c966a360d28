//! Utility functions.
//!
//! Collection of helper functions used across the bot.

pub mod parser;
pub mod target;

pub use parser::parse_duration;
pub use target::{Target, command_targets};

/// Current unix time in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
