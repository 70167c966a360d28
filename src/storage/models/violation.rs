//! Violation records kept per guard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Strikes of one user in one thread for one guard.
///
/// After every decay sweep `count == times.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ViolationRecord {
    pub count: u32,
    /// Strike timestamps (unix ms), oldest first, capped.
    pub times: Vec<i64>,
    #[serde(default)]
    pub name: String,
}

impl ViolationRecord {
    /// Add a strike, keeping at most `cap` timestamps.
    pub fn strike(&mut self, now_ms: i64, name: &str, cap: usize) {
        self.count += 1;
        self.times.push(now_ms);
        if self.times.len() > cap {
            let excess = self.times.len() - cap;
            self.times.drain(..excess);
        }
        if !name.is_empty() {
            self.name = name.to_string();
        }
    }

    /// Drop strikes older than `cutoff_ms`. Returns whether anything changed.
    pub fn decay(&mut self, cutoff_ms: i64) -> bool {
        let before = (self.count, self.times.len());
        self.times.retain(|t| *t >= cutoff_ms);
        self.count = self.times.len() as u32;
        before != (self.count, self.times.len())
    }
}

/// thread id -> user id -> record
pub type ViolationMap = BTreeMap<String, BTreeMap<String, ViolationRecord>>;
