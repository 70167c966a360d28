//! Ephemeral cooldown maps.
//!
//! Not persisted: they only guard short windows, so an empty start after a
//! restart is fine. Expiry is driven by the ephemeral sweeper rather than
//! by the maps themselves.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use sha2::{Digest, Sha256};

type SenderKey = (String, String);

/// TTLs of the cooldown maps.
#[derive(Debug, Clone)]
pub struct CooldownTtls {
    pub reply: Duration,
    pub business_card: Duration,
    pub dedup: Duration,
}

impl Default for CooldownTtls {
    fn default() -> Self {
        Self {
            reply: Duration::from_secs(60),
            business_card: Duration::from_secs(5 * 60),
            dedup: Duration::from_secs(5),
        }
    }
}

/// Timestamps (unix ms) of recent actions per sender.
#[derive(Clone, Debug, Default)]
pub struct Cooldowns {
    ttls: CooldownTtls,
    reply: Arc<DashMap<SenderKey, i64>>,
    business_card: Arc<DashMap<SenderKey, i64>>,
    dedup: Arc<DashMap<(String, String, String), i64>>,
}

fn key(thread_id: &str, user_id: &str) -> SenderKey {
    (thread_id.to_string(), user_id.to_string())
}

fn within(stamp: Option<i64>, now_ms: i64, ttl: Duration) -> bool {
    stamp.is_some_and(|at| now_ms - at < ttl.as_millis() as i64)
}

/// Stable short hash of message content.
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

impl Cooldowns {
    pub fn new(ttls: CooldownTtls) -> Self {
        Self {
            ttls,
            ..Default::default()
        }
    }

    pub fn ttls(&self) -> &CooldownTtls {
        &self.ttls
    }

    /// Whether the bot replied to this sender recently.
    pub fn reply_cooling(&self, thread_id: &str, user_id: &str, now_ms: i64) -> bool {
        let stamp = self.reply.get(&key(thread_id, user_id)).map(|v| *v);
        within(stamp, now_ms, self.ttls.reply)
    }

    pub fn mark_replied(&self, thread_id: &str, user_id: &str, now_ms: i64) {
        self.reply.insert(key(thread_id, user_id), now_ms);
    }

    /// Claim the business-card slot for a sender; `false` while cooling down.
    pub fn try_business_card(&self, thread_id: &str, user_id: &str, now_ms: i64) -> bool {
        let k = key(thread_id, user_id);
        let stamp = self.business_card.get(&k).map(|v| *v);
        if within(stamp, now_ms, self.ttls.business_card) {
            return false;
        }
        self.business_card.insert(k, now_ms);
        true
    }

    /// First sighting of `content` from this sender inside the dedup window.
    /// Returns `false` for repeats.
    pub fn first_sighting(&self, thread_id: &str, user_id: &str, content: &str, now_ms: i64) -> bool {
        let k = (thread_id.to_string(), user_id.to_string(), content_hash(content));
        let stamp = self.dedup.get(&k).map(|v| *v);
        if within(stamp, now_ms, self.ttls.dedup) {
            return false;
        }
        self.dedup.insert(k, now_ms);
        true
    }

    /// Drop expired entries from every map. Returns how many were removed.
    pub fn expire(&self, now_ms: i64) -> usize {
        let mut removed = 0;
        removed += expire_map(&self.reply, now_ms, self.ttls.reply);
        removed += expire_map(&self.business_card, now_ms, self.ttls.business_card);
        removed += expire_map(&self.dedup, now_ms, self.ttls.dedup);
        removed
    }

    pub fn len(&self) -> usize {
        self.reply.len() + self.business_card.len() + self.dedup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn expire_map<K: std::hash::Hash + Eq>(map: &DashMap<K, i64>, now_ms: i64, ttl: Duration) -> usize {
    let before = map.len();
    map.retain(|_, at| within(Some(*at), now_ms, ttl));
    before - map.len()
}
