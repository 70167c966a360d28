//! Short-lived cache of recent messages.
//!
//! Updated for every inbound message, including ones the guards delete, so
//! quotes and admin tooling can still reference them for a while.

use crate::client::Message;

use super::{CacheConfig, TypedCache};

/// A cached message and whether its sender recalled it.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMessage {
    pub message: Message,
    pub recalled: bool,
}

#[derive(Clone, Debug)]
pub struct MessageCache {
    by_id: TypedCache<String, CachedMessage>,
}

impl MessageCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            by_id: TypedCache::new("recent_messages", config),
        }
    }

    pub fn remember(&self, message: &Message) {
        self.by_id.insert(
            message.data.msg_id.clone(),
            CachedMessage {
                message: message.clone(),
                recalled: false,
            },
        );
    }

    pub fn get(&self, msg_id: &str) -> Option<CachedMessage> {
        self.by_id.get(&msg_id.to_string())
    }

    /// Flag a message as recalled. Returns the cached copy if known.
    pub fn mark_recalled(&self, msg_id: &str) -> Option<CachedMessage> {
        let mut cached = self.get(msg_id)?;
        cached.recalled = true;
        self.by_id.insert(msg_id.to_string(), cached.clone());
        Some(cached)
    }
}

impl Default for MessageCache {
    fn default() -> Self {
        Self::new(CacheConfig::recent_messages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MessageData, ThreadType};

    fn message(id: &str, user: &str) -> Message {
        Message {
            thread_id: "g1".into(),
            thread_type: ThreadType::Group,
            data: MessageData {
                msg_id: id.into(),
                uid_from: user.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_remember_and_get() {
        let cache = MessageCache::default();
        cache.remember(&message("m1", "u1"));
        cache.remember(&message("m2", "u2"));
        assert_eq!(cache.get("m1").unwrap().message.data.uid_from, "u1");
        assert_eq!(cache.get("m2").unwrap().message.data.uid_from, "u2");
        assert!(cache.get("m3").is_none());
    }

    #[test]
    fn test_mark_recalled() {
        let cache = MessageCache::default();
        cache.remember(&message("m1", "u1"));
        assert!(cache.mark_recalled("m1").unwrap().recalled);
        assert!(cache.get("m1").unwrap().recalled);
        assert!(cache.mark_recalled("unknown").is_none());
    }
}
