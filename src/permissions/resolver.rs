//! Admin and whitelist resolution with cached group lookups.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheConfig, TypedCache};
use crate::client::{ChatClient, ClientError, GroupInfo, Message};
use crate::storage::{GroupSettings, Store};

/// Who the sender of a message is, relative to guard exemptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SenderStanding {
    /// The bot sent this message itself.
    pub is_self: bool,
    /// Global, group or box-level admin.
    pub is_admin: bool,
    /// The bot can delete and remove in this group.
    pub bot_is_admin: bool,
    /// On the group's whitelist.
    pub is_whitelisted: bool,
}

/// Answers "is this sender exempt" for the pipeline.
///
/// Owners (from `OWNER_IDS`) and admins stored globally are admins in every
/// group.
#[derive(Clone)]
pub struct Permissions {
    client: Arc<dyn ChatClient>,
    store: Arc<dyn Store>,
    cache: TypedCache<String, GroupInfo>,
    bot_id: String,
    owner_ids: Vec<String>,
}

impl Permissions {
    pub fn new(
        client: Arc<dyn ChatClient>,
        store: Arc<dyn Store>,
        bot_id: impl Into<String>,
        owner_ids: Vec<String>,
    ) -> Self {
        Self {
            client,
            store,
            cache: TypedCache::new("group_info", CacheConfig::group_info()),
            bot_id: bot_id.into(),
            owner_ids,
        }
    }

    pub fn bot_id(&self) -> &str {
        &self.bot_id
    }

    /// Group metadata, served from cache when fresh.
    pub async fn group_info(&self, thread_id: &str) -> Result<GroupInfo, ClientError> {
        let key = thread_id.to_string();
        if let Some(cached) = self.cache.get(&key) {
            debug!("Group info cache hit for {}", thread_id);
            return Ok(cached);
        }
        debug!("Group info cache miss for {}", thread_id);
        let info = self.client.get_group_info(thread_id).await?;
        self.cache.insert(key, info.clone());
        Ok(info)
    }

    /// Drop cached metadata; call when the admin set may have changed.
    pub fn invalidate(&self, thread_id: &str) {
        self.cache.invalidate(&thread_id.to_string());
        debug!("Invalidated group info for {}", thread_id);
    }

    /// Owner or stored global admin.
    pub async fn is_global_admin(&self, user_id: &str) -> bool {
        if self.owner_ids.iter().any(|id| id == user_id) {
            return true;
        }
        match self.store.read_admins().await {
            Ok(admins) => admins.iter().any(|id| id == user_id),
            Err(e) => {
                warn!("Failed to read global admins: {}", e);
                false
            }
        }
    }

    /// Group admin according to the client. Lookup failures count as "no".
    pub async fn is_group_admin(&self, thread_id: &str, user_id: &str) -> bool {
        match self.group_info(thread_id).await {
            Ok(info) => info.is_admin(user_id),
            Err(e) => {
                warn!("Failed to fetch group info for {}: {}", thread_id, e);
                false
            }
        }
    }

    /// Any admin level: global, group, or box admin from settings.
    pub async fn is_admin(&self, thread_id: &str, user_id: &str, settings: &GroupSettings) -> bool {
        settings.is_box_admin(user_id)
            || self.is_global_admin(user_id).await
            || self.is_group_admin(thread_id, user_id).await
    }

    pub async fn bot_is_admin(&self, thread_id: &str) -> bool {
        self.is_group_admin(thread_id, &self.bot_id).await
    }

    /// Resolve everything guards need to know about the sender.
    pub async fn standing(&self, message: &Message, settings: &GroupSettings) -> SenderStanding {
        let sender = message.sender_id();
        let is_self = message.is_self || sender == self.bot_id;
        SenderStanding {
            is_self,
            is_admin: self.is_admin(&message.thread_id, sender, settings).await,
            bot_is_admin: self.bot_is_admin(&message.thread_id).await,
            is_whitelisted: settings.is_whitelisted(sender),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ListEntry, MemoryStore};
    use crate::test_helpers::{FakeClient, group_message};

    fn permissions(client: Arc<FakeClient>, store: MemoryStore) -> Permissions {
        Permissions::new(client, Arc::new(store), "bot", vec!["owner".into()])
    }

    #[tokio::test]
    async fn test_standing_levels() {
        let client = Arc::new(FakeClient::new().with_group("g1", &["bot", "mod"]));
        let perms = permissions(client, MemoryStore::new().with_admins(vec!["global".into()]));
        let mut settings = GroupSettings::new("g1");
        settings.admin_list.insert("boxadmin".into(), ListEntry::named("B"));
        settings.white_list.insert("friend".into(), ListEntry::named("F"));

        for admin in ["owner", "global", "mod", "boxadmin"] {
            let standing = perms.standing(&group_message("g1", admin, "hi"), &settings).await;
            assert!(standing.is_admin, "{} should be admin", admin);
        }

        let standing = perms.standing(&group_message("g1", "friend", "hi"), &settings).await;
        assert!(!standing.is_admin);
        assert!(standing.is_whitelisted);
        assert!(standing.bot_is_admin);
    }

    #[tokio::test]
    async fn test_bot_without_rights() {
        let client = Arc::new(FakeClient::new().with_group("g1", &["mod"]));
        let perms = permissions(client, MemoryStore::new());
        let standing = perms
            .standing(&group_message("g1", "stranger", "hi"), &GroupSettings::new("g1"))
            .await;
        assert!(!standing.bot_is_admin);
        assert!(!standing.is_admin);
    }

    #[tokio::test]
    async fn test_group_info_is_cached_until_invalidated() {
        let client = Arc::new(FakeClient::new().with_group("g1", &["bot"]));
        let perms = permissions(client.clone(), MemoryStore::new());
        perms.group_info("g1").await.unwrap();
        perms.group_info("g1").await.unwrap();
        assert_eq!(client.group_info_calls(), 1);
        perms.invalidate("g1");
        perms.group_info("g1").await.unwrap();
        assert_eq!(client.group_info_calls(), 2);
    }
}
