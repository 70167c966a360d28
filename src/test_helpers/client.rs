use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::{
    ChatClient, ClientError, GroupInfo, MessageRef, OutgoingMessage, ThreadType, UserInfo,
};

/// A message the fake client was asked to send.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub thread_id: String,
    pub thread_type: ThreadType,
    pub message: OutgoingMessage,
}

/// In-memory [`ChatClient`] that records every call.
#[derive(Default)]
pub struct FakeClient {
    groups: Mutex<HashMap<String, GroupInfo>>,
    users: Mutex<HashMap<String, UserInfo>>,
    sent: Mutex<Vec<SentMessage>>,
    deleted: Mutex<Vec<MessageRef>>,
    blocked: Mutex<Vec<(String, String)>>,
    removed: Mutex<Vec<(String, String)>>,
    reactions: Mutex<Vec<(String, String)>>,
    group_info_calls: AtomicUsize,
    fail_deletes: AtomicBool,
    fail_blocks: AtomicBool,
    fail_sends: AtomicBool,
}

fn rejected(endpoint: &str) -> ClientError {
    ClientError::Rejected {
        endpoint: endpoint.to_string(),
        status: 500,
    }
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group whose admins are `admins`.
    pub fn with_group(self, thread_id: &str, admins: &[&str]) -> Self {
        self.groups.lock().insert(
            thread_id.to_string(),
            GroupInfo {
                group_id: thread_id.to_string(),
                name: format!("Group {}", thread_id),
                admin_ids: admins.iter().map(|a| a.to_string()).collect(),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_user(self, user: UserInfo) -> Self {
        self.users.lock().insert(user.user_id.clone(), user);
        self
    }

    /// Replace a group's admin set after construction.
    pub fn set_admins(&self, thread_id: &str, admins: &[&str]) {
        if let Some(group) = self.groups.lock().get_mut(thread_id) {
            group.admin_ids = admins.iter().map(|a| a.to_string()).collect();
        }
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_blocks(&self, fail: bool) {
        self.fail_blocks.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Texts sent to one thread, in order.
    pub fn sent_texts(&self, thread_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|s| s.thread_id == thread_id)
            .map(|s| s.message.text.clone())
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.deleted.lock().clone()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().iter().map(|r| r.msg_id.clone()).collect()
    }

    pub fn blocked(&self) -> Vec<(String, String)> {
        self.blocked.lock().clone()
    }

    pub fn removed(&self) -> Vec<(String, String)> {
        self.removed.lock().clone()
    }

    pub fn reactions(&self) -> Vec<(String, String)> {
        self.reactions.lock().clone()
    }

    pub fn group_info_calls(&self) -> usize {
        self.group_info_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatClient for FakeClient {
    async fn send_message(
        &self,
        message: OutgoingMessage,
        thread_id: &str,
        thread_type: ThreadType,
    ) -> Result<(), ClientError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(rejected("send"));
        }
        self.sent.lock().push(SentMessage {
            thread_id: thread_id.to_string(),
            thread_type,
            message,
        });
        Ok(())
    }

    async fn delete_message(&self, message: &MessageRef, _is_self: bool) -> Result<(), ClientError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(rejected("delete"));
        }
        self.deleted.lock().push(message.clone());
        Ok(())
    }

    async fn block_users(&self, thread_id: &str, user_ids: &[String]) -> Result<(), ClientError> {
        if self.fail_blocks.load(Ordering::SeqCst) {
            return Err(rejected("block"));
        }
        let mut blocked = self.blocked.lock();
        for user in user_ids {
            blocked.push((thread_id.to_string(), user.clone()));
        }
        Ok(())
    }

    async fn remove_user_from_group(&self, thread_id: &str, user_id: &str) -> Result<(), ClientError> {
        self.removed
            .lock()
            .push((thread_id.to_string(), user_id.to_string()));
        Ok(())
    }

    async fn add_reaction(&self, icon: &str, message: &MessageRef) -> Result<(), ClientError> {
        self.reactions
            .lock()
            .push((icon.to_string(), message.msg_id.clone()));
        Ok(())
    }

    async fn get_group_info(&self, thread_id: &str) -> Result<GroupInfo, ClientError> {
        self.group_info_calls.fetch_add(1, Ordering::SeqCst);
        self.groups
            .lock()
            .get(thread_id)
            .cloned()
            .ok_or_else(|| rejected("group"))
    }

    async fn get_user_info(&self, user_id: &str) -> Result<UserInfo, ClientError> {
        Ok(self.users.lock().get(user_id).cloned().unwrap_or_else(|| UserInfo {
            user_id: user_id.to_string(),
            ..Default::default()
        }))
    }
}
