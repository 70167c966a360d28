//! Chat-client contract.
//!
//! The protocol session lives in a separate bridge process. The pipeline
//! only sees the narrow [`ChatClient`] trait for outbound calls and a stream
//! of [`ClientEvent`]s for inbound traffic.

mod bridge;
mod ingress;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use bridge::BridgeClient;
pub use ingress::{IngressState, ingress_router, serve_ingress};
pub use types::*;

/// Errors from outbound client calls.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("bridge rejected {endpoint}: HTTP {status}")]
    Rejected { endpoint: String, status: u16 },

    #[error("invalid bridge url: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

/// Outbound operations the pipeline performs against the chat client.
///
/// Every call is best-effort from the pipeline's perspective: callers log
/// failures and carry on.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_message(
        &self,
        message: OutgoingMessage,
        thread_id: &str,
        thread_type: ThreadType,
    ) -> Result<(), ClientError>;

    async fn delete_message(&self, message: &MessageRef, is_self: bool) -> Result<(), ClientError>;

    async fn block_users(&self, thread_id: &str, user_ids: &[String]) -> Result<(), ClientError>;

    async fn remove_user_from_group(&self, thread_id: &str, user_id: &str) -> Result<(), ClientError>;

    async fn add_reaction(&self, icon: &str, message: &MessageRef) -> Result<(), ClientError>;

    async fn get_group_info(&self, thread_id: &str) -> Result<GroupInfo, ClientError>;

    async fn get_user_info(&self, user_id: &str) -> Result<UserInfo, ClientError>;
}
