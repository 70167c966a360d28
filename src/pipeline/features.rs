//! Extension points behind the guards.
//!
//! Command handlers, chat features and the auto-downloader are supplied by
//! the deployment; the pipeline only decides when they run.

use async_trait::async_trait;

use crate::client::Message;
use crate::storage::GroupSettings;

/// Handles prefixed commands the built-in moderation commands do not know.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Returns `true` when the message was consumed as a command.
    ///
    /// `handle_chat` is `false` when a guard asked downstream features to
    /// ignore the sender.
    async fn handle_command(
        &self,
        message: &Message,
        settings: Option<&GroupSettings>,
        handle_chat: bool,
    ) -> anyhow::Result<bool>;
}

/// Conversational feature (auto-replies, games, AI chat...). Features run
/// in registration order until one consumes the message.
#[async_trait]
pub trait ChatFeature: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, message: &Message, settings: Option<&GroupSettings>) -> anyhow::Result<bool>;
}

/// Fire-and-forget media fetcher triggered from inside the guard chain.
#[async_trait]
pub trait AutoDownloader: Send + Sync {
    fn wants(&self, message: &Message) -> bool;

    async fn download(&self, message: Message) -> anyhow::Result<()>;
}
