//! Handlers for non-message events.
//!
//! Group membership changes, reactions and recalls never touch the guards.
//! Each runs a small built-in step and then hands the event to the
//! deployment's [`EventHooks`].

mod group_event;
mod reaction;
mod undo;

use async_trait::async_trait;

use crate::cache::CachedMessage;
use crate::client::{GroupEvent, Reaction, Undo};
use crate::storage::GroupSettings;

pub use group_event::handle_group_event;
pub use reaction::handle_reaction;
pub use undo::handle_undo;

/// External handlers for non-message events. Every method defaults to a
/// no-op.
#[async_trait]
pub trait EventHooks: Send + Sync {
    async fn on_group_event(&self, _event: &GroupEvent, _settings: Option<&GroupSettings>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_reaction(&self, _reaction: &Reaction) -> anyhow::Result<()> {
        Ok(())
    }

    /// `original` is the recalled message when it is still cached.
    async fn on_undo(&self, _undo: &Undo, _original: Option<&CachedMessage>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl EventHooks for NoHooks {}
