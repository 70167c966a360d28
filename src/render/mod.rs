//! Escalation cards.
//!
//! When a guard escalates, the group gets an image announcing who was
//! blocked and why. Rendering is CPU-bound, so it runs on the blocking pool;
//! the produced file is always cleared after sending, whether or not the
//! send succeeded.

mod svg;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::client::Gender;

pub use svg::SvgCardRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write card {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything drawn on an escalation card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationCard {
    pub user_id: String,
    pub display_name: String,
    pub avatar: String,
    pub gender: Gender,
    pub group_name: String,
    pub group_type: u8,
    pub reason: String,
    pub action: String,
    pub locale: String,
}

#[async_trait]
pub trait EscalationRenderer: Send + Sync {
    /// Render the card to a file and return its path.
    async fn render_escalation_card(&self, card: &EscalationCard) -> Result<PathBuf, RenderError>;

    /// Delete a rendered card. Never fails; a missing file is fine.
    async fn clear_image_path(&self, path: &Path);
}
