//! Deletes photos, videos, files, voice notes and GIFs.
//!
//! Also active in every group while prophylactic mode is on.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Guard, GuardInput, GuardKind, ProphylacticMode, Verdict};
use crate::storage::GroupSettings;

pub struct AntiMediaGuard {
    prophylactic: Arc<ProphylacticMode>,
}

impl AntiMediaGuard {
    pub fn new(prophylactic: Arc<ProphylacticMode>) -> Self {
        Self { prophylactic }
    }
}

#[async_trait]
impl Guard for AntiMediaGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::AntiMedia
    }

    fn is_active(&self, settings: &GroupSettings) -> bool {
        settings.anti_media || self.prophylactic.is_active()
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        let kind = input.message.kind();
        if kind.is_media() {
            Verdict::violation(format!("{:?} upload", kind))
        } else {
            Verdict::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProphylacticPolicy;
    use crate::storage::MemoryStore;
    use crate::test_helpers::{group_message, guard_input, media_message};

    #[tokio::test]
    async fn test_media_kinds() {
        let mode = Arc::new(ProphylacticMode::new(Arc::new(MemoryStore::new()), ProphylacticPolicy::default()));
        let guard = AntiMediaGuard::new(mode);
        let settings = GroupSettings::new("g1");
        for msg_type in ["chat.photo", "chat.video.msg", "share.file", "chat.voice", "chat.gif"] {
            let msg = media_message("g1", "u1", msg_type);
            assert!(!guard.decide(&guard_input(&msg, &settings)).await.is_pass(), "{}", msg_type);
        }
        let sticker = media_message("g1", "u1", "chat.sticker");
        assert!(guard.decide(&guard_input(&sticker, &settings)).await.is_pass());
        let text = group_message("g1", "u1", "hi");
        assert!(guard.decide(&guard_input(&text, &settings)).await.is_pass());
    }

    #[tokio::test]
    async fn test_prophylactic_mode_overrides_toggle() {
        let mode = Arc::new(ProphylacticMode::new(Arc::new(MemoryStore::new()), ProphylacticPolicy::default()));
        let guard = AntiMediaGuard::new(mode.clone());
        let settings = GroupSettings::new("g2");
        assert!(!guard.is_active(&settings));
        for i in 0..11 {
            mode.record_upload("g1", i).await;
        }
        assert!(guard.is_active(&settings));
    }
}
