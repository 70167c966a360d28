//! Sensitive-image filter backed by an external classifier.
//!
//! Whitelisted senders are not exempt; they get a higher confidence
//! threshold instead. A classifier failure lets the image through.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{ContentClassifier, Guard, GuardInput, GuardKind, Verdict};
use crate::client::MessageKind;
use crate::config::NudeThresholds;

pub struct AntiNudeGuard {
    classifier: Arc<dyn ContentClassifier>,
    thresholds: NudeThresholds,
}

impl AntiNudeGuard {
    pub fn new(classifier: Arc<dyn ContentClassifier>, thresholds: NudeThresholds) -> Self {
        Self {
            classifier,
            thresholds,
        }
    }
}

#[async_trait]
impl Guard for AntiNudeGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::AntiNude
    }

    fn whitelist_exempts(&self) -> bool {
        false
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        let message = input.message;
        if !message.kind().is_visual() {
            return Verdict::Pass;
        }
        let Some(attachment) = message.attachment() else {
            return Verdict::Pass;
        };
        // videos are judged by their thumbnail
        let url = if message.kind() == MessageKind::Video && !attachment.thumb.is_empty() {
            attachment.thumb.as_str()
        } else {
            attachment.href.as_str()
        };
        if url.is_empty() {
            return Verdict::Pass;
        }

        let result = match self.classifier.classify(url).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Classifier failed for {}, letting it through: {}", message.data.msg_id, e);
                return Verdict::Pass;
            }
        };
        let threshold = self.thresholds.for_sender(input.standing.is_whitelisted);
        if result.confidence >= f32::from(threshold) {
            Verdict::violation(format!("confidence {:.1} >= {}", result.confidence, threshold))
        } else {
            Verdict::Pass
        }
    }
}
