use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::guards::{Classification, ClassifierError, ContentClassifier};
use crate::render::{EscalationCard, EscalationRenderer, RenderError};

/// Classifier that answers every image with the same confidence.
pub struct FixedClassifier(pub f32);

#[async_trait]
impl ContentClassifier for FixedClassifier {
    async fn classify(&self, _media_url: &str) -> Result<Classification, ClassifierError> {
        Ok(Classification {
            is_flagged: self.0 > 0.0,
            confidence: self.0,
        })
    }
}

/// Classifier whose endpoint is always down.
pub struct FailingClassifier;

#[async_trait]
impl ContentClassifier for FailingClassifier {
    async fn classify(&self, _media_url: &str) -> Result<Classification, ClassifierError> {
        Err(ClassifierError::Rejected(503))
    }
}

/// Renderer that hands out fake paths and records what was cleared.
#[derive(Default)]
pub struct RecordingRenderer {
    rendered: Mutex<Vec<EscalationCard>>,
    cleared: Mutex<Vec<PathBuf>>,
    fail: AtomicBool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn rendered(&self) -> Vec<EscalationCard> {
        self.rendered.lock().clone()
    }

    pub fn cleared(&self) -> Vec<PathBuf> {
        self.cleared.lock().clone()
    }
}

#[async_trait]
impl EscalationRenderer for RecordingRenderer {
    async fn render_escalation_card(&self, card: &EscalationCard) -> Result<PathBuf, RenderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RenderError::Io {
                path: "card".to_string(),
                source: std::io::Error::other("render disabled"),
            });
        }
        let mut rendered = self.rendered.lock();
        rendered.push(card.clone());
        Ok(PathBuf::from(format!("/tmp/card-{}.svg", rendered.len())))
    }

    async fn clear_image_path(&self, path: &Path) {
        self.cleared.lock().push(path.to_path_buf());
    }
}
