//! Where router failures are reported.
//!
//! Every failure is logged; when `LOG_THREAD_ID` is set the same text is
//! also sent to that chat thread.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::client::{ChatClient, OutgoingMessage, ThreadType};

/// Longest diagnostic forwarded to a chat thread.
const MAX_THREAD_DIAGNOSTIC: usize = 1500;

#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    /// Report a failure of one event. Must not fail.
    async fn report(&self, class: &str, code: &str, detail: &str);
}

/// Logs diagnostics at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl DiagnosticSink for TracingSink {
    async fn report(&self, class: &str, code: &str, detail: &str) {
        error!("[{}] {} handler failed: {}", code, class, detail);
    }
}

/// Forwards diagnostics to a chat thread, best-effort.
pub struct ThreadSink {
    client: Arc<dyn ChatClient>,
    thread_id: String,
}

impl ThreadSink {
    pub fn new(client: Arc<dyn ChatClient>, thread_id: impl Into<String>) -> Self {
        Self {
            client,
            thread_id: thread_id.into(),
        }
    }
}

#[async_trait]
impl DiagnosticSink for ThreadSink {
    async fn report(&self, class: &str, code: &str, detail: &str) {
        let mut text = format!("[{}] {}: {}", code, class, detail);
        if let Some((cut, _)) = text.char_indices().nth(MAX_THREAD_DIAGNOSTIC) {
            text.truncate(cut);
        }
        if let Err(e) = self
            .client
            .send_message(OutgoingMessage::text(text), &self.thread_id, ThreadType::Group)
            .await
        {
            warn!("Failed to forward diagnostic to {}: {}", self.thread_id, e);
        }
    }
}

/// Fan-out over several sinks.
#[derive(Default, Clone)]
pub struct Diagnostics {
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracing sink, plus a thread sink when `log_thread_id` is set.
    pub fn standard(client: Arc<dyn ChatClient>, log_thread_id: Option<&str>) -> Self {
        let diagnostics = Self::new().with(Arc::new(TracingSink));
        match log_thread_id {
            Some(thread_id) => diagnostics.with(Arc::new(ThreadSink::new(client, thread_id))),
            None => diagnostics,
        }
    }

    #[must_use]
    pub fn with(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub async fn report(&self, class: &str, code: &str, detail: &str) {
        for sink in &self.sinks {
            sink.report(class, code, detail).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeClient;

    #[tokio::test]
    async fn test_thread_sink_truncates_long_details() {
        let client = Arc::new(FakeClient::new());
        let diagnostics = Diagnostics::standard(client.clone(), Some("logs"));

        diagnostics.report("message", "E_FEATURE", &"x".repeat(5000)).await;

        let texts = client.sent_texts("logs");
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("[E_FEATURE] message: xxx"));
        assert_eq!(texts[0].chars().count(), MAX_THREAD_DIAGNOSTIC);
    }

    #[tokio::test]
    async fn test_no_thread_sink_without_log_thread() {
        let client = Arc::new(FakeClient::new());
        Diagnostics::standard(client.clone(), None)
            .report("undo", "E_HOOK", "boom")
            .await;
        assert!(client.sent().is_empty());
    }
}
