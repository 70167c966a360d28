//! Event router.
//!
//! Consumes client events from the ingress channel. Every event runs in its
//! own task, and a second task boundary around the handler turns panics
//! into diagnostics, so one bad event never stops delivery of the next.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, info};

use super::{AppState, Diagnostics};
use crate::client::ClientEvent;
use crate::events::{self, EventHooks};
use crate::pipeline::{Pipeline, PipelineError};

#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("{class} hook failed: {error:#}")]
    Hook { class: &'static str, error: anyhow::Error },

    #[error("handler panicked: {0}")]
    Panic(String),
}

impl RouterError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pipeline(e) => e.code(),
            Self::Hook { .. } => "E_HOOK",
            Self::Panic(_) => "PANIC",
        }
    }
}

pub struct EventRouter {
    pipeline: Arc<Pipeline>,
    hooks: Arc<dyn EventHooks>,
    diagnostics: Diagnostics,
}

impl EventRouter {
    pub fn new(pipeline: Arc<Pipeline>, hooks: Arc<dyn EventHooks>, diagnostics: Diagnostics) -> Self {
        Self {
            pipeline,
            hooks,
            diagnostics,
        }
    }

    fn state(&self) -> &AppState {
        self.pipeline.state()
    }

    /// Drain the channel until every sender is gone.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<ClientEvent>) {
        info!("Event router started");
        while let Some(event) = events.recv().await {
            let router = self.clone();
            tokio::spawn(async move { router.route(event).await });
        }
        info!("Event channel closed, router stopping");
    }

    /// Handle one event. Failures and panics are reported, never raised.
    pub async fn route(self: Arc<Self>, event: ClientEvent) {
        let class = event.class();
        let router = self.clone();
        let result = match tokio::spawn(async move { router.dispatch(event).await }).await {
            Ok(result) => result,
            Err(e) => Err(RouterError::Panic(panic_payload(e))),
        };
        if let Err(e) = result {
            self.diagnostics.report(class, e.code(), &e.to_string()).await;
        }
    }

    async fn dispatch(&self, event: ClientEvent) -> Result<(), RouterError> {
        let hooks = self.hooks.as_ref();
        match event {
            ClientEvent::Message(message) => {
                // cached up front so the message stays quotable even when the
                // pipeline deletes it or panics
                self.state().messages.remember(&message);
                let outcome = self.pipeline.handle_message(&message).await?;
                if !outcome.triggered.is_empty() {
                    debug!(
                        "{} triggered {:?} (suppressed by {:?})",
                        message.data.msg_id, outcome.triggered, outcome.suppressed_by
                    );
                }
                Ok(())
            }
            ClientEvent::GroupEvent(event) => events::handle_group_event(self.state(), hooks, &event)
                .await
                .map_err(|error| RouterError::Hook {
                    class: "group_event",
                    error,
                }),
            ClientEvent::Reaction(reaction) => events::handle_reaction(hooks, &reaction)
                .await
                .map_err(|error| RouterError::Hook {
                    class: "reaction",
                    error,
                }),
            ClientEvent::Undo(undo) => events::handle_undo(self.state(), hooks, &undo)
                .await
                .map_err(|error| RouterError::Hook { class: "undo", error }),
        }
    }
}

fn panic_payload(error: JoinError) -> String {
    if error.is_cancelled() {
        return "task cancelled".to_string();
    }
    let payload: Box<dyn Any + Send> = error.into_panic();
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
