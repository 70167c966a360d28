//! Webhook ingress for events pushed by the bridge.
//!
//! `POST /events` accepts one [`ClientEvent`] per request and forwards it into
//! the router's channel. `GET /health` is a liveness probe.

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::ClientEvent;

/// Header carrying the shared ingress secret.
pub const SECRET_HEADER: &str = "x-warden-secret";

#[derive(Clone)]
pub struct IngressState {
    events: mpsc::Sender<ClientEvent>,
    secret: Option<String>,
}

impl IngressState {
    pub fn new(events: mpsc::Sender<ClientEvent>, secret: Option<String>) -> Self {
        Self { events, secret }
    }
}

/// Build the ingress router.
pub fn ingress_router(state: IngressState) -> Router {
    Router::new()
        .route("/events", post(receive_event))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind and serve the ingress until the process shuts down.
pub async fn serve_ingress(addr: SocketAddr, state: IngressState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Event ingress listening on {}", addr);
    axum::serve(listener, ingress_router(state)).await
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn receive_event(
    State(state): State<IngressState>,
    headers: HeaderMap,
    Json(event): Json<ClientEvent>,
) -> StatusCode {
    if let Some(expected) = &state.secret {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            warn!("Rejected ingress event with missing or wrong secret");
            return StatusCode::UNAUTHORIZED;
        }
    }

    match state.events.send(event).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => {
            warn!("Event channel closed, dropping ingress event");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Reaction, ThreadType};
    use axum::http::HeaderValue;

    fn reaction() -> ClientEvent {
        ClientEvent::Reaction(Reaction {
            thread_id: "g1".into(),
            thread_type: ThreadType::Group,
            uid_from: "u1".into(),
            msg_id: "m1".into(),
            icon: "/-heart".into(),
        })
    }

    #[tokio::test]
    async fn test_event_forwarded_without_secret() {
        let (tx, mut rx) = mpsc::channel(4);
        let state = IngressState::new(tx, None);
        let status = receive_event(State(state), HeaderMap::new(), Json(reaction())).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(rx.recv().await, Some(reaction()));
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let (tx, mut rx) = mpsc::channel(4);
        let state = IngressState::new(tx, Some("s3cret".into()));
        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, HeaderValue::from_static("nope"));
        let status = receive_event(State(state.clone()), headers, Json(reaction())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(rx.try_recv().is_err());

        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, HeaderValue::from_static("s3cret"));
        let status = receive_event(State(state), headers, Json(reaction())).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }
}
