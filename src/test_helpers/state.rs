use std::sync::Arc;

use super::{FakeClient, FixedClassifier, RecordingRenderer};
use crate::bot::AppState;
use crate::config::Config;
use crate::guards::ContentClassifier;
use crate::storage::MemoryStore;

/// Config with bot id `bot`, one owner `owner` and default policies.
pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "BOT_ID" => Some("bot".to_string()),
        "BRIDGE_URL" => Some("http://bridge.test".to_string()),
        "OWNER_IDS" => Some("owner".to_string()),
        _ => None,
    })
    .expect("test config is complete")
}

/// Application state wired to fakes, with handles on each fake.
pub struct TestBed {
    pub client: Arc<FakeClient>,
    pub store: Arc<MemoryStore>,
    pub renderer: Arc<RecordingRenderer>,
    pub state: Arc<AppState>,
}

impl TestBed {
    pub async fn new(client: FakeClient, store: MemoryStore) -> Self {
        Self::with_classifier(client, store, Arc::new(FixedClassifier(0.0))).await
    }

    pub async fn with_classifier(
        client: FakeClient,
        store: MemoryStore,
        classifier: Arc<dyn ContentClassifier>,
    ) -> Self {
        Self::with_config(test_config(), client, store, classifier).await
    }

    pub async fn with_config(
        config: Config,
        client: FakeClient,
        store: MemoryStore,
        classifier: Arc<dyn ContentClassifier>,
    ) -> Self {
        let client = Arc::new(client);
        let store = Arc::new(store);
        let renderer = Arc::new(RecordingRenderer::new());
        let state = AppState::build(
            config,
            client.clone(),
            store.clone(),
            classifier,
            renderer.clone(),
        )
        .await;
        Self {
            client,
            store,
            renderer,
            state: Arc::new(state),
        }
    }
}
