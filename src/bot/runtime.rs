//! Bot runtime - wires the services together and runs until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::{AppState, Diagnostics, EventRouter};
use crate::client::{BridgeClient, ChatClient, IngressState, serve_ingress};
use crate::config::{Config, StorageBackend};
use crate::events::{EventHooks, NoHooks};
use crate::guards::{ContentClassifier, DisabledClassifier, HttpClassifier};
use crate::pipeline::{AutoDownloader, ChatFeature, CommandHandler, Pipeline};
use crate::render::SvgCardRenderer;
use crate::scheduler::Sweepers;
use crate::storage::{FileStore, MongoStore, Store};

/// Events buffered between the ingress and the router.
const EVENT_BUFFER: usize = 1024;

/// Deployment-supplied handlers plugged into the pipeline and router.
pub struct Extensions {
    pub commands: Option<Arc<dyn CommandHandler>>,
    pub features: Vec<Arc<dyn ChatFeature>>,
    pub downloader: Option<Arc<dyn AutoDownloader>>,
    pub hooks: Arc<dyn EventHooks>,
}

impl Default for Extensions {
    fn default() -> Self {
        Self {
            commands: None,
            features: Vec::new(),
            downloader: None,
            hooks: Arc::new(NoHooks),
        }
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match &config.storage {
        StorageBackend::File { data_dir } => {
            info!("Using JSON store in {}", data_dir.display());
            Arc::new(FileStore::open(data_dir.clone()).await?)
        }
        StorageBackend::Mongo { uri, database } => {
            info!("Connecting to MongoDB...");
            let store = MongoStore::connect(uri, database).await?;
            info!("Database connected");
            Arc::new(store)
        }
    };
    Ok(store)
}

fn classifier(config: &Config) -> anyhow::Result<Arc<dyn ContentClassifier>> {
    match &config.classifier_url {
        Some(url) => Ok(Arc::new(
            HttpClassifier::new(url.clone()).context("invalid classifier endpoint")?,
        )),
        None => {
            info!("CLASSIFIER_URL not set, anti-nude passes everything");
            Ok(Arc::new(DisabledClassifier))
        }
    }
}

/// Run the bot with no extensions.
pub async fn run(config: Config) -> anyhow::Result<()> {
    run_with(config, Extensions::default()).await
}

/// Run the bot until Ctrl-C.
pub async fn run_with(config: Config, extensions: Extensions) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let client: Arc<dyn ChatClient> = Arc::new(
        BridgeClient::new(&config.bridge_url, config.bridge_token.clone())
            .context("invalid bridge URL")?,
    );
    let classifier = classifier(&config)?;
    let renderer = Arc::new(SvgCardRenderer::new(config.render_dir.clone()));

    let ingress_addr = config.ingress_addr;
    let ingress_secret = config.ingress_secret.clone();
    let log_thread_id = config.log_thread_id.clone();

    let state = Arc::new(AppState::build(config, client.clone(), store, classifier, renderer).await);

    let mut builder = Pipeline::builder(state.clone());
    if let Some(commands) = extensions.commands {
        builder = builder.command_handler(commands);
    }
    for feature in extensions.features {
        builder = builder.feature(feature);
    }
    if let Some(downloader) = extensions.downloader {
        builder = builder.downloader(downloader);
    }
    let pipeline = Arc::new(builder.build());

    let sweepers = Arc::new(Sweepers::new(state.clone(), pipeline.flood_tracker().clone()));
    let sweeper_handles = sweepers.spawn();

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let router = Arc::new(EventRouter::new(
        pipeline,
        extensions.hooks,
        Diagnostics::standard(client, log_thread_id.as_deref()),
    ));
    let router_handle = tokio::spawn(router.run(rx));

    let ingress = IngressState::new(tx, ingress_secret);
    let ingress_handle = tokio::spawn(async move {
        if let Err(e) = serve_ingress(ingress_addr, ingress).await {
            error!("Event ingress stopped: {}", e);
        }
    });

    info!("Bot is running, press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
    }
    info!("Shutting down...");

    ingress_handle.abort();
    router_handle.abort();
    for handle in sweeper_handles {
        handle.abort();
    }
    Ok(())
}
