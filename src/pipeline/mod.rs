//! Moderation pipeline for inbound messages.
//!
//! A group message walks a fixed chain of guards. Deleting guards stop the
//! message for good; a guard that only suppresses (block list, a custom
//! rule without delete) clears `handle_chat` but lets command dispatch run.
//!
//! ```text
//! custom rule -> anti-bot -> [auto-download] -> anti-spam -> anti-media
//!   -> anti-sticker -> mute filter -> anti-badword -> block list
//!   -> commands -> chat features (if handle_chat)
//!   -> anti-link | anti-link-keyword | anti-not-text | anti-nude | anti-forward
//! ```
//!
//! The last five run concurrently and independently: each may delete and
//! strike on its own.

mod commands;
mod features;

use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, warn};

use crate::bot::AppState;
use crate::client::{Message, OutgoingMessage, ThreadType};
use crate::guards::{
    self, AntiBadwordGuard, AntiBotGuard, AntiForwardGuard, AntiLinkGuard, AntiLinkKeywordGuard,
    AntiMediaGuard, AntiNotTextGuard, AntiNudeGuard, AntiSpamGuard, AntiStickerGuard,
    BlockListGuard, CustomRuleGuard, FloodTracker, Guard, GuardKind, MessageCycle,
    MuteFilterGuard,
};
use crate::i18n::{format_text, get_text};
use crate::storage::{GroupSettings, StoreError};
use crate::utils::now_ms;

pub use commands::ModerationCommands;
pub use features::{AutoDownloader, ChatFeature, CommandHandler};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to load settings for {thread_id}: {source}")]
    Settings {
        thread_id: String,
        #[source]
        source: StoreError,
    },

    #[error("command handler failed: {0:#}")]
    Command(anyhow::Error),

    #[error("feature {name} failed: {error:#}")]
    Feature { name: String, error: anyhow::Error },
}

impl PipelineError {
    /// Short code used in diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Settings { .. } => "E_SETTINGS",
            Self::Command(_) => "E_COMMAND",
            Self::Feature { .. } => "E_FEATURE",
        }
    }
}

/// What happened to one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Guard that deleted the message and ended the cycle.
    pub suppressed_by: Option<GuardKind>,
    /// Every non-passing guard, in evaluation order.
    pub triggered: Vec<GuardKind>,
    /// Whether chat features were allowed to see the message.
    pub handle_chat: bool,
    pub command_handled: bool,
}

impl Default for CycleOutcome {
    fn default() -> Self {
        Self {
            suppressed_by: None,
            triggered: Vec::new(),
            handle_chat: true,
            command_handled: false,
        }
    }
}

enum Stage {
    Guard(Arc<dyn Guard>),
    AutoDownload,
}

pub struct Pipeline {
    state: Arc<AppState>,
    chain: Vec<Stage>,
    concurrent: Vec<Arc<dyn Guard>>,
    flood: FloodTracker,
    moderation: ModerationCommands,
    commands: Option<Arc<dyn CommandHandler>>,
    features: Vec<Arc<dyn ChatFeature>>,
    downloader: Option<Arc<dyn AutoDownloader>>,
}

/// Builder for [`Pipeline`]; the guard order is fixed, only the extension
/// points are pluggable.
pub struct PipelineBuilder {
    state: Arc<AppState>,
    commands: Option<Arc<dyn CommandHandler>>,
    features: Vec<Arc<dyn ChatFeature>>,
    downloader: Option<Arc<dyn AutoDownloader>>,
}

impl PipelineBuilder {
    #[must_use]
    pub fn command_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.commands = Some(handler);
        self
    }

    #[must_use]
    pub fn feature(mut self, feature: Arc<dyn ChatFeature>) -> Self {
        self.features.push(feature);
        self
    }

    #[must_use]
    pub fn downloader(mut self, downloader: Arc<dyn AutoDownloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn build(self) -> Pipeline {
        let state = self.state;
        let spam = AntiSpamGuard::new(state.config.spam.clone());
        let flood = spam.tracker().clone();

        let chain = vec![
            Stage::Guard(Arc::new(CustomRuleGuard::new())),
            Stage::Guard(Arc::new(AntiBotGuard)),
            Stage::AutoDownload,
            Stage::Guard(Arc::new(spam)),
            Stage::Guard(Arc::new(AntiMediaGuard::new(state.prophylactic.clone()))),
            Stage::Guard(Arc::new(AntiStickerGuard)),
            Stage::Guard(Arc::new(MuteFilterGuard)),
            Stage::Guard(Arc::new(AntiBadwordGuard)),
            Stage::Guard(Arc::new(BlockListGuard)),
        ];
        let concurrent: Vec<Arc<dyn Guard>> = vec![
            Arc::new(AntiLinkGuard),
            Arc::new(AntiLinkKeywordGuard),
            Arc::new(AntiNotTextGuard),
            Arc::new(AntiNudeGuard::new(state.classifier.clone(), state.config.nude)),
            Arc::new(AntiForwardGuard),
        ];

        Pipeline {
            moderation: ModerationCommands::new(state.clone()),
            state,
            chain,
            concurrent,
            flood,
            commands: self.commands,
            features: self.features,
            downloader: self.downloader,
        }
    }
}

impl Pipeline {
    pub fn builder(state: Arc<AppState>) -> PipelineBuilder {
        PipelineBuilder {
            state,
            commands: None,
            features: Vec::new(),
            downloader: None,
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Message-rate tracker, pruned by the ephemeral sweeper.
    pub fn flood_tracker(&self) -> &FloodTracker {
        &self.flood
    }

    /// Run one message through the pipeline.
    pub async fn handle_message(&self, message: &Message) -> Result<CycleOutcome, PipelineError> {
        if !message.is_group() {
            return self.handle_direct(message).await;
        }
        let now = now_ms();
        let settings = self
            .state
            .settings
            .load(&message.thread_id)
            .await
            .map_err(|source| PipelineError::Settings {
                thread_id: message.thread_id.clone(),
                source,
            })?;

        self.observe_upload(message, &settings, now).await;

        let cycle = MessageCycle::new(message, &settings, &self.state.permissions, now);
        let mut outcome = CycleOutcome::default();

        for stage in &self.chain {
            let guard = match stage {
                Stage::AutoDownload => {
                    self.trigger_download(message);
                    continue;
                }
                Stage::Guard(guard) => guard,
            };
            let verdict = guards::evaluate(guard.as_ref(), &cycle, &self.state.enforcer).await;
            if verdict.is_pass() {
                continue;
            }
            outcome.triggered.push(guard.kind());
            outcome.handle_chat = false;
            if verdict.removes_message() {
                outcome.suppressed_by = Some(guard.kind());
                return Ok(outcome);
            }
        }

        let mut failure = None;
        match self.dispatch_command(message, Some(&settings), outcome.handle_chat).await {
            Ok(handled) => outcome.command_handled = handled,
            Err(e) => failure = Some(e),
        }
        if outcome.handle_chat && !outcome.command_handled && failure.is_none() {
            failure = self.run_features(message, Some(&settings)).await.err();
        }

        let verdicts = join_all(
            self.concurrent
                .iter()
                .map(|guard| guards::evaluate(guard.as_ref(), &cycle, &self.state.enforcer)),
        )
        .await;
        for (guard, verdict) in self.concurrent.iter().zip(verdicts) {
            if !verdict.is_pass() {
                outcome.triggered.push(guard.kind());
                if verdict.removes_message() && outcome.suppressed_by.is_none() {
                    outcome.suppressed_by = Some(guard.kind());
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }

    /// Direct messages skip the guards entirely.
    async fn handle_direct(&self, message: &Message) -> Result<CycleOutcome, PipelineError> {
        let mut outcome = CycleOutcome::default();
        if message.is_self || message.sender_id() == self.state.bot_id() {
            return Ok(outcome);
        }
        outcome.command_handled = self.dispatch_command(message, None, true).await?;
        if outcome.command_handled {
            return Ok(outcome);
        }
        if self.run_features(message, None).await? {
            return Ok(outcome);
        }

        // nobody answered: introduce the bot, at most once per cooldown
        let sender = message.sender_id();
        if self
            .state
            .cooldowns
            .try_business_card(&message.thread_id, sender, now_ms())
        {
            let intro = get_text(crate::i18n::DEFAULT_LOCALE, "direct.intro");
            if let Err(e) = self
                .state
                .client
                .send_message(OutgoingMessage::text(intro), &message.thread_id, ThreadType::Direct)
                .await
            {
                debug!("Failed to send intro to {}: {}", sender, e);
            }
        }
        Ok(outcome)
    }

    async fn dispatch_command(
        &self,
        message: &Message,
        settings: Option<&GroupSettings>,
        handle_chat: bool,
    ) -> Result<bool, PipelineError> {
        if let Some(settings) = settings
            && self.moderation.try_handle(message, settings).await
        {
            return Ok(true);
        }
        match &self.commands {
            Some(handler) => handler
                .handle_command(message, settings, handle_chat)
                .await
                .map_err(PipelineError::Command),
            None => Ok(false),
        }
    }

    /// Run chat features until one consumes the message.
    async fn run_features(&self, message: &Message, settings: Option<&GroupSettings>) -> Result<bool, PipelineError> {
        for feature in &self.features {
            let consumed = feature
                .handle(message, settings)
                .await
                .map_err(|error| PipelineError::Feature {
                    name: feature.name().to_string(),
                    error,
                })?;
            if consumed {
                debug!("{} consumed {}", feature.name(), message.data.msg_id);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn trigger_download(&self, message: &Message) {
        let Some(downloader) = self.downloader.clone() else {
            return;
        };
        if message.is_self || !downloader.wants(message) {
            return;
        }
        let message = message.clone();
        tokio::spawn(async move {
            let msg_id = message.data.msg_id.clone();
            if let Err(e) = downloader.download(message).await {
                warn!("Auto-download of {} failed: {:#}", msg_id, e);
            }
        });
    }

    /// Feed group uploads to the burst detector and announce activation.
    async fn observe_upload(&self, message: &Message, settings: &GroupSettings, now: i64) {
        if message.is_self || !message.kind().is_media() {
            return;
        }
        if !self.state.prophylactic.record_upload(&message.thread_id, now).await {
            return;
        }
        let minutes = self.state.prophylactic.policy().timeout.as_secs() / 60;
        let text = format_text(
            settings.locale(),
            "prophylactic.activated",
            &[("minutes", minutes.to_string().as_str())],
        );
        if let Err(e) = self
            .state
            .client
            .send_message(OutgoingMessage::text(text), &message.thread_id, ThreadType::Group)
            .await
        {
            warn!("Failed to announce prophylactic mode: {}", e);
        }
    }
}
