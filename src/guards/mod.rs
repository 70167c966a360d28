//! Guard stages.
//!
//! Every moderation check implements [`Guard`]: a `decide` step that looks
//! at the message and returns a [`Verdict`], with all side effects (delete,
//! strike, warn, escalate) applied afterwards by the [`Enforcer`].
//!
//! Add a new guard by:
//! 1. Creating a new file in this directory
//! 2. Adding a variant to [`GuardKind`] and a toggle to the group settings
//! 3. Registering it in the sequencer's chain

pub mod anti_badword;
pub mod anti_bot;
pub mod anti_forward;
pub mod anti_link;
pub mod anti_link_keyword;
pub mod anti_media;
pub mod anti_not_text;
pub mod anti_nude;
pub mod anti_spam;
pub mod anti_sticker;
pub mod block_list;
pub mod classifier;
pub mod custom_rule;
mod enforce;
mod kind;
pub mod mute_filter;
pub mod prophylactic;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::client::Message;
use crate::permissions::{Permissions, SenderStanding};
use crate::storage::GroupSettings;

pub use anti_badword::AntiBadwordGuard;
pub use anti_bot::AntiBotGuard;
pub use anti_forward::AntiForwardGuard;
pub use anti_link::AntiLinkGuard;
pub use anti_link_keyword::AntiLinkKeywordGuard;
pub use anti_media::AntiMediaGuard;
pub use anti_not_text::AntiNotTextGuard;
pub use anti_nude::AntiNudeGuard;
pub use anti_spam::{AntiSpamGuard, FloodTracker};
pub use anti_sticker::AntiStickerGuard;
pub use block_list::BlockListGuard;
pub use classifier::{Classification, ClassifierError, ContentClassifier, DisabledClassifier, HttpClassifier};
pub use custom_rule::CustomRuleGuard;
pub use enforce::Enforcer;
pub use kind::GuardKind;
pub use mute_filter::MuteFilterGuard;
pub use prophylactic::ProphylacticMode;

/// Outcome of a guard's decision step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Not triggered.
    Pass,
    /// Stop the message without a strike. `delete` removes it from the
    /// group; `reply` is sent to the thread.
    Suppress {
        reason: String,
        delete: bool,
        reply: Option<String>,
    },
    /// Full strike contract: delete, record, warn, maybe escalate.
    Violation { reason: String },
}

impl Verdict {
    pub fn violation(reason: impl Into<String>) -> Self {
        Self::Violation { reason: reason.into() }
    }

    pub fn ignore(reason: impl Into<String>) -> Self {
        Self::Suppress {
            reason: reason.into(),
            delete: false,
            reply: None,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Whether the message is removed from the group.
    pub fn removes_message(&self) -> bool {
        match self {
            Self::Pass => false,
            Self::Suppress { delete, .. } => *delete,
            Self::Violation { .. } => true,
        }
    }
}

/// What a guard sees when deciding.
#[derive(Debug, Clone, Copy)]
pub struct GuardInput<'a> {
    pub message: &'a Message,
    pub settings: &'a GroupSettings,
    pub standing: SenderStanding,
    pub now_ms: i64,
}

/// A single moderation check.
#[async_trait]
pub trait Guard: Send + Sync {
    fn kind(&self) -> GuardKind;

    /// Whether the guard is switched on for this group.
    fn is_active(&self, settings: &GroupSettings) -> bool {
        settings.is_enabled(self.kind())
    }

    /// Whitelisted senders skip this guard entirely. Guards with relaxed
    /// whitelist thresholds return `false` and handle it in `decide`.
    fn whitelist_exempts(&self) -> bool {
        true
    }

    /// Whether the guard is moot when the bot cannot delete or remove.
    fn needs_bot_admin(&self) -> bool {
        true
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict;
}

/// One message's trip through the guards.
///
/// The sender's standing is resolved lazily, so a group with every guard
/// switched off costs nothing beyond the settings read.
pub struct MessageCycle<'a> {
    pub message: &'a Message,
    pub settings: &'a GroupSettings,
    pub now_ms: i64,
    permissions: Option<&'a Permissions>,
    standing: OnceCell<SenderStanding>,
}

impl<'a> MessageCycle<'a> {
    pub fn new(
        message: &'a Message,
        settings: &'a GroupSettings,
        permissions: &'a Permissions,
        now_ms: i64,
    ) -> Self {
        Self {
            message,
            settings,
            now_ms,
            permissions: Some(permissions),
            standing: OnceCell::new(),
        }
    }

    /// Cycle with a pre-resolved standing.
    pub fn with_standing(
        message: &'a Message,
        settings: &'a GroupSettings,
        standing: SenderStanding,
        now_ms: i64,
    ) -> Self {
        Self {
            message,
            settings,
            now_ms,
            permissions: None,
            standing: OnceCell::new_with(Some(standing)),
        }
    }

    pub async fn standing(&self) -> SenderStanding {
        *self
            .standing
            .get_or_init(|| async {
                match self.permissions {
                    Some(permissions) => permissions.standing(self.message, self.settings).await,
                    None => SenderStanding::default(),
                }
            })
            .await
    }

    /// Whether a guard should look at this message at all.
    pub async fn should_check(&self, guard: &dyn Guard) -> Option<GuardInput<'a>> {
        if !guard.is_active(self.settings) {
            return None;
        }
        let standing = self.standing().await;
        if standing.is_self || standing.is_admin {
            return None;
        }
        if guard.needs_bot_admin() && !standing.bot_is_admin {
            return None;
        }
        if standing.is_whitelisted && guard.whitelist_exempts() {
            return None;
        }
        Some(GuardInput {
            message: self.message,
            settings: self.settings,
            standing,
            now_ms: self.now_ms,
        })
    }
}

/// Run one guard against a message: exemptions, decision, enforcement.
///
/// Returns the applied verdict; [`Verdict::Pass`] when the guard was
/// skipped or did not trigger.
pub async fn evaluate(guard: &dyn Guard, cycle: &MessageCycle<'_>, enforcer: &Enforcer) -> Verdict {
    let Some(input) = cycle.should_check(guard).await else {
        return Verdict::Pass;
    };
    let verdict = guard.decide(&input).await;
    if verdict.is_pass() {
        return verdict;
    }
    debug!(
        "{} triggered on {} from {}",
        guard.kind(),
        input.message.data.msg_id,
        input.message.sender_id()
    );
    enforcer.apply(guard.kind(), &input, verdict.clone()).await;
    verdict
}
