//! Side effects of a triggered guard.
//!
//! A violation always runs the same sequence: delete the message, record a
//! strike, then warn below the threshold or escalate at it. Identical
//! content repeated inside the dedup window is struck without a new warning.
//! Every client call here is best-effort; a failed delete or block is logged
//! and the sequence carries on.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{GuardInput, GuardKind, Verdict};
use crate::cache::Cooldowns;
use crate::client::{ChatClient, GroupInfo, Message, OutgoingMessage, ThreadType, UserInfo};
use crate::config::{Escalation, GuardPolicies, GuardPolicy};
use crate::i18n::{format_text, get_text};
use crate::permissions::Permissions;
use crate::render::{EscalationCard, EscalationRenderer};
use crate::violations::ViolationStore;

pub struct Enforcer {
    client: Arc<dyn ChatClient>,
    violations: Arc<ViolationStore>,
    permissions: Permissions,
    renderer: Arc<dyn EscalationRenderer>,
    policies: GuardPolicies,
    cooldowns: Cooldowns,
}

fn tag_for(name: &str, user_id: &str) -> String {
    if name.is_empty() {
        format!("@{}", user_id)
    } else {
        format!("@{}", name)
    }
}

impl Enforcer {
    pub fn new(
        client: Arc<dyn ChatClient>,
        violations: Arc<ViolationStore>,
        permissions: Permissions,
        renderer: Arc<dyn EscalationRenderer>,
        policies: GuardPolicies,
        cooldowns: Cooldowns,
    ) -> Self {
        Self {
            client,
            violations,
            permissions,
            renderer,
            policies,
            cooldowns,
        }
    }

    /// Carry out a non-passing verdict.
    pub async fn apply(&self, kind: GuardKind, input: &GuardInput<'_>, verdict: Verdict) {
        match verdict {
            Verdict::Pass => {}
            Verdict::Suppress { reason, delete, reply } => {
                debug!("{} suppressed {}: {}", kind, input.message.data.msg_id, reason);
                if delete {
                    self.delete(input.message).await;
                }
                if let Some(reply) = reply {
                    let outgoing = OutgoingMessage::text(reply).quoting(input.message.reference());
                    self.send(outgoing, &input.message.thread_id).await;
                }
            }
            Verdict::Violation { reason } => {
                debug!("{} violation by {}: {}", kind, input.message.sender_id(), reason);
                self.strike(kind, input).await;
            }
        }
    }

    /// Delete a message from its group, logging failures.
    pub async fn delete(&self, message: &Message) {
        if let Err(e) = self.client.delete_message(&message.reference(), false).await {
            warn!("Failed to delete {} in {}: {}", message.data.msg_id, message.thread_id, e);
        }
    }

    async fn send(&self, outgoing: OutgoingMessage, thread_id: &str) {
        if let Err(e) = self
            .client
            .send_message(outgoing, thread_id, ThreadType::Group)
            .await
        {
            warn!("Failed to send to {}: {}", thread_id, e);
        }
    }

    async fn strike(&self, kind: GuardKind, input: &GuardInput<'_>) {
        let message = input.message;
        let sender = message.sender_id();
        self.delete(message).await;

        let record = self
            .violations
            .record_violation(kind, &message.thread_id, sender, message.sender_name(), input.now_ms)
            .await;
        let policy = self.policies.get(kind);
        if record.count >= policy.threshold {
            self.escalate(kind, input, &policy).await;
            return;
        }

        // repeats inside the dedup window still count, but are warned about once
        let dedup_key = match message.attachment() {
            Some(attachment) => format!("{}:{}", kind, attachment.href),
            None => format!("{}:{}", kind, message.searchable_text()),
        };
        if self
            .cooldowns
            .first_sighting(&message.thread_id, sender, &dedup_key, input.now_ms)
        {
            self.warn(kind, input, record.count, policy.threshold).await;
        } else {
            debug!("Repeated {} content from {}, warning skipped", kind, sender);
        }
    }

    async fn warn(&self, kind: GuardKind, input: &GuardInput<'_>, count: u32, threshold: u32) {
        let message = input.message;
        let lang = input.settings.locale();
        let tag = tag_for(message.sender_name(), message.sender_id());
        let reason = get_text(lang, &format!("reason.{}", kind.as_str()));
        let text = format_text(
            lang,
            "warn.strike",
            &[
                ("name", &tag),
                ("reason", &reason),
                ("count", &count.to_string()),
                ("threshold", &threshold.to_string()),
            ],
        );
        self.send(
            OutgoingMessage::tagging(text, message.sender_id(), &tag),
            &message.thread_id,
        )
        .await;
    }

    async fn escalate(&self, kind: GuardKind, input: &GuardInput<'_>, policy: &GuardPolicy) {
        let message = input.message;
        let thread_id = message.thread_id.as_str();
        let sender = message.sender_id();

        let action = match policy.escalation {
            Escalation::Block => self.client.block_users(thread_id, &[sender.to_string()]).await,
            Escalation::Remove => self.client.remove_user_from_group(thread_id, sender).await,
        };
        match action {
            Ok(()) => info!("{} escalated: {:?} {} in {}", kind, policy.escalation, sender, thread_id),
            Err(e) => warn!("Failed to {:?} {} in {}: {}", policy.escalation, sender, thread_id, e),
        }

        let group = self.permissions.group_info(thread_id).await.unwrap_or_else(|e| {
            debug!("No group info for escalation card: {}", e);
            GroupInfo {
                group_id: thread_id.to_string(),
                ..Default::default()
            }
        });
        let user = self.client.get_user_info(sender).await.unwrap_or_else(|e| {
            debug!("No user info for escalation card: {}", e);
            UserInfo {
                user_id: sender.to_string(),
                ..Default::default()
            }
        });

        let lang = input.settings.locale();
        let display_name = if user.display_name.is_empty() {
            message.sender_name().to_string()
        } else {
            user.display_name.clone()
        };
        let group_name = if group.name.is_empty() {
            thread_id.to_string()
        } else {
            group.name.clone()
        };
        let reason = get_text(lang, &format!("reason.{}", kind.as_str()));
        let tag = tag_for(&display_name, sender);
        let (notice_key, action_key) = match policy.escalation {
            Escalation::Block => ("escalate.blocked", "card.action_block"),
            Escalation::Remove => ("escalate.removed", "card.action_remove"),
        };
        let notice = format_text(
            lang,
            notice_key,
            &[("name", &tag), ("group", &group_name), ("reason", &reason)],
        );

        let card = EscalationCard {
            user_id: sender.to_string(),
            display_name,
            avatar: user.avatar,
            gender: user.gender,
            group_name: group_name.clone(),
            group_type: group.group_type,
            reason: reason.clone(),
            action: get_text(lang, action_key),
            locale: lang.to_string(),
        };
        let announcement = OutgoingMessage::tagging(notice, sender, &tag);
        match self.renderer.render_escalation_card(&card).await {
            Ok(path) => {
                let with_card = announcement.with_attachment(path.display().to_string());
                self.send(with_card, thread_id).await;
                self.renderer.clear_image_path(&path).await;
            }
            Err(e) => {
                warn!("Failed to render escalation card: {}", e);
                self.send(announcement, thread_id).await;
            }
        }

        let dm = format_text(lang, "escalate.dm", &[("group", &group_name), ("reason", &reason)]);
        if let Err(e) = self
            .client
            .send_message(OutgoingMessage::text(dm), sender, ThreadType::Direct)
            .await
        {
            debug!("Could not notify {} directly: {}", sender, e);
        }

        self.violations.reset_violation(kind, thread_id, sender).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{GroupSettings, MemoryStore};
    use crate::test_helpers::{FakeClient, TestBed, group_message, guard_input_at};

    async fn bed() -> TestBed {
        TestBed::new(FakeClient::new().with_group("g1", &["bot"]), MemoryStore::new()).await
    }

    async fn strike(bed: &TestBed, settings: &GroupSettings, text: &str, now_ms: i64) {
        let message = group_message("g1", "u1", text);
        let input = guard_input_at(&message, settings, now_ms);
        bed.state
            .enforcer
            .apply(GuardKind::AntiBot, &input, Verdict::violation("bot"))
            .await;
    }

    #[tokio::test]
    async fn test_warns_below_threshold() {
        let bed = bed().await;
        let settings = GroupSettings::new("g1");

        strike(&bed, &settings, "one", 1_000).await;
        strike(&bed, &settings, "two", 2_000).await;

        assert_eq!(bed.client.deleted().len(), 2);
        let texts = bed.client.sent_texts("g1");
        assert_eq!(texts.len(), 2);
        assert!(texts[1].contains("2/3"));
        let record = bed.state.violations.get(GuardKind::AntiBot, "g1", "u1").unwrap();
        assert_eq!(record.count, 2);
        assert!(bed.client.blocked().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_content_counts_but_warns_once() {
        let bed = bed().await;
        let settings = GroupSettings::new("g1");

        strike(&bed, &settings, "same", 1_000).await;
        strike(&bed, &settings, "same", 3_000).await;

        assert_eq!(bed.client.deleted().len(), 2);
        assert_eq!(bed.client.sent_texts("g1").len(), 1);
        let record = bed.state.violations.get(GuardKind::AntiBot, "g1", "u1").unwrap();
        assert_eq!(record.count, 2);
    }

    #[tokio::test]
    async fn test_identical_repeats_reach_threshold() {
        let bed = bed().await;
        let settings = GroupSettings::new("g1");

        for now_ms in [1_000, 2_000, 3_000] {
            strike(&bed, &settings, "buy now", now_ms).await;
        }

        assert_eq!(bed.client.blocked(), vec![("g1".to_string(), "u1".to_string())]);
        assert!(bed.state.violations.get(GuardKind::AntiBot, "g1", "u1").is_none());
    }

    #[tokio::test]
    async fn test_escalates_at_threshold_and_clears_card() {
        let bed = bed().await;
        let settings = GroupSettings::new("g1");

        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            strike(&bed, &settings, text, 1_000 * (i as i64 + 1)).await;
        }

        assert_eq!(bed.client.blocked(), vec![("g1".to_string(), "u1".to_string())]);
        assert_eq!(bed.renderer.rendered().len(), 1);
        assert_eq!(bed.renderer.rendered()[0].group_name, "Group g1");
        assert_eq!(bed.renderer.cleared(), vec![std::path::PathBuf::from("/tmp/card-1.svg")]);

        let sent = bed.client.sent();
        let announcement = sent
            .iter()
            .find(|s| s.thread_id == "g1" && !s.message.attachments.is_empty())
            .expect("card announcement");
        assert_eq!(announcement.message.attachments, vec!["/tmp/card-1.svg".to_string()]);
        assert!(sent.iter().any(|s| s.thread_id == "u1" && s.thread_type == ThreadType::Direct));
        assert!(bed.state.violations.get(GuardKind::AntiBot, "g1", "u1").is_none());
    }

    #[tokio::test]
    async fn test_render_failure_falls_back_to_text() {
        let bed = bed().await;
        bed.renderer.fail(true);
        let settings = GroupSettings::new("g1");

        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            strike(&bed, &settings, text, 1_000 * (i as i64 + 1)).await;
        }

        let last = bed.client.sent_texts("g1").pop().unwrap();
        assert!(last.contains("Group g1"));
        assert!(bed.client.sent().iter().all(|s| s.message.attachments.is_empty()));
        assert!(bed.renderer.cleared().is_empty());
    }

    #[tokio::test]
    async fn test_failed_block_still_resets_record() {
        let bed = bed().await;
        bed.client.fail_blocks(true);
        bed.client.fail_deletes(true);
        let settings = GroupSettings::new("g1");

        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            strike(&bed, &settings, text, 1_000 * (i as i64 + 1)).await;
        }

        assert!(bed.client.blocked().is_empty());
        assert!(bed.state.violations.get(GuardKind::AntiBot, "g1", "u1").is_none());
        assert_eq!(bed.renderer.rendered().len(), 1);
    }

    #[tokio::test]
    async fn test_suppress_replies_without_strike() {
        let bed = bed().await;
        let settings = GroupSettings::new("g1");
        let message = group_message("g1", "u1", "rule hit");
        let input = guard_input_at(&message, &settings, 1_000);

        bed.state
            .enforcer
            .apply(
                GuardKind::CustomRule,
                &input,
                Verdict::Suppress {
                    reason: "rule".into(),
                    delete: false,
                    reply: Some("no thanks".into()),
                },
            )
            .await;

        assert!(bed.client.deleted().is_empty());
        let sent = bed.client.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message.text, "no thanks");
        assert_eq!(sent[0].message.quote, Some(message.reference()));
        assert!(bed.state.violations.read_all(GuardKind::CustomRule).is_empty());
    }
}
