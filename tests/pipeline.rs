//! End-to-end runs of the message pipeline against fakes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::future::join_all;
use pretty_assertions::assert_eq;

use warden::client::{Mention, Message, MessageContent};
use warden::guards::GuardKind;
use warden::i18n::format_text;
use warden::pipeline::{ChatFeature, CommandHandler, Pipeline};
use warden::storage::{GroupSettings, ListEntry, MemoryStore};
use warden::test_helpers::{
    FailingClassifier, FakeClient, FixedClassifier, TestBed, direct_message, group_message, media_message,
};
use warden::utils::now_ms;

#[derive(Default)]
struct CountingCommands {
    calls: AtomicUsize,
}

#[async_trait]
impl CommandHandler for CountingCommands {
    async fn handle_command(
        &self,
        message: &Message,
        _settings: Option<&GroupSettings>,
        _handle_chat: bool,
    ) -> anyhow::Result<bool> {
        let is_command = message.text().is_some_and(|t| t.starts_with('!'));
        if is_command {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
        Ok(is_command)
    }
}

#[derive(Default)]
struct CountingFeature {
    calls: AtomicUsize,
}

#[async_trait]
impl ChatFeature for CountingFeature {
    fn name(&self) -> &str {
        "counting"
    }

    async fn handle(&self, _message: &Message, _settings: Option<&GroupSettings>) -> anyhow::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }
}

fn settings(configure: impl FnOnce(&mut GroupSettings)) -> GroupSettings {
    let mut settings = GroupSettings::new("g1");
    configure(&mut settings);
    settings
}

async fn bed_with(settings: GroupSettings) -> TestBed {
    TestBed::new(
        FakeClient::new().with_group("g1", &["bot", "mod"]),
        MemoryStore::new().with_group(settings),
    )
    .await
}

fn bot_message(sender: &str, text: &str) -> Message {
    let mut message = group_message("g1", sender, text);
    message.data.msg_type = "chat.webcontent".into();
    message
}

#[tokio::test]
async fn test_three_bot_messages_escalate_once() {
    let bed = bed_with(settings(|s| s.filter_bot = true)).await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();

    for (i, text) in ["one", "two", "three"].iter().enumerate() {
        let outcome = pipeline.handle_message(&bot_message("u1", text)).await.unwrap();
        assert_eq!(outcome.suppressed_by, Some(GuardKind::AntiBot));
        if i < 2 {
            let record = bed.state.violations.get(GuardKind::AntiBot, "g1", "u1").unwrap();
            assert_eq!(record.count, i as u32 + 1);
        }
    }

    assert_eq!(bed.client.deleted().len(), 3);
    assert_eq!(bed.client.blocked(), vec![("g1".to_string(), "u1".to_string())]);
    assert_eq!(bed.renderer.rendered().len(), 1);
    assert_eq!(bed.renderer.cleared().len(), 1);
    assert!(bed.state.violations.get(GuardKind::AntiBot, "g1", "u1").is_none());
}

#[tokio::test]
async fn test_identical_bot_messages_still_escalate() {
    let bed = bed_with(settings(|s| s.filter_bot = true)).await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();

    for _ in 0..3 {
        let outcome = pipeline.handle_message(&bot_message("u1", "buy now")).await.unwrap();
        assert_eq!(outcome.suppressed_by, Some(GuardKind::AntiBot));
    }

    assert_eq!(bed.client.deleted().len(), 3);
    assert_eq!(bed.client.blocked(), vec![("g1".to_string(), "u1".to_string())]);
    assert!(bed.state.violations.get(GuardKind::AntiBot, "g1", "u1").is_none());
}

#[tokio::test]
async fn test_exempt_senders_cause_no_side_effects() {
    let bed = bed_with(settings(|s| {
        s.filter_bot = true;
        s.white_list.insert("friend".into(), ListEntry::named("Friend"));
        s.admin_list.insert("boxmod".into(), ListEntry::named("Box mod"));
    }))
    .await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();

    for sender in ["mod", "friend", "boxmod", "owner"] {
        let outcome = pipeline.handle_message(&bot_message(sender, "auto")).await.unwrap();
        assert!(outcome.triggered.is_empty(), "{} was moderated", sender);
    }

    assert!(bed.client.deleted().is_empty());
    assert!(bed.client.sent().is_empty());
}

#[tokio::test]
async fn test_guards_moot_when_bot_is_not_admin() {
    let bed = TestBed::new(
        FakeClient::new().with_group("g1", &["mod"]),
        MemoryStore::new().with_group(settings(|s| s.filter_bot = true)),
    )
    .await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();

    let outcome = pipeline.handle_message(&bot_message("u1", "auto")).await.unwrap();

    assert!(outcome.triggered.is_empty());
    assert!(bed.client.deleted().is_empty());
}

#[tokio::test]
async fn test_disabled_guards_do_no_io() {
    let bed = bed_with(GroupSettings::new("g1")).await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();

    let outcome = pipeline
        .handle_message(&group_message("g1", "u1", "xem https://spam.example ngay"))
        .await
        .unwrap();

    assert!(outcome.triggered.is_empty());
    assert!(outcome.handle_chat);
    assert_eq!(bed.client.group_info_calls(), 0);
    assert!(bed.client.sent().is_empty());
    assert!(bed.client.deleted().is_empty());
}

#[tokio::test]
async fn test_spam_suppression_skips_commands() {
    let bed = bed_with(settings(|s| s.anti_spam = true)).await;
    let commands = Arc::new(CountingCommands::default());
    let pipeline = Pipeline::builder(bed.state.clone())
        .command_handler(commands.clone())
        .build();
    let limit = bed.state.config.spam.max_messages;

    for i in 0..limit {
        let outcome = pipeline
            .handle_message(&group_message("g1", "u1", &format!("!ping {}", i)))
            .await
            .unwrap();
        assert!(outcome.command_handled);
    }
    let outcome = pipeline
        .handle_message(&group_message("g1", "u1", "!ping again"))
        .await
        .unwrap();

    assert_eq!(outcome.suppressed_by, Some(GuardKind::AntiSpam));
    assert!(!outcome.command_handled);
    assert_eq!(commands.calls.load(Ordering::SeqCst), limit);
}

#[tokio::test]
async fn test_blacklisted_sender_skips_features_but_not_commands() {
    let bed = bed_with(settings(|s| {
        s.black_list.insert("pest".into(), ListEntry::named("Pest"));
    }))
    .await;
    let commands = Arc::new(CountingCommands::default());
    let feature = Arc::new(CountingFeature::default());
    let pipeline = Pipeline::builder(bed.state.clone())
        .command_handler(commands.clone())
        .feature(feature.clone())
        .build();

    let chat = pipeline.handle_message(&group_message("g1", "pest", "hello")).await.unwrap();
    let command = pipeline.handle_message(&group_message("g1", "pest", "!help")).await.unwrap();

    assert!(!chat.handle_chat);
    assert_eq!(chat.suppressed_by, None);
    assert_eq!(feature.calls.load(Ordering::SeqCst), 0);
    assert!(command.command_handled);
    assert_eq!(commands.calls.load(Ordering::SeqCst), 1);
    assert!(bed.client.deleted().is_empty());

    pipeline.handle_message(&group_message("g1", "u1", "hello")).await.unwrap();
    assert_eq!(feature.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_wave_guards_act_independently() {
    let bed = TestBed::with_classifier(
        FakeClient::new().with_group("g1", &["bot"]),
        MemoryStore::new().with_group(settings(|s| {
            s.anti_link = true;
            s.anti_nude = true;
        })),
        Arc::new(FixedClassifier(90.0)),
    )
    .await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();

    let outcome = pipeline.handle_message(&photo_with_link()).await.unwrap();

    assert_eq!(outcome.triggered, vec![GuardKind::AntiLink, GuardKind::AntiNude]);
    assert_eq!(bed.client.deleted().len(), 2);
    assert_eq!(bed.client.sent_texts("g1").len(), 2);
    assert!(bed.state.violations.get(GuardKind::AntiLink, "g1", "u1").is_some());
    assert!(bed.state.violations.get(GuardKind::AntiNude, "g1", "u1").is_some());
}

fn photo_with_link() -> Message {
    let mut photo = media_message("g1", "u1", "chat.photo");
    if let MessageContent::Attachment(a) = &mut photo.data.content {
        a.description = "more at https://spam.example".into();
    }
    photo
}

#[tokio::test]
async fn test_classifier_outage_does_not_stop_link_guard() {
    let bed = TestBed::with_classifier(
        FakeClient::new().with_group("g1", &["bot"]),
        MemoryStore::new().with_group(settings(|s| {
            s.anti_link = true;
            s.anti_nude = true;
        })),
        Arc::new(FailingClassifier),
    )
    .await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();

    let outcome = pipeline.handle_message(&photo_with_link()).await.unwrap();

    assert_eq!(outcome.triggered, vec![GuardKind::AntiLink]);
    assert_eq!(outcome.suppressed_by, Some(GuardKind::AntiLink));
    assert_eq!(bed.client.deleted().len(), 1);
    assert_eq!(bed.client.sent_texts("g1").len(), 1);
    let record = bed.state.violations.get(GuardKind::AntiLink, "g1", "u1").unwrap();
    assert_eq!(record.count, 1);
    assert!(bed.state.violations.get(GuardKind::AntiNude, "g1", "u1").is_none());
}

#[tokio::test]
async fn test_failed_deletes_do_not_stop_second_wave_strikes() {
    let bed = TestBed::with_classifier(
        FakeClient::new().with_group("g1", &["bot"]),
        MemoryStore::new().with_group(settings(|s| {
            s.anti_link = true;
            s.anti_nude = true;
        })),
        Arc::new(FixedClassifier(90.0)),
    )
    .await;
    bed.client.fail_deletes(true);
    let pipeline = Pipeline::builder(bed.state.clone()).build();

    let outcome = pipeline.handle_message(&photo_with_link()).await.unwrap();

    assert_eq!(outcome.triggered, vec![GuardKind::AntiLink, GuardKind::AntiNude]);
    assert!(bed.client.deleted().is_empty());
    assert_eq!(bed.client.sent_texts("g1").len(), 2);
    assert!(bed.state.violations.get(GuardKind::AntiLink, "g1", "u1").is_some());
    assert!(bed.state.violations.get(GuardKind::AntiNude, "g1", "u1").is_some());
}

#[tokio::test]
async fn test_whitelisted_sender_gets_relaxed_nude_threshold() {
    let bed = TestBed::with_classifier(
        FakeClient::new().with_group("g1", &["bot"]),
        MemoryStore::new().with_group(settings(|s| {
            s.anti_nude = true;
            s.white_list.insert("friend".into(), ListEntry::named("Friend"));
        })),
        Arc::new(FixedClassifier(55.0)),
    )
    .await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();

    let friend = pipeline
        .handle_message(&media_message("g1", "friend", "chat.photo"))
        .await
        .unwrap();
    let stranger = pipeline
        .handle_message(&media_message("g1", "u1", "chat.photo"))
        .await
        .unwrap();

    assert!(friend.triggered.is_empty());
    assert_eq!(stranger.triggered, vec![GuardKind::AntiNude]);
    assert_eq!(bed.client.deleted().len(), 1);
}

#[tokio::test]
async fn test_upload_burst_enables_prophylactic_mode() {
    let bed = bed_with(GroupSettings::new("g1")).await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();
    let burst = bed.state.config.prophylactic.burst_uploads;

    for _ in 0..burst {
        let outcome = pipeline
            .handle_message(&media_message("g1", "u1", "chat.photo"))
            .await
            .unwrap();
        assert!(outcome.triggered.is_empty());
    }
    let outcome = pipeline
        .handle_message(&media_message("g1", "u1", "chat.photo"))
        .await
        .unwrap();

    assert!(bed.state.prophylactic.is_active());
    assert_eq!(outcome.suppressed_by, Some(GuardKind::AntiMedia));
    assert_eq!(bed.client.sent_texts("g1").len(), 2);
}

#[tokio::test]
async fn test_concurrent_list_commands_lose_no_updates() {
    let bed = bed_with(GroupSettings::new("g1")).await;
    let pipeline = Arc::new(Pipeline::builder(bed.state.clone()).build());

    let runs = (0..20).map(|i| {
        let pipeline = pipeline.clone();
        async move {
            let mut message = group_message("g1", "mod", &format!("!whitelist add @user{}", i));
            message.data.mentions = vec![Mention {
                uid: format!("10000{}", i),
                pos: 15,
                len: format!("@user{}", i).chars().count(),
            }];
            pipeline.handle_message(&message).await.unwrap()
        }
    });
    let outcomes = join_all(runs).await;

    assert!(outcomes.iter().all(|o| o.command_handled));
    let stored = bed.state.settings.load("g1").await.unwrap();
    assert_eq!(stored.white_list.len(), 20);
}

#[tokio::test]
async fn test_guard_command_toggles_setting() {
    let bed = bed_with(GroupSettings::new("g1")).await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();

    let outcome = pipeline
        .handle_message(&group_message("g1", "mod", "!guard link on"))
        .await
        .unwrap();

    assert!(outcome.command_handled);
    assert!(bed.state.settings.load("g1").await.unwrap().anti_link);

    let link = pipeline
        .handle_message(&group_message("g1", "u1", "https://spam.example"))
        .await
        .unwrap();
    assert_eq!(link.triggered, vec![GuardKind::AntiLink]);
}

fn mute_command(text: &str) -> Message {
    let mut message = group_message("g1", "mod", text);
    message.data.mentions = vec![Mention {
        uid: "100001".into(),
        pos: 6,
        len: 4,
    }];
    message
}

#[tokio::test]
async fn test_mute_with_overflowing_duration_is_rejected() {
    let bed = bed_with(GroupSettings::new("g1")).await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();

    let outcome = pipeline
        .handle_message(&mute_command("!mute @Lan 15250284452w"))
        .await
        .unwrap();

    assert!(outcome.command_handled);
    assert!(bed.state.settings.load("g1").await.unwrap().mute_list.is_empty());
    assert_eq!(
        bed.client.sent_texts("g1"),
        vec![format_text("vi", "command.usage.mute", &[("prefix", "!")])]
    );
}

#[tokio::test]
async fn test_timed_mute_is_stored_with_future_expiry() {
    let bed = bed_with(GroupSettings::new("g1")).await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();
    let before = now_ms();

    pipeline.handle_message(&mute_command("!mute @Lan 30m")).await.unwrap();

    let stored = bed.state.settings.load("g1").await.unwrap();
    let until = stored.mute_list["100001"].until.unwrap();
    assert!(until >= before + 30 * 60_000);
}

#[tokio::test]
async fn test_direct_message_intro_once_per_cooldown() {
    let bed = bed_with(GroupSettings::new("g1")).await;
    let pipeline = Pipeline::builder(bed.state.clone()).build();

    pipeline.handle_message(&direct_message("u1", "hi")).await.unwrap();
    pipeline.handle_message(&direct_message("u1", "hello?")).await.unwrap();

    assert_eq!(bed.client.sent_texts("u1").len(), 1);
}
