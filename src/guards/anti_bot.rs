//! Flags messages that only automation clients produce.
//!
//! Regular mobile and desktop clients cannot send self-destructing messages
//! into groups or post rich web-content cards, so either signal marks the
//! sender as a bot.

use async_trait::async_trait;

use super::{Guard, GuardInput, GuardKind, Verdict};

const BOT_MSG_TYPES: [&str; 2] = ["chat.webcontent", "chat.ecard"];

#[derive(Default)]
pub struct AntiBotGuard;

#[async_trait]
impl Guard for AntiBotGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::AntiBot
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        let data = &input.message.data;
        if data.ttl > 0 {
            return Verdict::violation(format!("self-destructing message (ttl {})", data.ttl));
        }
        if BOT_MSG_TYPES.contains(&data.msg_type.as_str()) {
            return Verdict::violation(format!("automation message type {}", data.msg_type));
        }
        Verdict::Pass
    }
}
