//! Silently deletes messages from muted members.

use async_trait::async_trait;

use super::{Guard, GuardInput, GuardKind, Verdict};

#[derive(Default)]
pub struct MuteFilterGuard;

#[async_trait]
impl Guard for MuteFilterGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::MuteFilter
    }

    /// A mute is an explicit admin decision; the whitelist does not lift it.
    fn whitelist_exempts(&self) -> bool {
        false
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        match input.settings.active_mute(input.message.sender_id(), input.now_ms) {
            Some(entry) => Verdict::Suppress {
                reason: match entry.until {
                    Some(until) => format!("muted until {}", until),
                    None => "muted".to_string(),
                },
                delete: true,
                reply: None,
            },
            None => Verdict::Pass,
        }
    }
}
