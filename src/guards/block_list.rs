//! Ignores blacklisted members: their messages stay, but no feature
//! answers them.

use async_trait::async_trait;

use super::{Guard, GuardInput, GuardKind, Verdict};

#[derive(Default)]
pub struct BlockListGuard;

#[async_trait]
impl Guard for BlockListGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::BlockList
    }

    // Ignoring needs no admin rights.
    fn needs_bot_admin(&self) -> bool {
        false
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        if input.settings.is_blacklisted(input.message.sender_id()) {
            Verdict::ignore("blacklisted")
        } else {
            Verdict::Pass
        }
    }
}
