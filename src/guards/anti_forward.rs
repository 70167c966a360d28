use async_trait::async_trait;

use super::{Guard, GuardInput, GuardKind, Verdict};

#[derive(Default)]
pub struct AntiForwardGuard;

#[async_trait]
impl Guard for AntiForwardGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::AntiForward
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        if input.message.data.forwarded {
            Verdict::violation("forwarded message")
        } else {
            Verdict::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::GroupSettings;
    use crate::test_helpers::{group_message, guard_input};

    #[tokio::test]
    async fn test_forward_flag() {
        let settings = GroupSettings::new("g1");
        let mut msg = group_message("g1", "u1", "hi");
        assert!(AntiForwardGuard.decide(&guard_input(&msg, &settings)).await.is_pass());
        msg.data.forwarded = true;
        assert!(!AntiForwardGuard.decide(&guard_input(&msg, &settings)).await.is_pass());
    }
}
