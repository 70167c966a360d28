use async_trait::async_trait;

use super::{Guard, GuardInput, GuardKind, Verdict};
use crate::client::MessageKind;

/// Text-only groups: anything that is not plain text is a violation.
#[derive(Default)]
pub struct AntiNotTextGuard;

#[async_trait]
impl Guard for AntiNotTextGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::AntiNotText
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        match input.message.kind() {
            MessageKind::Text => Verdict::Pass,
            other => Verdict::violation(format!("{:?} in a text-only group", other)),
        }
    }
}
