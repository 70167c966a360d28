use async_trait::async_trait;

use super::{Guard, GuardInput, GuardKind, Verdict};
use crate::client::MessageKind;

#[derive(Default)]
pub struct AntiStickerGuard;

#[async_trait]
impl Guard for AntiStickerGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::AntiSticker
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        match input.message.kind() {
            MessageKind::Sticker => Verdict::violation("sticker"),
            _ => Verdict::Pass,
        }
    }
}
