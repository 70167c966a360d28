//! Deletes messages carrying URLs.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{Guard, GuardInput, GuardKind, Verdict};
use crate::client::MessageKind;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:https?://|www\.)\S+|\b[a-z0-9][a-z0-9-]*(?:\.[a-z0-9-]+)*\.(?:com|net|org|vn|me|io|co|info|xyz|site|online|link|ly|gg|tk)(?:/\S*)?\b",
    )
    .expect("static URL regex")
});

/// First URL-looking span in `text`.
pub fn find_link(text: &str) -> Option<&str> {
    URL_RE.find(text).map(|m| m.as_str())
}

#[derive(Default)]
pub struct AntiLinkGuard;

#[async_trait]
impl Guard for AntiLinkGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::AntiLink
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        let message = input.message;
        if message.kind() == MessageKind::Link {
            return Verdict::violation("link card");
        }
        match find_link(&message.searchable_text()) {
            Some(link) => Verdict::violation(format!("link {}", link)),
            None => Verdict::Pass,
        }
    }
}
