//! Group-specific regex rules, checked before every other guard.

use async_trait::async_trait;
use dashmap::DashMap;
use regex::{Regex, RegexBuilder};
use tracing::warn;

use super::{Guard, GuardInput, GuardKind, Verdict};

/// Compiled patterns are cached by source; invalid ones are remembered as
/// `None` so they are reported once.
#[derive(Default)]
pub struct CustomRuleGuard {
    compiled: DashMap<String, Option<Regex>>,
}

impl CustomRuleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(&self, pattern: &str, text: &str) -> bool {
        if let Some(cached) = self.compiled.get(pattern) {
            return cached.as_ref().is_some_and(|re| re.is_match(text));
        }
        let compiled = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Ignoring invalid custom rule {:?}: {}", pattern, e);
                None
            }
        };
        let hit = compiled.as_ref().is_some_and(|re| re.is_match(text));
        self.compiled.insert(pattern.to_string(), compiled);
        hit
    }
}

#[async_trait]
impl Guard for CustomRuleGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::CustomRule
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        let text = input.message.searchable_text();
        input
            .settings
            .custom_rules
            .iter()
            .find(|rule| self.matches(&rule.pattern, &text))
            .map(|rule| Verdict::Suppress {
                reason: format!("custom rule {:?}", rule.pattern),
                delete: rule.delete,
                reply: rule.reply.clone(),
            })
            .unwrap_or(Verdict::Pass)
    }
}
