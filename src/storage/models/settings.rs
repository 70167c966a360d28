//! Per-group moderation settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::guards::GuardKind;

/// A user in one of the per-group lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ListEntry {
    #[serde(default)]
    pub name: String,
}

impl ListEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A muted user. `until` is a unix timestamp in milliseconds; `None` mutes
/// until an admin unmutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MuteEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub until: Option<i64>,
}

impl MuteEntry {
    pub fn is_active(&self, now_ms: i64) -> bool {
        self.until.is_none_or(|until| until > now_ms)
    }
}

/// Deployment-specific rule evaluated first in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRule {
    /// Regex matched against the message text (case-insensitive).
    pub pattern: String,
    /// Optional reply sent when the rule fires.
    #[serde(default)]
    pub reply: Option<String>,
    /// Delete the message when the rule fires.
    #[serde(default)]
    pub delete: bool,
}

/// Settings record of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupSettings {
    pub thread_id: String,

    pub filter_bot: bool,
    pub anti_spam: bool,
    pub anti_media: bool,
    pub anti_sticker: bool,
    pub anti_nude: bool,
    pub anti_link: bool,
    pub anti_link_keyword: bool,
    pub anti_not_text: bool,
    pub anti_forward: bool,
    pub filter_bad_words: bool,

    pub white_list: BTreeMap<String, ListEntry>,
    pub black_list: BTreeMap<String, ListEntry>,
    pub admin_list: BTreeMap<String, ListEntry>,
    pub mute_list: BTreeMap<String, MuteEntry>,

    /// Additions to the built-in bad-word list.
    pub bad_words: Vec<String>,
    /// Additions to the built-in link keywords.
    pub link_keywords: Vec<String>,
    pub custom_rules: Vec<CustomRule>,

    /// Locale for warnings (`vi` or `en`).
    pub language: Option<String>,
}

impl GroupSettings {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            ..Default::default()
        }
    }

    /// Whether a guard is switched on for this group.
    ///
    /// Custom rules, mute and block lists are data-driven and always on.
    pub fn is_enabled(&self, kind: GuardKind) -> bool {
        match kind {
            GuardKind::AntiBot => self.filter_bot,
            GuardKind::AntiSpam => self.anti_spam,
            GuardKind::AntiMedia => self.anti_media,
            GuardKind::AntiSticker => self.anti_sticker,
            GuardKind::AntiBadword => self.filter_bad_words,
            GuardKind::AntiLink => self.anti_link,
            GuardKind::AntiLinkKeyword => self.anti_link_keyword,
            GuardKind::AntiNotText => self.anti_not_text,
            GuardKind::AntiNude => self.anti_nude,
            GuardKind::AntiForward => self.anti_forward,
            GuardKind::CustomRule => !self.custom_rules.is_empty(),
            GuardKind::MuteFilter => !self.mute_list.is_empty(),
            GuardKind::BlockList => !self.black_list.is_empty(),
        }
    }

    /// Toggle a guard. Returns `false` for guards without a toggle.
    pub fn set_enabled(&mut self, kind: GuardKind, on: bool) -> bool {
        let flag = match kind {
            GuardKind::AntiBot => &mut self.filter_bot,
            GuardKind::AntiSpam => &mut self.anti_spam,
            GuardKind::AntiMedia => &mut self.anti_media,
            GuardKind::AntiSticker => &mut self.anti_sticker,
            GuardKind::AntiBadword => &mut self.filter_bad_words,
            GuardKind::AntiLink => &mut self.anti_link,
            GuardKind::AntiLinkKeyword => &mut self.anti_link_keyword,
            GuardKind::AntiNotText => &mut self.anti_not_text,
            GuardKind::AntiNude => &mut self.anti_nude,
            GuardKind::AntiForward => &mut self.anti_forward,
            GuardKind::CustomRule | GuardKind::MuteFilter | GuardKind::BlockList => return false,
        };
        *flag = on;
        true
    }

    pub fn is_whitelisted(&self, user_id: &str) -> bool {
        self.white_list.contains_key(user_id)
    }

    pub fn is_blacklisted(&self, user_id: &str) -> bool {
        self.black_list.contains_key(user_id)
    }

    pub fn is_box_admin(&self, user_id: &str) -> bool {
        self.admin_list.contains_key(user_id)
    }

    /// Active mute for a user, if any.
    pub fn active_mute(&self, user_id: &str, now_ms: i64) -> Option<&MuteEntry> {
        self.mute_list.get(user_id).filter(|m| m.is_active(now_ms))
    }

    /// Drop expired mutes. Returns how many were removed.
    pub fn prune_mutes(&mut self, now_ms: i64) -> usize {
        let before = self.mute_list.len();
        self.mute_list.retain(|_, m| m.is_active(now_ms));
        before - self.mute_list.len()
    }

    pub fn locale(&self) -> &str {
        self.language.as_deref().unwrap_or(crate::i18n::DEFAULT_LOCALE)
    }
}
