//! Guard identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every guard stage the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    CustomRule,
    AntiBot,
    AntiSpam,
    AntiMedia,
    AntiSticker,
    MuteFilter,
    AntiBadword,
    BlockList,
    AntiLink,
    AntiLinkKeyword,
    AntiNotText,
    AntiNude,
    AntiForward,
}

impl GuardKind {
    /// Guards that keep violation records.
    pub const STRIKING: [GuardKind; 10] = [
        GuardKind::AntiBot,
        GuardKind::AntiSpam,
        GuardKind::AntiMedia,
        GuardKind::AntiSticker,
        GuardKind::AntiBadword,
        GuardKind::AntiLink,
        GuardKind::AntiLinkKeyword,
        GuardKind::AntiNotText,
        GuardKind::AntiNude,
        GuardKind::AntiForward,
    ];

    /// Guards an admin can toggle with the `guard` command.
    pub const TOGGLEABLE: [GuardKind; 10] = Self::STRIKING;

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CustomRule => "custom_rule",
            Self::AntiBot => "anti_bot",
            Self::AntiSpam => "anti_spam",
            Self::AntiMedia => "anti_media",
            Self::AntiSticker => "anti_sticker",
            Self::MuteFilter => "mute_filter",
            Self::AntiBadword => "anti_badword",
            Self::BlockList => "block_list",
            Self::AntiLink => "anti_link",
            Self::AntiLinkKeyword => "anti_link_keyword",
            Self::AntiNotText => "anti_not_text",
            Self::AntiNude => "anti_nude",
            Self::AntiForward => "anti_forward",
        }
    }

    /// Parse the user-facing name (`antispam`, `anti_spam`, `anti-spam`).
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        let normalized = normalized.strip_prefix("anti").unwrap_or(&normalized);
        let kind = match normalized {
            "bot" => Self::AntiBot,
            "spam" => Self::AntiSpam,
            "media" => Self::AntiMedia,
            "sticker" => Self::AntiSticker,
            "badword" | "badwords" => Self::AntiBadword,
            "link" => Self::AntiLink,
            "linkkeyword" => Self::AntiLinkKeyword,
            "nottext" => Self::AntiNotText,
            "nude" => Self::AntiNude,
            "forward" => Self::AntiForward,
            _ => return None,
        };
        Some(kind)
    }

    /// Environment variable stem for policy overrides.
    pub fn env_stem(self) -> String {
        format!("GUARD_{}", self.as_str().to_uppercase())
    }
}

impl fmt::Display for GuardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!(GuardKind::parse("antispam"), Some(GuardKind::AntiSpam));
        assert_eq!(GuardKind::parse("anti-link-keyword"), Some(GuardKind::AntiLinkKeyword));
        assert_eq!(GuardKind::parse("NUDE"), Some(GuardKind::AntiNude));
        assert_eq!(GuardKind::parse("mute_filter"), None);
    }

    #[test]
    fn test_env_stem() {
        assert_eq!(GuardKind::AntiNotText.env_stem(), "GUARD_ANTI_NOT_TEXT");
    }
}
