//! Catches links spelled out to dodge the URL filter ("zalo chấm me",
//! "t . me/...") and group-invite bait.

use async_trait::async_trait;

use super::{Guard, GuardInput, GuardKind, Verdict};

pub const BUILTIN_LINK_KEYWORDS: &[&str] = &[
    "chấm com",
    "cham com",
    "chấm vn",
    "cham vn",
    "chấm me",
    "dot com",
    "zalo.me/g/",
    "zalo . me",
    "t . me",
    "t.me/",
    "bit.ly",
    "link nhóm",
    "link group",
    "ib nhận link",
    "ib lấy link",
];

/// Squash whitespace runs so "chấm   com" matches "chấm com".
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// First keyword found in `text`.
pub fn find_link_keyword(text: &str, custom: &[String]) -> Option<String> {
    let normalized = normalize(text);
    BUILTIN_LINK_KEYWORDS
        .iter()
        .copied()
        .chain(custom.iter().map(String::as_str))
        .map(normalize)
        .filter(|keyword| !keyword.is_empty())
        .find(|keyword| normalized.contains(keyword.as_str()))
}

#[derive(Default)]
pub struct AntiLinkKeywordGuard;

#[async_trait]
impl Guard for AntiLinkKeywordGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::AntiLinkKeyword
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        let text = input.message.searchable_text();
        match find_link_keyword(&text, &input.settings.link_keywords) {
            Some(keyword) => Verdict::violation(format!("link keyword {:?}", keyword)),
            None => Verdict::Pass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spelled_out_links() {
        assert_eq!(find_link_keyword("vào shopabc   CHẤM  com nhé", &[]), Some("chấm com".to_string()));
        assert_eq!(find_link_keyword("ib nhận link xem phim", &[]), Some("ib nhận link".to_string()));
        assert_eq!(find_link_keyword("chào cả nhà", &[]), None);
    }

    #[test]
    fn test_custom_keywords() {
        let custom = vec!["Sàn Coin".to_string()];
        assert_eq!(find_link_keyword("tham gia sàn  coin ngay", &custom), Some("sàn coin".to_string()));
    }
}
