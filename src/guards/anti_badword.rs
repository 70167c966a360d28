//! Profanity filter.
//!
//! Single words match whole tokens only, so "dm" does not fire inside
//! "admin". Phrases with spaces match as substrings.

use async_trait::async_trait;

use super::{Guard, GuardInput, GuardKind, Verdict};

/// Always-on list; groups add their own with the `badword` command.
pub const BUILTIN_BAD_WORDS: &[&str] = &[
    "đm", "dm", "đmm", "dmm", "đcm", "dcm", "clm", "vcl", "vkl", "vl", "đụ", "địt", "lồn", "cặc",
    "buồi", "đĩ", "đéo", "óc chó", "con chó", "fuck", "shit", "bitch",
];

#[derive(Default)]
pub struct AntiBadwordGuard;

/// First bad word found in `text`, if any.
pub fn find_bad_word(text: &str, custom: &[String]) -> Option<String> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    BUILTIN_BAD_WORDS
        .iter()
        .copied()
        .chain(custom.iter().map(String::as_str))
        .map(|word| word.trim().to_lowercase())
        .filter(|word| !word.is_empty())
        .find(|word| {
            if word.contains(char::is_whitespace) {
                lowered.contains(word.as_str())
            } else {
                tokens.contains(&word.as_str())
            }
        })
}

#[async_trait]
impl Guard for AntiBadwordGuard {
    fn kind(&self) -> GuardKind {
        GuardKind::AntiBadword
    }

    async fn decide(&self, input: &GuardInput<'_>) -> Verdict {
        let Some(text) = input.message.text() else {
            return Verdict::Pass;
        };
        match find_bad_word(text, &input.settings.bad_words) {
            Some(word) => Verdict::violation(format!("bad word {:?}", word)),
            None => Verdict::Pass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_tokens_only() {
        assert_eq!(find_bad_word("ĐM thằng này", &[]), Some("đm".to_string()));
        assert_eq!(find_bad_word("admin ơi", &[]), None);
        assert_eq!(find_bad_word("vl!!!", &[]), Some("vl".to_string()));
    }

    #[test]
    fn test_phrases_and_custom_words() {
        assert_eq!(find_bad_word("đồ Óc Chó", &[]), Some("óc chó".to_string()));
        let custom = vec!["  Ngu  ".to_string(), String::new()];
        assert_eq!(find_bad_word("mày ngu quá", &custom), Some("ngu".to_string()));
        assert_eq!(find_bad_word("nguyễn", &custom), None);
    }
}
