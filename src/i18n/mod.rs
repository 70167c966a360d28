//! User-facing strings.
//!
//! Translations are embedded at compile time and looked up by dotted key,
//! e.g. `"warn.anti_spam"`. Missing keys fall back to the default locale,
//! then to the key itself.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;

/// Locale used when a group has not chosen one.
pub const DEFAULT_LOCALE: &str = "vi";

static TRANSLATIONS: Lazy<HashMap<&'static str, Value>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (lang, raw) in [("vi", include_str!("vi.json")), ("en", include_str!("en.json"))] {
        match serde_json::from_str(raw) {
            Ok(value) => {
                map.insert(lang, value);
            }
            Err(e) => tracing::error!("Invalid {} translations: {}", lang, e),
        }
    }
    map
});

/// Whether a locale has translations.
pub fn is_supported(lang: &str) -> bool {
    TRANSLATIONS.contains_key(lang)
}

/// Text for a key in a specific language.
pub fn get_text(lang: &str, key: &str) -> String {
    if let Some(text) = TRANSLATIONS.get(lang).and_then(|v| resolve_key(v, key)) {
        return text;
    }
    if lang != DEFAULT_LOCALE
        && let Some(text) = TRANSLATIONS.get(DEFAULT_LOCALE).and_then(|v| resolve_key(v, key))
    {
        return text;
    }
    key.to_string()
}

/// Text for a key with `{name}` placeholders filled in.
pub fn format_text(lang: &str, key: &str, args: &[(&str, &str)]) -> String {
    args.iter()
        .fold(get_text(lang, key), |text, (name, value)| {
            text.replace(&format!("{{{}}}", name), value)
        })
}

fn resolve_key(val: &Value, key: &str) -> Option<String> {
    let mut current = val;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    current.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_locales_load() {
        assert!(is_supported("vi"));
        assert!(is_supported("en"));
        assert!(!is_supported("fr"));
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(get_text("en", "no.such.key"), "no.such.key");
        assert_eq!(get_text("fr", "command.denied"), get_text(DEFAULT_LOCALE, "command.denied"));
    }

    #[test]
    fn test_placeholders() {
        let text = format_text("en", "warn.strike", &[("name", "@Lan"), ("count", "1"), ("threshold", "3")]);
        assert!(text.contains("@Lan"));
        assert!(text.contains("1/3"));
        assert!(!text.contains('{'));
    }

    #[test]
    fn test_every_guard_has_a_reason_in_both_locales() {
        use crate::guards::GuardKind;
        for kind in GuardKind::STRIKING {
            let key = format!("reason.{}", kind.as_str());
            for lang in ["vi", "en"] {
                assert_ne!(get_text(lang, &key), key, "{} missing in {}", key, lang);
            }
        }
    }
}
