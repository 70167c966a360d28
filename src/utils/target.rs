//! Target resolution for moderation commands.
//!
//! Resolution order:
//! 1. Mentions in the command message
//! 2. Author of the quoted message
//! 3. Bare user-id arguments

use crate::client::Message;

/// A member a command acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub user_id: String,
    pub name: String,
}

/// Zalo user ids are long numeric strings; shorter numbers are arguments
/// such as durations.
const MIN_ID_DIGITS: usize = 6;

fn mention_name(text: &str, pos: usize, len: usize) -> String {
    let name: String = text.chars().skip(pos).take(len).collect();
    name.trim_start_matches('@').trim().to_string()
}

/// Users a command targets.
pub fn command_targets(message: &Message, args: &[&str]) -> Vec<Target> {
    let text = message.text().unwrap_or_default();

    let mut targets: Vec<Target> = Vec::new();
    for mention in &message.data.mentions {
        if targets.iter().any(|t| t.user_id == mention.uid) {
            continue;
        }
        targets.push(Target {
            user_id: mention.uid.clone(),
            name: mention_name(text, mention.pos, mention.len),
        });
    }
    if !targets.is_empty() {
        return targets;
    }

    if let Some(quote) = message.data.quote.as_ref().filter(|q| !q.owner_id.is_empty()) {
        return vec![Target {
            user_id: quote.owner_id.clone(),
            name: quote.owner_id.clone(),
        }];
    }

    args.iter()
        .filter(|arg| arg.len() >= MIN_ID_DIGITS && arg.chars().all(|c| c.is_ascii_digit()))
        .map(|id| Target {
            user_id: id.to_string(),
            name: id.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Mention, Quote};
    use crate::test_helpers::group_message;

    #[test]
    fn test_mentions_win() {
        let mut msg = group_message("g1", "admin", "!mute @Lê Lan 30");
        msg.data.mentions = vec![
            Mention { uid: "u1".into(), pos: 6, len: 7 },
            Mention { uid: "u1".into(), pos: 6, len: 7 },
        ];
        assert_eq!(
            command_targets(&msg, &["@Lê", "Lan", "30"]),
            vec![Target { user_id: "u1".into(), name: "Lê Lan".into() }]
        );
    }

    #[test]
    fn test_quote_then_ids() {
        let mut msg = group_message("g1", "admin", "!mute 30");
        msg.data.quote = Some(Quote { owner_id: "u7".into(), ..Default::default() });
        assert_eq!(command_targets(&msg, &["30"])[0].user_id, "u7");

        let msg = group_message("g1", "admin", "!blacklist add 1234567 30");
        let targets = command_targets(&msg, &["add", "1234567", "30"]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].user_id, "1234567");
    }
}
