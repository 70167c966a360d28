//! Built-in moderation commands.
//!
//! - `guard` lists guard states, `guard <name> on|off` toggles one
//! - `whitelist` / `blacklist` / `boxadmin` `add|remove` manage the lists
//! - `mute [duration]` / `unmute` manage the mute list
//! - `badword add|remove <word>` edits the group's banned words
//! - `violations` shows a member's current strikes
//! - `lang vi|en` picks the group's language
//!
//! Only admins may run them. Anything else falls through to the external
//! command handler.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::bot::AppState;
use crate::client::{Message, OutgoingMessage, ThreadType};
use crate::guards::GuardKind;
use crate::i18n::{self, format_text, get_text};
use crate::storage::{GroupSettings, ListEntry, MuteEntry, StoreError};
use crate::utils::{Target, command_targets, now_ms, parse_duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Guard,
    List(ListKind),
    Mute,
    Unmute,
    BadWord,
    Violations,
    Lang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    White,
    Black,
    BoxAdmin,
}

impl ListKind {
    fn name(self) -> &'static str {
        match self {
            Self::White => "whitelist",
            Self::Black => "blacklist",
            Self::BoxAdmin => "boxadmin",
        }
    }

    fn list_mut(self, settings: &mut GroupSettings) -> &mut BTreeMap<String, ListEntry> {
        match self {
            Self::White => &mut settings.white_list,
            Self::Black => &mut settings.black_list,
            Self::BoxAdmin => &mut settings.admin_list,
        }
    }
}

impl Command {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "guard" => Self::Guard,
            "whitelist" | "wl" => Self::List(ListKind::White),
            "blacklist" | "bl" => Self::List(ListKind::Black),
            "boxadmin" => Self::List(ListKind::BoxAdmin),
            "mute" => Self::Mute,
            "unmute" => Self::Unmute,
            "badword" => Self::BadWord,
            "violations" | "warns" => Self::Violations,
            "lang" => Self::Lang,
            _ => return None,
        })
    }
}

/// Split `text` into a lowercase command name and its arguments.
fn split_command<'a>(text: &'a str, prefix: &str) -> Option<(String, Vec<&'a str>)> {
    let body = text.trim().strip_prefix(prefix)?;
    let mut parts = body.split_whitespace();
    let name = parts.next()?.to_lowercase();
    Some((name, parts.collect()))
}

fn names(targets: &[Target]) -> String {
    targets
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct ModerationCommands {
    state: Arc<AppState>,
}

impl ModerationCommands {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Run a built-in command. Returns `true` when the message was one.
    pub async fn try_handle(&self, message: &Message, settings: &GroupSettings) -> bool {
        if !message.is_group() {
            return false;
        }
        let Some(text) = message.text() else {
            return false;
        };
        let Some((name, args)) = split_command(text, &self.state.config.command_prefix) else {
            return false;
        };
        let Some(command) = Command::parse(&name) else {
            return false;
        };

        let thread_id = message.thread_id.as_str();
        let sender = message.sender_id();
        let lang = settings.locale();
        if !self.state.permissions.is_admin(thread_id, sender, settings).await {
            let now = now_ms();
            if !self.state.cooldowns.reply_cooling(thread_id, sender, now) {
                self.state.cooldowns.mark_replied(thread_id, sender, now);
                self.reply(message, get_text(lang, "command.denied")).await;
            }
            return true;
        }

        info!("{} ran {} in {}", sender, name, thread_id);
        let reply = match command {
            Command::Guard => self.guard(thread_id, settings, &args).await,
            Command::List(kind) => self.list(message, settings, kind, &args).await,
            Command::Mute => self.mute(message, settings, &args).await,
            Command::Unmute => self.unmute(message, settings, &args).await,
            Command::BadWord => self.bad_word(thread_id, settings, &args).await,
            Command::Violations => self.violations(message, settings, &args),
            Command::Lang => self.lang(thread_id, settings, &args).await,
        };
        self.reply(message, reply).await;
        true
    }

    async fn reply(&self, message: &Message, text: String) {
        let outgoing = OutgoingMessage::text(text).quoting(message.reference());
        if let Err(e) = self
            .state
            .client
            .send_message(outgoing, &message.thread_id, ThreadType::Group)
            .await
        {
            warn!("Failed to answer command in {}: {}", message.thread_id, e);
        }
    }

    fn write_failed(&self, lang: &str, thread_id: &str, e: StoreError) -> String {
        warn!("Failed to save settings for {}: {}", thread_id, e);
        get_text(lang, "command.failed")
    }

    async fn guard(&self, thread_id: &str, settings: &GroupSettings, args: &[&str]) -> String {
        let lang = settings.locale();
        let prefix = self.state.config.command_prefix.as_str();
        match args {
            [] => {
                let lines = GuardKind::TOGGLEABLE
                    .iter()
                    .map(|kind| {
                        let mark = if settings.is_enabled(*kind) { "✅" } else { "⬜" };
                        format!("{} {}", mark, kind)
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                format_text(lang, "command.guard.list", &[("lines", &lines)])
            }
            [name, switch] => {
                let Some(kind) = GuardKind::parse(name).filter(|k| GuardKind::TOGGLEABLE.contains(k)) else {
                    return format_text(lang, "command.guard.unknown", &[("guard", name)]);
                };
                let on = match switch.to_lowercase().as_str() {
                    "on" | "bật" | "bat" => true,
                    "off" | "tắt" | "tat" => false,
                    _ => return format_text(lang, "command.usage.guard", &[("prefix", prefix)]),
                };
                let result = self
                    .state
                    .settings
                    .update(thread_id, |s| {
                        let changed = s.is_enabled(kind) != on;
                        s.set_enabled(kind, on);
                        (changed, changed)
                    })
                    .await;
                let key = match result {
                    Ok(false) => "command.guard.unchanged",
                    Ok(true) if on => "command.guard.enabled",
                    Ok(true) => "command.guard.disabled",
                    Err(e) => return self.write_failed(lang, thread_id, e),
                };
                format_text(lang, key, &[("guard", kind.as_str())])
            }
            _ => format_text(lang, "command.usage.guard", &[("prefix", prefix)]),
        }
    }

    async fn list(&self, message: &Message, settings: &GroupSettings, kind: ListKind, args: &[&str]) -> String {
        let lang = settings.locale();
        let usage = || {
            format_text(
                lang,
                "command.usage.list",
                &[("prefix", &self.state.config.command_prefix), ("command", kind.name())],
            )
        };
        let (add, rest) = match args.split_first() {
            Some((action, rest)) if action.eq_ignore_ascii_case("add") => (true, rest),
            Some((action, rest)) if action.eq_ignore_ascii_case("remove") => (false, rest),
            _ => return usage(),
        };
        let targets = command_targets(message, rest);
        if targets.is_empty() {
            return get_text(lang, "command.no_targets");
        }

        let result = self
            .state
            .settings
            .update(&message.thread_id, |s| {
                let list = kind.list_mut(s);
                let count = targets
                    .iter()
                    .filter(|t| {
                        if add {
                            list.insert(t.user_id.clone(), ListEntry::named(t.name.clone())).is_none()
                        } else {
                            list.remove(&t.user_id).is_some()
                        }
                    })
                    .count();
                (count > 0, count)
            })
            .await;
        match result {
            Ok(count) => format_text(
                lang,
                if add { "command.list.added" } else { "command.list.removed" },
                &[("count", &count.to_string()), ("list", kind.name())],
            ),
            Err(e) => self.write_failed(lang, &message.thread_id, e),
        }
    }

    async fn mute(&self, message: &Message, settings: &GroupSettings, args: &[&str]) -> String {
        let lang = settings.locale();
        let targets = command_targets(message, args);
        if targets.is_empty() {
            return get_text(lang, "command.no_targets");
        }
        let duration = args.iter().rev().find_map(|arg| parse_duration(arg));
        let until = match duration {
            Some(d) => {
                let until = i64::try_from(d.as_millis())
                    .ok()
                    .and_then(|ms| now_ms().checked_add(ms));
                match until {
                    Some(until) => Some(until),
                    None => {
                        return format_text(
                            lang,
                            "command.usage.mute",
                            &[("prefix", &self.state.config.command_prefix)],
                        );
                    }
                }
            }
            None => None,
        };

        let result = self
            .state
            .settings
            .update(&message.thread_id, |s| {
                for target in &targets {
                    s.mute_list.insert(
                        target.user_id.clone(),
                        MuteEntry {
                            name: target.name.clone(),
                            until,
                        },
                    );
                }
                (true, ())
            })
            .await;
        if let Err(e) = result {
            return self.write_failed(lang, &message.thread_id, e);
        }
        match duration {
            Some(d) => format_text(
                lang,
                "command.mute.timed",
                &[("names", &names(&targets)), ("minutes", &(d.as_secs() / 60).to_string())],
            ),
            None => format_text(lang, "command.mute.forever", &[("names", &names(&targets))]),
        }
    }

    async fn unmute(&self, message: &Message, settings: &GroupSettings, args: &[&str]) -> String {
        let lang = settings.locale();
        let targets = command_targets(message, args);
        if targets.is_empty() {
            return get_text(lang, "command.no_targets");
        }
        let result = self
            .state
            .settings
            .update(&message.thread_id, |s| {
                let removed = targets
                    .iter()
                    .filter(|t| s.mute_list.remove(&t.user_id).is_some())
                    .count();
                (removed > 0, ())
            })
            .await;
        match result {
            Ok(()) => format_text(lang, "command.mute.lifted", &[("names", &names(&targets))]),
            Err(e) => self.write_failed(lang, &message.thread_id, e),
        }
    }

    async fn bad_word(&self, thread_id: &str, settings: &GroupSettings, args: &[&str]) -> String {
        let lang = settings.locale();
        let usage = || {
            format_text(
                lang,
                "command.usage.badword",
                &[("prefix", &self.state.config.command_prefix)],
            )
        };
        let Some((action, words)) = args.split_first() else {
            return usage();
        };
        let word = words.join(" ").to_lowercase();
        if word.is_empty() {
            return usage();
        }
        let add = match action.to_lowercase().as_str() {
            "add" => true,
            "remove" => false,
            _ => return usage(),
        };

        let result = self
            .state
            .settings
            .update(thread_id, |s| {
                if add {
                    if s.bad_words.contains(&word) {
                        return (false, true);
                    }
                    s.bad_words.push(word.clone());
                    (true, true)
                } else {
                    let before = s.bad_words.len();
                    s.bad_words.retain(|w| w != &word);
                    let removed = s.bad_words.len() != before;
                    (removed, removed)
                }
            })
            .await;
        let key = match result {
            Ok(true) if add => "command.badword.added",
            Ok(true) => "command.badword.removed",
            Ok(false) => "command.badword.missing",
            Err(e) => return self.write_failed(lang, thread_id, e),
        };
        format_text(lang, key, &[("word", &word)])
    }

    fn violations(&self, message: &Message, settings: &GroupSettings, args: &[&str]) -> String {
        let lang = settings.locale();
        let target = command_targets(message, args)
            .into_iter()
            .next()
            .unwrap_or_else(|| Target {
                user_id: message.sender_id().to_string(),
                name: message.sender_name().to_string(),
            });
        let counts = self.state.violations.counts_for(&message.thread_id, &target.user_id);
        if counts.is_empty() {
            return format_text(lang, "command.violations.none", &[("name", &target.name)]);
        }
        let lines = counts
            .iter()
            .map(|(kind, count)| {
                format!("{}: {}/{}", kind, count, self.state.config.policies.get(*kind).threshold)
            })
            .collect::<Vec<_>>()
            .join("\n");
        format_text(
            lang,
            "command.violations.header",
            &[("name", &target.name), ("lines", &lines)],
        )
    }

    async fn lang(&self, thread_id: &str, settings: &GroupSettings, args: &[&str]) -> String {
        let current = settings.locale();
        let Some(wanted) = args.first().map(|a| a.to_lowercase()).filter(|a| i18n::is_supported(a)) else {
            return format!("vi | en ({})", current);
        };
        let result = self
            .state
            .settings
            .update(thread_id, |s| {
                let changed = s.language.as_deref() != Some(wanted.as_str());
                s.language = Some(wanted.clone());
                (changed, ())
            })
            .await;
        match result {
            Ok(()) => format!("✅ {}", wanted),
            Err(e) => self.write_failed(current, thread_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("  !Guard spam on", "!"),
            Some(("guard".to_string(), vec!["spam", "on"]))
        );
        assert_eq!(split_command("guard spam on", "!"), None);
        assert_eq!(split_command("!", "!"), None);
    }

    #[test]
    fn test_command_names() {
        assert_eq!(Command::parse("wl"), Some(Command::List(ListKind::White)));
        assert_eq!(Command::parse("warns"), Some(Command::Violations));
        assert_eq!(Command::parse("ban"), None);
    }
}
