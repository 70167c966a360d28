use std::sync::atomic::{AtomicU64, Ordering};

use crate::client::{Attachment, Message, MessageContent, MessageData, ThreadType};
use crate::guards::GuardInput;
use crate::permissions::SenderStanding;
use crate::storage::GroupSettings;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> String {
    NEXT_ID.fetch_add(1, Ordering::Relaxed).to_string()
}

/// Plain text message in a group, with a fresh message id.
pub fn group_message(thread_id: &str, sender: &str, text: &str) -> Message {
    let id = next_id();
    Message {
        thread_id: thread_id.to_string(),
        thread_type: ThreadType::Group,
        is_self: false,
        data: MessageData {
            cli_msg_id: format!("c{}", id),
            msg_id: id,
            uid_from: sender.to_string(),
            d_name: format!("User {}", sender),
            content: MessageContent::Text(text.to_string()),
            msg_type: "webchat".to_string(),
            ..Default::default()
        },
    }
}

/// Attachment message of the given client message type.
pub fn media_message(thread_id: &str, sender: &str, msg_type: &str) -> Message {
    let mut message = group_message(thread_id, sender, "");
    message.data.msg_type = msg_type.to_string();
    message.data.content = MessageContent::Attachment(Attachment {
        href: format!("https://cdn.example/{}.jpg", message.data.msg_id),
        thumb: format!("https://cdn.example/{}-thumb.jpg", message.data.msg_id),
        ..Default::default()
    });
    message
}

pub fn direct_message(sender: &str, text: &str) -> Message {
    let mut message = group_message(sender, sender, text);
    message.thread_type = ThreadType::Direct;
    message
}

/// Input for calling `Guard::decide` directly: a regular member in a
/// group where the bot is admin.
pub fn guard_input<'a>(message: &'a Message, settings: &'a GroupSettings) -> GuardInput<'a> {
    guard_input_at(message, settings, 0)
}

pub fn guard_input_at<'a>(message: &'a Message, settings: &'a GroupSettings, now_ms: i64) -> GuardInput<'a> {
    GuardInput {
        message,
        settings,
        standing: SenderStanding {
            bot_is_admin: true,
            ..Default::default()
        },
        now_ms,
    }
}
