//! Event and message models exchanged with the chat client.
//!
//! These mirror the JSON the bridge forwards, so field names follow its
//! camelCase convention.

use serde::{Deserialize, Serialize};

/// Conversation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThreadType {
    #[default]
    Direct,
    Group,
}

/// A user mention inside a text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub uid: String,
    pub pos: usize,
    pub len: usize,
}

/// Quoted (replied-to) message reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub owner_id: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub global_msg_id: String,
}

/// Attachment payload (photo, video, file, sticker, link card...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Attachment {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub thumb: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Message body: plain text or a structured attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Attachment(Attachment),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// Broad classification of a message derived from its `msgType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Photo,
    Video,
    File,
    Voice,
    Gif,
    Sticker,
    Link,
    Card,
    Other,
}

impl MessageKind {
    pub fn from_msg_type(msg_type: &str) -> Self {
        match msg_type {
            "webchat" | "chat.text" => Self::Text,
            "chat.photo" => Self::Photo,
            "chat.video.msg" => Self::Video,
            "share.file" => Self::File,
            "chat.voice" => Self::Voice,
            "chat.gif" => Self::Gif,
            "chat.sticker" => Self::Sticker,
            "chat.recommended" | "chat.link" => Self::Link,
            "chat.ecard" | "chat.webcontent" => Self::Card,
            _ => Self::Other,
        }
    }

    /// Uploaded media (counts towards anti-media and upload bursts).
    pub fn is_media(self) -> bool {
        matches!(self, Self::Photo | Self::Video | Self::File | Self::Voice | Self::Gif)
    }

    /// Media that can be sent to the content classifier.
    pub fn is_visual(self) -> bool {
        matches!(self, Self::Photo | Self::Video | Self::Gif | Self::Sticker)
    }
}

/// Inner payload of a message event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub msg_id: String,
    #[serde(default)]
    pub cli_msg_id: String,
    pub uid_from: String,
    #[serde(default)]
    pub d_name: String,
    #[serde(default)]
    pub content: MessageContent,
    #[serde(default)]
    pub mentions: Vec<Mention>,
    #[serde(default)]
    pub quote: Option<Quote>,
    #[serde(default)]
    pub msg_type: String,
    #[serde(default)]
    pub ttl: u64,
    #[serde(default)]
    pub forwarded: bool,
    #[serde(default)]
    pub ts: i64,
}

/// An inbound message. Read-only for the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub thread_id: String,
    #[serde(rename = "type")]
    pub thread_type: ThreadType,
    #[serde(default)]
    pub is_self: bool,
    pub data: MessageData,
}

impl Message {
    pub fn is_group(&self) -> bool {
        self.thread_type == ThreadType::Group
    }

    pub fn sender_id(&self) -> &str {
        &self.data.uid_from
    }

    pub fn sender_name(&self) -> &str {
        &self.data.d_name
    }

    /// Text body, or the attachment title/description for link cards.
    pub fn text(&self) -> Option<&str> {
        match &self.data.content {
            MessageContent::Text(text) => Some(text.as_str()),
            MessageContent::Attachment(_) => None,
        }
    }

    /// All human-readable text carried by the message.
    pub fn searchable_text(&self) -> String {
        match &self.data.content {
            MessageContent::Text(text) => text.clone(),
            // uploads carry CDN urls, only shared links count as text
            MessageContent::Attachment(a) if matches!(self.kind(), MessageKind::Link | MessageKind::Card) => {
                format!("{} {} {}", a.title, a.description, a.href)
            }
            MessageContent::Attachment(a) => format!("{} {}", a.title, a.description),
        }
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        match &self.data.content {
            MessageContent::Attachment(a) => Some(a),
            MessageContent::Text(_) => None,
        }
    }

    pub fn kind(&self) -> MessageKind {
        MessageKind::from_msg_type(&self.data.msg_type)
    }

    /// Reference used for deletion.
    pub fn reference(&self) -> MessageRef {
        MessageRef {
            thread_id: self.thread_id.clone(),
            thread_type: self.thread_type,
            msg_id: self.data.msg_id.clone(),
            cli_msg_id: self.data.cli_msg_id.clone(),
            uid_from: self.data.uid_from.clone(),
        }
    }

    /// Copy of this message carrying different text, for re-dispatching a
    /// synthesized command.
    pub fn with_content(&self, thread_id: &str, content: &str) -> Self {
        let mut msg = self.clone();
        msg.thread_id = thread_id.to_string();
        msg.data.content = MessageContent::Text(content.to_string());
        msg.data.msg_type = "webchat".to_string();
        msg
    }
}

/// Enough of a message to delete or quote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub thread_id: String,
    pub thread_type: ThreadType,
    pub msg_id: String,
    pub cli_msg_id: String,
    pub uid_from: String,
}

/// Outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<Mention>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<MessageRef>,
    #[serde(default)]
    pub ttl: u64,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Text message tagging `uid`; the first occurrence of `tag` in the text
    /// becomes the mention span.
    pub fn tagging(text: impl Into<String>, uid: &str, tag: &str) -> Self {
        let text = text.into();
        let mentions = text
            .find(tag)
            .map(|byte_pos| {
                vec![Mention {
                    uid: uid.to_string(),
                    pos: text[..byte_pos].chars().count(),
                    len: tag.chars().count(),
                }]
            })
            .unwrap_or_default();
        Self {
            text,
            mentions,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_attachment(mut self, path: impl Into<String>) -> Self {
        self.attachments.push(path.into());
        self
    }

    #[must_use]
    pub fn quoting(mut self, reference: MessageRef) -> Self {
        self.quote = Some(reference);
        self
    }

    #[must_use]
    pub fn ttl(mut self, ttl_ms: u64) -> Self {
        self.ttl = ttl_ms;
        self
    }
}

/// Group metadata returned by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub group_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub creator_id: String,
    #[serde(default)]
    pub admin_ids: Vec<String>,
    /// Plain group or community.
    #[serde(default)]
    pub group_type: u8,
    #[serde(default)]
    pub total_member: u32,
}

impl GroupInfo {
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.creator_id == user_id || self.admin_ids.iter().any(|id| id == user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

/// User profile returned by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub gender: Gender,
}

/// Kind of group membership event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupEventKind {
    Join,
    Leave,
    Remove,
    Block,
    AddAdmin,
    RemoveAdmin,
    UpdateSetting,
    Update,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub id: String,
    #[serde(default)]
    pub d_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEvent {
    pub thread_id: String,
    pub kind: GroupEventKind,
    #[serde(default)]
    pub actor_id: String,
    #[serde(default)]
    pub members: Vec<GroupMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub thread_id: String,
    #[serde(default)]
    pub thread_type: ThreadType,
    pub uid_from: String,
    pub msg_id: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Undo {
    pub thread_id: String,
    #[serde(default)]
    pub thread_type: ThreadType,
    pub uid_from: String,
    pub msg_id: String,
}

/// Raw event delivered by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ClientEvent {
    Message(Message),
    GroupEvent(GroupEvent),
    Reaction(Reaction),
    Undo(Undo),
}

impl ClientEvent {
    /// Event class name used in diagnostics.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::GroupEvent(_) => "group_event",
            Self::Reaction(_) => "reaction",
            Self::Undo(_) => "undo",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_event_from_bridge_json() {
        let raw = r#"{
            "event": "message",
            "payload": {
                "threadId": "g1",
                "type": "group",
                "data": {
                    "msgId": "m1",
                    "uidFrom": "u1",
                    "dName": "Lan",
                    "content": "hello",
                    "msgType": "webchat"
                }
            }
        }"#;
        let event: ClientEvent = serde_json::from_str(raw).unwrap();
        let ClientEvent::Message(msg) = event else {
            panic!("expected message event");
        };
        assert!(msg.is_group());
        assert_eq!(msg.text(), Some("hello"));
        assert_eq!(msg.kind(), MessageKind::Text);
        assert_eq!(msg.data.ttl, 0);
    }

    #[test]
    fn test_attachment_content() {
        let raw = r#"{
            "threadId": "g1",
            "type": "group",
            "data": {
                "msgId": "m2",
                "uidFrom": "u1",
                "content": {"href": "https://cdn/x.jpg", "title": "pic"},
                "msgType": "chat.photo"
            }
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.text(), None);
        assert_eq!(msg.attachment().unwrap().href, "https://cdn/x.jpg");
        assert!(msg.kind().is_media());
        assert!(msg.kind().is_visual());
    }

    #[test]
    fn test_tagging_uses_char_positions() {
        let out = OutgoingMessage::tagging("⚠️ @Lan vi phạm", "u1", "@Lan");
        assert_eq!(out.mentions.len(), 1);
        assert_eq!(out.mentions[0].pos, 3);
        assert_eq!(out.mentions[0].len, 4);
    }

    #[test]
    fn test_with_content_keeps_sender() {
        let msg = Message {
            thread_id: "g1".into(),
            thread_type: ThreadType::Group,
            data: MessageData {
                msg_id: "m1".into(),
                uid_from: "u1".into(),
                msg_type: "chat.photo".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let synth = msg.with_content("g2", "!guard");
        assert_eq!(synth.thread_id, "g2");
        assert_eq!(synth.sender_id(), "u1");
        assert_eq!(synth.text(), Some("!guard"));
        assert_eq!(msg.thread_id, "g1");
    }
}
