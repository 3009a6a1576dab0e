use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    Result,
};

/// Response envelope shared by every Bot API method.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
}

impl<T: DeserializeOwned> ApiEnvelope<T> {
    /// Unwrap `result`, treating `ok=false` as a protocol error.
    pub fn into_result(self, status: u16) -> Result<T> {
        if !self.ok {
            return Err(Error::Protocol {
                status: self.error_code.unwrap_or(status),
                description: self
                    .description
                    .unwrap_or_else(|| "request was not ok".to_string()),
            });
        }
        self.result
            .ok_or_else(|| Error::Decode("response has ok=true but no result".to_string()))
    }
}

/// Bot identity as returned by `getMe`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BotUser {
    pub id: UserId,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub can_join_groups: Option<bool>,
    pub can_read_all_group_messages: Option<bool>,
    pub supports_inline_queries: Option<bool>,
}

impl BotUser {
    pub fn full_name(&self) -> String {
        display_name(&self.first_name, self.last_name.as_deref())
    }
}

/// A user as embedded in messages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        display_name(&self.first_name, self.last_name.as_deref())
    }
}

/// A chat as embedded in messages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub title: Option<String>,
    pub username: Option<String>,
}

/// Default member permissions of a chat (`getChat`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ChatPermissions {
    pub can_send_messages: Option<bool>,
    pub can_send_media_messages: Option<bool>,
    pub can_send_audios: Option<bool>,
    pub can_send_documents: Option<bool>,
    pub can_send_photos: Option<bool>,
    pub can_send_videos: Option<bool>,
    pub can_send_video_notes: Option<bool>,
    pub can_send_voice_notes: Option<bool>,
    pub can_send_polls: Option<bool>,
    pub can_send_other_messages: Option<bool>,
    pub can_add_web_page_previews: Option<bool>,
    pub can_change_info: Option<bool>,
    pub can_invite_users: Option<bool>,
    pub can_pin_messages: Option<bool>,
    pub can_manage_topics: Option<bool>,
}

/// Full chat info as returned by `getChat`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ChatInfo {
    pub id: ChatId,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub title: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub invite_link: Option<String>,
    #[serde(default)]
    pub permissions: Option<ChatPermissions>,
    pub join_to_send_messages: Option<bool>,
    pub max_reaction_count: Option<u32>,
    pub accent_color_id: Option<u32>,
}

/// A message returned by send/edit methods.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub caption: Option<String>,
}

impl Message {
    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat.id,
            message_id: self.message_id,
        }
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.date, 0)
    }
}

/// `editMessageText` returns the edited message, or `true` for inline messages.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EditedMessage {
    Message(Box<Message>),
    Inline(bool),
}

pub(crate) fn display_name(first: &str, last: Option<&str>) -> String {
    format!("{} {}", first, last.unwrap_or("")).trim().to_string()
}
