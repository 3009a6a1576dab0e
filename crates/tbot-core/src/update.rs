//! Central parser for raw `getUpdates` entries.
//!
//! Every optional field is defaulted here, once: missing names become empty
//! strings, missing ids become zero and a missing reply becomes `None`. Anything
//! that cannot be routed safely is reported as [`Error::MalformedUpdate`].

use serde::Deserialize;
use serde_json::Value;

use crate::{
    domain::{ChatId, MessageId, MessageRef, UpdateId, UserId},
    errors::Error,
    model::types::display_name,
    Result,
};

/// One parsed update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Update {
    pub id: UpdateId,
    pub kind: UpdateKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateKind {
    Message(IncomingMessage),
    Callback(IncomingCallback),
    /// Any other update type (edited messages, polls, ...); carries the field name.
    Unknown(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    /// First and last name joined by a space, trimmed.
    pub full_name: String,
    pub username: Option<String>,
    pub is_bot: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatRef {
    pub id: ChatId,
    /// `private`, `group`, `supergroup` or `channel`; empty when unknown.
    pub kind: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplyTo {
    pub message_id: MessageId,
    pub from: Sender,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncomingMessage {
    pub message_id: MessageId,
    pub chat: ChatRef,
    pub from: Sender,
    pub text: String,
    pub date: i64,
    pub reply_to: Option<ReplyTo>,
}

impl IncomingMessage {
    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat.id,
            message_id: self.message_id,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncomingCallback {
    pub id: String,
    pub from: Sender,
    /// Message the pressed button was attached to (default when not available).
    pub message: IncomingMessage,
    pub chat_instance: String,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    update_id: i64,
    message: Option<RawMessage>,
    callback_query: Option<RawCallback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMessage {
    message_id: i64,
    date: i64,
    from: Option<RawUser>,
    chat: Option<RawChat>,
    text: Option<String>,
    reply_to_message: Option<Box<RawMessage>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUser {
    id: i64,
    is_bot: bool,
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChat {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCallback {
    id: Option<String>,
    from: Option<RawUser>,
    message: Option<RawMessage>,
    chat_instance: Option<String>,
    data: Option<String>,
}

/// Read `update_id` without validating the rest of the update.
///
/// Lets the poll loop advance past an update it could not parse.
pub fn peek_update_id(raw: &Value) -> Option<UpdateId> {
    raw.get("update_id").and_then(Value::as_i64).map(UpdateId)
}

/// Parse one raw update into a routable [`Update`].
pub fn parse_update(raw: &Value) -> Result<Update> {
    if !raw.is_object() {
        return Err(Error::MalformedUpdate(format!(
            "expected an object, got {}",
            json_kind(raw)
        )));
    }

    let parsed =
        RawUpdate::deserialize(raw).map_err(|e| Error::MalformedUpdate(e.to_string()))?;
    let id = UpdateId(parsed.update_id);

    // Callback first: a callback update is never routed as a command.
    if let Some(cb) = parsed.callback_query {
        let callback_id = cb
            .id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::MalformedUpdate(format!("update {}: callback_query has no id", id.0))
            })?;
        return Ok(Update {
            id,
            kind: UpdateKind::Callback(IncomingCallback {
                id: callback_id,
                from: cb.from.map(sender).unwrap_or_default(),
                message: cb.message.map(message).unwrap_or_default(),
                chat_instance: cb.chat_instance.unwrap_or_default(),
                data: cb.data,
            }),
        });
    }

    if let Some(msg) = parsed.message {
        return Ok(Update {
            id,
            kind: UpdateKind::Message(message(msg)),
        });
    }

    let other = raw
        .as_object()
        .and_then(|m| m.keys().find(|k| k.as_str() != "update_id").cloned())
        .unwrap_or_else(|| "empty".to_string());
    Ok(Update {
        id,
        kind: UpdateKind::Unknown(other),
    })
}

fn message(raw: RawMessage) -> IncomingMessage {
    let chat = raw.chat.unwrap_or_default();
    IncomingMessage {
        message_id: MessageId(raw.message_id),
        chat: ChatRef {
            id: ChatId(chat.id),
            kind: chat.kind,
        },
        from: raw.from.map(sender).unwrap_or_default(),
        text: raw.text.unwrap_or_default(),
        date: raw.date,
        reply_to: raw.reply_to_message.map(|r| ReplyTo {
            message_id: MessageId(r.message_id),
            from: r.from.map(sender).unwrap_or_default(),
        }),
    }
}

fn sender(raw: RawUser) -> Sender {
    Sender {
        id: UserId(raw.id),
        full_name: display_name(&raw.first_name, raw.last_name.as_deref()),
        username: raw.username,
        is_bot: raw.is_bot,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
