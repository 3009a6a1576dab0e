use std::path::PathBuf;

use serde::Serialize;

use crate::domain::{ChatId, MessageId, MessageRef};

/// Telegram text formatting mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[default]
    #[serde(rename = "HTML")]
    Html,
    MarkdownV2,
    Markdown,
}

impl ParseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseMode::Html => "HTML",
            ParseMode::MarkdownV2 => "MarkdownV2",
            ParseMode::Markdown => "Markdown",
        }
    }
}

/// Inline keyboard attached to a message (`reply_markup`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    #[serde(rename = "inline_keyboard")]
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            url: None,
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            url: Some(url.into()),
        }
    }
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row of buttons.
    pub fn row(mut self, buttons: impl IntoIterator<Item = InlineButton>) -> Self {
        self.rows.push(buttons.into_iter().collect());
        self
    }

    /// One callback button per row, `(label, payload)` pairs.
    pub fn one_per_row<I, L, D>(options: I) -> Self
    where
        I: IntoIterator<Item = (L, D)>,
        L: Into<String>,
        D: Into<String>,
    {
        Self {
            rows: options
                .into_iter()
                .map(|(label, data)| vec![InlineButton::callback(label, data)])
                .collect(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"inline_keyboard\":[]}".to_string())
    }
}

/// `sendMessage` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub parse_mode: ParseMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboard>,
}

impl SendMessage {
    pub fn new(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: ParseMode::default(),
            reply_to_message_id: None,
            reply_markup: None,
        }
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    pub fn reply_to(mut self, message_id: MessageId) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    pub fn keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.reply_markup = Some(keyboard);
        self
    }
}

/// Where a photo comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhotoSource {
    /// Local file, uploaded as a multipart file part.
    File(PathBuf),
    /// HTTP URL or an existing Telegram `file_id`, sent as a text part.
    Remote(String),
}

impl PhotoSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Remote(url.into())
    }
}

/// `sendPhoto` request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendPhoto {
    pub chat_id: ChatId,
    pub photo: PhotoSource,
    pub caption: Option<String>,
    pub parse_mode: ParseMode,
    pub reply_to_message_id: Option<MessageId>,
    pub reply_markup: Option<InlineKeyboard>,
}

impl SendPhoto {
    pub fn new(chat_id: ChatId, photo: PhotoSource) -> Self {
        Self {
            chat_id,
            photo,
            caption: None,
            parse_mode: ParseMode::default(),
            reply_to_message_id: None,
            reply_markup: None,
        }
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    pub fn reply_to(mut self, message_id: MessageId) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    pub fn keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.reply_markup = Some(keyboard);
        self
    }
}

/// `editMessageText` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EditMessageText {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboard>,
}

impl EditMessageText {
    pub fn new(msg: MessageRef, text: impl Into<String>) -> Self {
        Self {
            chat_id: msg.chat_id,
            message_id: msg.message_id,
            text: text.into(),
            parse_mode: None,
            reply_markup: None,
        }
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.reply_markup = Some(keyboard);
        self
    }
}
