//! Per-update contexts handed to handlers.
//!
//! Contexts share the bot's transport handle; no context opens a session of
//! its own.

use std::{fmt, sync::Arc};

use tbot_core::{
    domain::{ChatId, MessageId},
    messaging::{
        port::BotApi,
        types::{EditMessageText, InlineKeyboard, PhotoSource, SendMessage, SendPhoto},
    },
    model::types::{EditedMessage, Message},
    update::{IncomingCallback, IncomingMessage, ReplyTo, Sender},
    ApiResult,
};

/// One inbound message plus the means to respond to it.
#[derive(Clone)]
pub struct MessageContext {
    pub message: IncomingMessage,
    api: Arc<dyn BotApi>,
}

impl fmt::Debug for MessageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageContext")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl MessageContext {
    pub fn new(message: IncomingMessage, api: Arc<dyn BotApi>) -> Self {
        Self { message, api }
    }

    pub fn text(&self) -> &str {
        &self.message.text
    }

    pub fn chat_id(&self) -> ChatId {
        self.message.chat.id
    }

    /// `private`, `group`, `supergroup` or `channel`.
    pub fn chat_kind(&self) -> &str {
        &self.message.chat.kind
    }

    pub fn message_id(&self) -> MessageId {
        self.message.message_id
    }

    pub fn from(&self) -> &Sender {
        &self.message.from
    }

    pub fn reply_to(&self) -> Option<&ReplyTo> {
        self.message.reply_to.as_ref()
    }

    pub fn api(&self) -> &Arc<dyn BotApi> {
        &self.api
    }

    /// Send `text` to the same chat.
    pub async fn answer(&self, text: impl Into<String>) -> ApiResult<Message> {
        self.send(SendMessage::new(self.chat_id(), text)).await
    }

    pub async fn answer_with_keyboard(
        &self,
        text: impl Into<String>,
        keyboard: InlineKeyboard,
    ) -> ApiResult<Message> {
        self.send(SendMessage::new(self.chat_id(), text).keyboard(keyboard))
            .await
    }

    /// Send `text` to the same chat as a reply to this message.
    pub async fn reply(&self, text: impl Into<String>) -> ApiResult<Message> {
        self.send(SendMessage::new(self.chat_id(), text).reply_to(self.message_id()))
            .await
    }

    /// Send a fully custom request.
    pub async fn send(&self, req: SendMessage) -> ApiResult<Message> {
        self.api.send_message(req).await
    }

    pub async fn answer_photo(
        &self,
        photo: PhotoSource,
        caption: Option<&str>,
    ) -> ApiResult<Message> {
        self.api
            .send_photo(with_caption(SendPhoto::new(self.chat_id(), photo), caption))
            .await
    }

    pub async fn reply_photo(
        &self,
        photo: PhotoSource,
        caption: Option<&str>,
    ) -> ApiResult<Message> {
        let req = SendPhoto::new(self.chat_id(), photo).reply_to(self.message_id());
        self.api.send_photo(with_caption(req, caption)).await
    }

    /// Replace the text of this message (only works for the bot's own messages).
    pub async fn edit_text(&self, text: impl Into<String>) -> ApiResult<EditedMessage> {
        self.api
            .edit_message_text(EditMessageText::new(self.message.message_ref(), text))
            .await
    }

    pub async fn delete(&self) -> ApiResult<bool> {
        self.api.delete_message(self.message.message_ref()).await
    }
}

fn with_caption(req: SendPhoto, caption: Option<&str>) -> SendPhoto {
    match caption {
        Some(c) => req.caption(c),
        None => req,
    }
}

/// One inline-button press.
#[derive(Clone)]
pub struct CallbackContext {
    pub id: String,
    pub from: Sender,
    /// The message carrying the pressed button.
    pub message: MessageContext,
    pub chat_instance: String,
    pub data: Option<String>,
}

impl fmt::Debug for CallbackContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackContext")
            .field("id", &self.id)
            .field("from", &self.from)
            .field("message", &self.message)
            .field("chat_instance", &self.chat_instance)
            .field("data", &self.data)
            .finish()
    }
}

impl CallbackContext {
    pub fn new(callback: IncomingCallback, api: Arc<dyn BotApi>) -> Self {
        Self {
            id: callback.id,
            from: callback.from,
            message: MessageContext::new(callback.message, api),
            chat_instance: callback.chat_instance,
            data: callback.data,
        }
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// Acknowledge the press, optionally showing a toast to the user.
    pub async fn answer(&self, text: Option<&str>) -> ApiResult<bool> {
        self.message
            .api()
            .answer_callback_query(&self.id, text)
            .await
    }
}
