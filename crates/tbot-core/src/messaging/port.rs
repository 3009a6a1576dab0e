use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, UpdateId},
    messaging::types::{EditMessageText, SendMessage, SendPhoto},
    model::types::{BotUser, ChatInfo, EditedMessage, Message},
    ApiResult,
};

/// Bot API port.
///
/// The HTTP implementation lives in `tbot-telegram`; the poll loop, the
/// dispatch tables and every handler context only see this trait, so tests can
/// swap in an in-memory fake. Every call reports failure as an
/// [`ApiFailure`](crate::ApiFailure) value instead of panicking.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Open the underlying session if it is not open yet.
    async fn open(&self) -> ApiResult<()> {
        Ok(())
    }

    /// Release the underlying session. Safe to call more than once.
    async fn close(&self) {}

    /// Raw updates starting at `offset`; parsing is left to the caller so one
    /// malformed entry cannot poison the whole batch.
    async fn get_updates(&self, offset: UpdateId) -> ApiResult<Vec<serde_json::Value>>;

    async fn get_me(&self) -> ApiResult<BotUser>;

    async fn send_message(&self, req: SendMessage) -> ApiResult<Message>;

    async fn send_photo(&self, req: SendPhoto) -> ApiResult<Message>;

    async fn get_chat(&self, chat_id: ChatId) -> ApiResult<ChatInfo>;

    async fn edit_message_text(&self, req: EditMessageText) -> ApiResult<EditedMessage>;

    async fn delete_message(&self, msg: MessageRef) -> ApiResult<bool>;

    async fn delete_webhook(&self, drop_pending_updates: bool) -> ApiResult<bool>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>)
        -> ApiResult<bool>;
}
