//! In-memory `BotApi` fake and recording handlers shared by unit tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use serde_json::Value;

use tbot_core::{
    command::CommandInvocation,
    domain::{ChatId, MessageId, MessageRef, UpdateId, UserId},
    messaging::{
        port::BotApi,
        types::{EditMessageText, SendMessage, SendPhoto},
    },
    model::types::{BotUser, Chat, ChatInfo, EditedMessage, Message},
    ApiFailure, ApiResult, FailureKind,
};
use tokio_util::sync::CancellationToken;

use crate::{
    context::{CallbackContext, MessageContext},
    handlers::{CallbackHandler, CommandHandler, HandlerResult},
};

#[derive(Default)]
pub(crate) struct FakeApi {
    batches: Mutex<VecDeque<ApiResult<Vec<Value>>>>,
    offsets: Mutex<Vec<UpdateId>>,
    sent: Mutex<Vec<SendMessage>>,
    photos: Mutex<Vec<SendPhoto>>,
    edits: Mutex<Vec<EditMessageText>>,
    deleted: Mutex<Vec<MessageRef>>,
    answered: Mutex<Vec<(String, Option<String>)>>,
    webhook_drops: Mutex<Vec<bool>>,
    open_calls: AtomicUsize,
    close_calls: AtomicUsize,
    next_message_id: AtomicUsize,
    /// Cancel this token once the queued batches run out.
    cancel_when_drained: Mutex<Option<CancellationToken>>,
    get_me_failure: Mutex<Option<String>>,
    stall_get_me: AtomicBool,
    stall_delete_webhook: AtomicBool,
}

impl FakeApi {
    pub(crate) fn push_batch(&self, updates: Vec<Value>) {
        self.batches.lock().unwrap().push_back(Ok(updates));
    }

    pub(crate) fn push_failure(&self, error: &str) {
        self.batches
            .lock()
            .unwrap()
            .push_back(Err(ApiFailure::new(FailureKind::Protocol, error)));
    }

    pub(crate) fn cancel_when_drained(&self, token: CancellationToken) {
        *self.cancel_when_drained.lock().unwrap() = Some(token);
    }

    pub(crate) fn fail_get_me(&self, error: &str) {
        *self.get_me_failure.lock().unwrap() = Some(error.to_string());
    }

    /// `getMe` never completes.
    pub(crate) fn stall_get_me(&self) {
        self.stall_get_me.store(true, Ordering::SeqCst);
    }

    /// `deleteWebhook` is recorded, then never completes.
    pub(crate) fn stall_delete_webhook(&self) {
        self.stall_delete_webhook.store(true, Ordering::SeqCst);
    }

    pub(crate) fn offsets(&self) -> Vec<UpdateId> {
        self.offsets.lock().unwrap().clone()
    }

    pub(crate) fn sent(&self) -> Vec<SendMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn photos(&self) -> Vec<SendPhoto> {
        self.photos.lock().unwrap().clone()
    }

    pub(crate) fn edits(&self) -> Vec<EditMessageText> {
        self.edits.lock().unwrap().clone()
    }

    pub(crate) fn deleted(&self) -> Vec<MessageRef> {
        self.deleted.lock().unwrap().clone()
    }

    pub(crate) fn answered(&self) -> Vec<(String, Option<String>)> {
        self.answered.lock().unwrap().clone()
    }

    pub(crate) fn webhook_drops(&self) -> Vec<bool> {
        self.webhook_drops.lock().unwrap().clone()
    }

    pub(crate) fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn alloc(&self, chat_id: ChatId) -> Message {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        Message {
            message_id: MessageId(id),
            chat: Chat {
                id: chat_id,
                kind: "private".to_string(),
                ..Chat::default()
            },
            ..Message::default()
        }
    }
}

#[async_trait]
impl BotApi for FakeApi {
    async fn open(&self) -> ApiResult<()> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn get_updates(&self, offset: UpdateId) -> ApiResult<Vec<Value>> {
        self.offsets.lock().unwrap().push(offset);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => {
                if let Some(token) = self.cancel_when_drained.lock().unwrap().as_ref() {
                    token.cancel();
                }
                Ok(Vec::new())
            }
        }
    }

    async fn get_me(&self) -> ApiResult<BotUser> {
        if self.stall_get_me.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let failure = self.get_me_failure.lock().unwrap().clone();
        if let Some(error) = failure {
            return Err(ApiFailure::new(FailureKind::Protocol, error));
        }
        Ok(BotUser {
            id: UserId(1000),
            is_bot: true,
            first_name: "Fake".to_string(),
            username: Some("fake_bot".to_string()),
            ..BotUser::default()
        })
    }

    async fn send_message(&self, req: SendMessage) -> ApiResult<Message> {
        let msg = self.alloc(req.chat_id);
        self.sent.lock().unwrap().push(req);
        Ok(msg)
    }

    async fn send_photo(&self, req: SendPhoto) -> ApiResult<Message> {
        let msg = self.alloc(req.chat_id);
        self.photos.lock().unwrap().push(req);
        Ok(msg)
    }

    async fn get_chat(&self, chat_id: ChatId) -> ApiResult<ChatInfo> {
        Ok(ChatInfo {
            id: chat_id,
            kind: "private".to_string(),
            ..ChatInfo::default()
        })
    }

    async fn edit_message_text(&self, req: EditMessageText) -> ApiResult<EditedMessage> {
        let msg = self.alloc(req.chat_id);
        self.edits.lock().unwrap().push(req);
        Ok(EditedMessage::Message(Box::new(msg)))
    }

    async fn delete_message(&self, msg: MessageRef) -> ApiResult<bool> {
        self.deleted.lock().unwrap().push(msg);
        Ok(true)
    }

    async fn delete_webhook(&self, drop_pending_updates: bool) -> ApiResult<bool> {
        self.webhook_drops.lock().unwrap().push(drop_pending_updates);
        if self.stall_delete_webhook.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(true)
    }

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> ApiResult<bool> {
        self.answered
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(true)
    }
}

/// Command handler that records `(label, text, invocation)` per call.
#[derive(Clone, Default)]
pub(crate) struct CommandLog {
    calls: Arc<Mutex<Vec<(String, String, CommandInvocation)>>>,
}

impl CommandLog {
    pub(crate) fn handler(&self, label: &str) -> RecordingCommand {
        RecordingCommand {
            label: label.to_string(),
            log: self.clone(),
            fail: false,
        }
    }

    pub(crate) fn failing(&self, label: &str) -> RecordingCommand {
        RecordingCommand {
            fail: true,
            ..self.handler(label)
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, String, CommandInvocation)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn labels(&self) -> Vec<String> {
        self.calls().into_iter().map(|(label, _, _)| label).collect()
    }
}

pub(crate) struct RecordingCommand {
    label: String,
    log: CommandLog,
    fail: bool,
}

#[async_trait]
impl CommandHandler for RecordingCommand {
    async fn handle(&self, ctx: MessageContext, invocation: CommandInvocation) -> HandlerResult {
        self.log
            .calls
            .lock()
            .unwrap()
            .push((self.label.clone(), ctx.text().to_string(), invocation));
        if self.fail {
            anyhow::bail!("{} exploded", self.label);
        }
        Ok(())
    }
}

/// Callback handler that records `(label, payload)` per call.
#[derive(Clone, Default)]
pub(crate) struct CallbackLog {
    calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl CallbackLog {
    pub(crate) fn handler(&self, label: &str) -> RecordingCallback {
        RecordingCallback {
            label: label.to_string(),
            log: self.clone(),
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

pub(crate) struct RecordingCallback {
    label: String,
    log: CallbackLog,
}

#[async_trait]
impl CallbackHandler for RecordingCallback {
    async fn handle(&self, ctx: CallbackContext) -> HandlerResult {
        self.log
            .calls
            .lock()
            .unwrap()
            .push((self.label.clone(), ctx.data.clone()));
        Ok(())
    }
}
