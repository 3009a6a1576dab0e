//! Telegram Bot API adapter.
//!
//! [`TelegramApi`] implements the `tbot-core` [`BotApi`] port over HTTPS with a
//! lazily opened, reusable `reqwest` session. On top of it sit the dispatch
//! tables ([`handlers`]), the per-update contexts ([`context`]), the poll loop
//! ([`router`]) and the [`Bot`] facade.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    RequestBuilder,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

pub mod bot;
pub mod context;
pub mod handlers;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

pub use bot::Bot;
pub use context::{CallbackContext, MessageContext};
pub use handlers::{CallbackHandler, CommandHandler, HandlerResult};

use tbot_core::{
    config::{Config, DEFAULT_API_URL},
    domain::{ChatId, MessageRef, UpdateId},
    errors::Error,
    messaging::{
        port::BotApi,
        types::{EditMessageText, PhotoSource, SendMessage, SendPhoto},
    },
    model::types::{ApiEnvelope, BotUser, ChatInfo, EditedMessage, Message},
    ApiFailure, ApiResult, Result,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTPS session against `<base>/bot<TOKEN>/<method>`.
///
/// The `reqwest` client is created on first use (or on [`BotApi::open`]) and
/// dropped by [`BotApi::close`]; both are idempotent.
pub struct TelegramApi {
    token: String,
    base_url: String,
    timeout: Duration,
    session: Mutex<Option<reqwest::Client>>,
}

impl std::fmt::Debug for TelegramApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramApi")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramApi {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            session: Mutex::new(None),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.bot_token.clone())
            .with_base_url(&cfg.api_url)
            .with_timeout(cfg.request_timeout)
    }

    /// Point the session at another API host (local Bot API server, mock server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token)
    }

    pub async fn is_open(&self) -> bool {
        self.session.lock().await.is_some()
    }

    async fn session(&self) -> Result<reqwest::Client> {
        let mut guard = self.session.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build http client: {e}")))?;
        *guard = Some(client.clone());
        tracing::debug!(base_url = %self.base_url, "bot api session opened");
        Ok(client)
    }

    async fn get<T: DeserializeOwned>(&self, method: &str, query: &[(&str, String)]) -> Result<T> {
        let http = self.session().await?;
        let req = http.get(self.method_url(method)).query(query);
        self.execute(method, req).await
    }

    async fn post_json<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let http = self.session().await?;
        let req = http.post(self.method_url(method)).json(body);
        self.execute(method, req).await
    }

    async fn post_query<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let http = self.session().await?;
        let req = http.post(self.method_url(method)).query(query);
        self.execute(method, req).await
    }

    async fn post_form<T: DeserializeOwned>(&self, method: &str, form: Form) -> Result<T> {
        let http = self.session().await?;
        let req = http.post(self.method_url(method)).multipart(form);
        self.execute(method, req).await
    }

    async fn execute<T: DeserializeOwned>(&self, method: &str, req: RequestBuilder) -> Result<T> {
        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{method}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format!("{method}: failed to read body: {e}")))?;

        if !status.is_success() {
            let description = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|env| env.description)
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(Error::Protocol {
                status: status.as_u16(),
                description,
            });
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)
            .map_err(|e| Error::Decode(format!("{method}: {e}")))?;
        envelope.into_result(status.as_u16())
    }

    async fn photo_form(req: SendPhoto) -> Result<Form> {
        let mut form = Form::new().text("chat_id", req.chat_id.0.to_string());

        form = match req.photo {
            PhotoSource::File(path) => {
                let bytes = tokio::fs::read(&path).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::FileNotFound(path.clone())
                    } else {
                        Error::Io(e)
                    }
                })?;
                let file_name = path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or("photo.jpg")
                    .to_string();
                form.part("photo", Part::bytes(bytes).file_name(file_name))
            }
            PhotoSource::Remote(url) => form.text("photo", url),
        };

        form = form.text("parse_mode", req.parse_mode.as_str());
        if let Some(caption) = req.caption {
            form = form.text("caption", caption);
        }
        if let Some(markup) = req.reply_markup {
            form = form.text("reply_markup", markup.to_json());
        }
        if let Some(reply_to) = req.reply_to_message_id {
            form = form.text("reply_to_message_id", reply_to.0.to_string());
        }
        Ok(form)
    }
}

fn failure(method: &str, e: Error) -> ApiFailure {
    tracing::error!(method, error = %e, "bot api call failed");
    e.into()
}

#[async_trait]
impl BotApi for TelegramApi {
    async fn open(&self) -> ApiResult<()> {
        self.session()
            .await
            .map(|_| ())
            .map_err(|e| failure("open", e))
    }

    async fn close(&self) {
        if self.session.lock().await.take().is_some() {
            tracing::debug!("bot api session closed");
        }
    }

    async fn get_updates(&self, offset: UpdateId) -> ApiResult<Vec<serde_json::Value>> {
        self.get("getUpdates", &[("offset", offset.0.to_string())])
            .await
            .map_err(|e| failure("getUpdates", e))
    }

    async fn get_me(&self) -> ApiResult<BotUser> {
        self.get("getMe", &[])
            .await
            .map_err(|e| failure("getMe", e))
    }

    async fn send_message(&self, req: SendMessage) -> ApiResult<Message> {
        let msg: Message = self
            .post_json("sendMessage", &req)
            .await
            .map_err(|e| failure("sendMessage", e))?;
        tracing::info!(
            chat_id = req.chat_id.0,
            message_id = msg.message_id.0,
            "message sent"
        );
        Ok(msg)
    }

    async fn send_photo(&self, req: SendPhoto) -> ApiResult<Message> {
        let chat_id = req.chat_id;
        let form = Self::photo_form(req)
            .await
            .map_err(|e| failure("sendPhoto", e))?;
        let msg: Message = self
            .post_form("sendPhoto", form)
            .await
            .map_err(|e| failure("sendPhoto", e))?;
        tracing::info!(
            chat_id = chat_id.0,
            message_id = msg.message_id.0,
            "photo sent"
        );
        Ok(msg)
    }

    async fn get_chat(&self, chat_id: ChatId) -> ApiResult<ChatInfo> {
        self.post_json("getChat", &json!({ "chat_id": chat_id }))
            .await
            .map_err(|e| failure("getChat", e))
    }

    async fn edit_message_text(&self, req: EditMessageText) -> ApiResult<EditedMessage> {
        self.post_json("editMessageText", &req)
            .await
            .map_err(|e| failure("editMessageText", e))
    }

    async fn delete_message(&self, msg: MessageRef) -> ApiResult<bool> {
        let body = json!({ "chat_id": msg.chat_id, "message_id": msg.message_id });
        self.post_json("deleteMessage", &body)
            .await
            .map_err(|e| failure("deleteMessage", e))
    }

    async fn delete_webhook(&self, drop_pending_updates: bool) -> ApiResult<bool> {
        let flag = if drop_pending_updates { "true" } else { "false" };
        self.post_query("deleteWebhook", &[("drop_pending_updates", flag)])
            .await
            .map_err(|e| failure("deleteWebhook", e))
    }

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> ApiResult<bool> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(t) = text {
            body["text"] = json!(t);
        }
        self.post_json("answerCallbackQuery", &body)
            .await
            .map_err(|e| failure("answerCallbackQuery", e))
    }
}
