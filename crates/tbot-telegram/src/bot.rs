use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use tbot_core::{
    command::CommandRoute,
    config::{CallbackBatchPolicy, Config},
    domain::{ChatId, MessageRef},
    messaging::{
        port::BotApi,
        types::{EditMessageText, SendMessage, SendPhoto},
    },
    model::types::{BotUser, ChatInfo, EditedMessage, Message},
    ApiResult,
};

use crate::{
    handlers::{CallbackHandler, CallbackTable, CommandHandler, CommandTable},
    router::{run_polling, Router},
    TelegramApi,
};

/// A bot instance: one transport handle, two dispatch tables, one poll loop.
///
/// Handlers are registered up front; [`Bot::run`] consumes the bot and polls
/// until cancelled.
pub struct Bot {
    api: Arc<dyn BotApi>,
    commands: CommandTable,
    callbacks: CallbackTable,
    poll_interval: Duration,
    policy: CallbackBatchPolicy,
    drop_pending_updates: bool,
}

impl Bot {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api(Arc::new(TelegramApi::new(token)))
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::with_api(Arc::new(TelegramApi::from_config(cfg)))
            .poll_interval(cfg.poll_interval)
            .callback_batch_policy(cfg.callback_batch_policy)
            .drop_pending_updates(cfg.drop_pending_updates)
    }

    /// Use a custom transport (a fake in tests, a proxy, ...).
    pub fn with_api(api: Arc<dyn BotApi>) -> Self {
        Self {
            api,
            commands: CommandTable::new(),
            callbacks: CallbackTable::new(),
            poll_interval: Duration::from_secs(1),
            policy: CallbackBatchPolicy::default(),
            drop_pending_updates: false,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn callback_batch_policy(mut self, policy: CallbackBatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn drop_pending_updates(mut self, drop: bool) -> Self {
        self.drop_pending_updates = drop;
        self
    }

    pub fn api(&self) -> &Arc<dyn BotApi> {
        &self.api
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn callbacks(&self) -> &CallbackTable {
        &self.callbacks
    }

    /// Register a command handler; returns the keys it now answers to.
    pub fn register_command<H: CommandHandler>(
        &mut self,
        route: CommandRoute,
        handler: H,
    ) -> Vec<String> {
        self.commands.register(&route, handler)
    }

    pub fn command<H: CommandHandler>(&mut self, name: &str, handler: H) -> &mut Self {
        self.commands.register(&CommandRoute::command(name), handler);
        self
    }

    /// Handler for messages that match no registered command.
    pub fn default_command<H: CommandHandler>(&mut self, handler: H) -> &mut Self {
        self.commands.register(&CommandRoute::fallback(), handler);
        self
    }

    /// `None` registers the default callback handler.
    pub fn register_callback<H: CallbackHandler>(&mut self, data: Option<&str>, handler: H) {
        self.callbacks.register(data, handler);
    }

    pub fn callback<H: CallbackHandler>(&mut self, data: &str, handler: H) -> &mut Self {
        self.callbacks.register(Some(data), handler);
        self
    }

    pub fn default_callback<H: CallbackHandler>(&mut self, handler: H) -> &mut Self {
        self.callbacks.register(None, handler);
        self
    }

    pub async fn get_me(&self) -> ApiResult<BotUser> {
        self.api.get_me().await
    }

    pub async fn send_message(
        &self,
        chat_id: ChatId,
        text: impl Into<String>,
    ) -> ApiResult<Message> {
        self.api.send_message(SendMessage::new(chat_id, text)).await
    }

    pub async fn send(&self, req: SendMessage) -> ApiResult<Message> {
        self.api.send_message(req).await
    }

    pub async fn send_photo(&self, req: SendPhoto) -> ApiResult<Message> {
        self.api.send_photo(req).await
    }

    pub async fn get_chat(&self, chat_id: ChatId) -> ApiResult<ChatInfo> {
        self.api.get_chat(chat_id).await
    }

    pub async fn edit_text(&self, req: EditMessageText) -> ApiResult<EditedMessage> {
        self.api.edit_message_text(req).await
    }

    pub async fn delete_message(&self, msg: MessageRef) -> ApiResult<bool> {
        self.api.delete_message(msg).await
    }

    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> ApiResult<bool> {
        self.api.delete_webhook(drop_pending_updates).await
    }

    pub async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> ApiResult<bool> {
        self.api.answer_callback_query(callback_id, text).await
    }

    /// Identify the bot, then poll until `cancel` fires.
    ///
    /// The startup calls observe `cancel` too; cancelling before polling
    /// begins closes the session without fetching any updates.
    pub async fn run(self, cancel: CancellationToken) {
        let me = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.stop_before_polling().await,
            res = self.api.get_me() => res,
        };
        match me {
            Ok(me) => tracing::info!(
                bot_id = me.id.0,
                first_name = %me.first_name,
                username = me.username.as_deref().unwrap_or(""),
                "poll started"
            ),
            Err(e) => tracing::error!(error = %e.error, "getMe failed; polling anyway"),
        }

        if self.drop_pending_updates {
            let dropped = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.stop_before_polling().await,
                res = self.api.delete_webhook(true) => res,
            };
            match dropped {
                Ok(_) => tracing::info!("pending updates dropped"),
                Err(e) => tracing::warn!(error = %e.error, "deleteWebhook failed"),
            }
        }

        tracing::info!(
            commands = self.commands.len(),
            callbacks = self.callbacks.len(),
            policy = ?self.policy,
            "handlers registered"
        );

        let mut router = Router::new(self.api, self.commands, self.callbacks, self.policy);
        run_polling(&mut router, self.poll_interval, &cancel).await;
    }

    async fn stop_before_polling(&self) {
        self.api.close().await;
        tracing::info!("cancelled before polling started");
    }

    /// [`Bot::run`] until Ctrl-C.
    pub async fn run_until_ctrl_c(self) {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                return;
            }
            tracing::info!("Ctrl-C received, stopping");
            trigger.cancel();
        });
        self.run(cancel).await;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tbot_core::domain::UpdateId;

    use super::*;
    use crate::{
        context::{CallbackContext, MessageContext},
        testing::{CallbackLog, CommandLog, FakeApi},
        HandlerResult,
    };
    use tbot_core::command::CommandInvocation;

    async fn echo(ctx: MessageContext, _inv: CommandInvocation) -> HandlerResult {
        ctx.answer(ctx.text().to_string()).await?;
        Ok(())
    }

    async fn ack(ctx: CallbackContext) -> HandlerResult {
        ctx.answer(Some("ok")).await?;
        Ok(())
    }

    fn fake_bot() -> (Arc<FakeApi>, Bot) {
        let api = Arc::new(FakeApi::default());
        let bot = Bot::with_api(api.clone()).poll_interval(Duration::from_millis(1));
        (api, bot)
    }

    #[test]
    fn registration_reports_expanded_keys() {
        let (_, mut bot) = fake_bot();
        let log = CommandLog::default();

        let keys = bot.register_command(
            CommandRoute::command("ping").with_prefixes(["/", "!"]),
            log.handler("ping"),
        );
        bot.command("/start", log.handler("start"))
            .default_command(log.handler("default"));

        assert_eq!(keys, vec!["/ping", "!ping"]);
        assert!(bot.commands().contains("!ping"));
        assert!(bot.commands().contains("/start"));
        assert!(bot.commands().has_default());
    }

    #[tokio::test]
    async fn run_dispatches_and_closes_the_session() {
        let (api, mut bot) = fake_bot();
        bot.default_command(echo).callback("go", ack);
        api.push_batch(vec![
            json!({
                "update_id": 1,
                "message": {
                    "message_id": 5,
                    "chat": { "id": 9, "type": "private" },
                    "text": "hello"
                }
            }),
            json!({
                "update_id": 2,
                "callback_query": {
                    "id": "q",
                    "data": "go",
                    "message": { "message_id": 5, "chat": { "id": 9 } }
                }
            }),
        ]);
        let cancel = CancellationToken::new();
        api.cancel_when_drained(cancel.clone());

        bot.run(cancel).await;

        assert_eq!(api.sent()[0].text, "hello");
        assert_eq!(api.sent()[0].chat_id, ChatId(9));
        assert_eq!(api.answered(), vec![("q".to_string(), Some("ok".to_string()))]);
        assert_eq!(api.offsets(), vec![UpdateId(0), UpdateId(3)]);
        assert_eq!(api.close_calls(), 1);
        assert!(api.webhook_drops().is_empty());
    }

    #[tokio::test]
    async fn drop_pending_updates_calls_delete_webhook_first() {
        let (api, bot) = fake_bot();
        let bot = bot.drop_pending_updates(true);
        let cancel = CancellationToken::new();
        api.cancel_when_drained(cancel.clone());

        bot.run(cancel).await;

        assert_eq!(api.webhook_drops(), vec![true]);
        assert_eq!(api.offsets(), vec![UpdateId(0)]);
    }

    #[tokio::test]
    async fn run_polls_even_when_get_me_fails() {
        let (api, bot) = fake_bot();
        api.fail_get_me("Unauthorized");
        let cancel = CancellationToken::new();
        api.cancel_when_drained(cancel.clone());

        bot.run(cancel).await;

        assert_eq!(api.offsets(), vec![UpdateId(0)]);
        assert_eq!(api.close_calls(), 1);
    }

    #[tokio::test]
    async fn cancelled_before_run_skips_polling() {
        let (api, bot) = fake_bot();
        let cancel = CancellationToken::new();
        cancel.cancel();

        bot.run(cancel).await;

        assert!(api.offsets().is_empty());
        assert_eq!(api.open_calls(), 0);
        assert_eq!(api.close_calls(), 1);
    }

    fn cancel_soon(cancel: &CancellationToken) {
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
    }

    #[tokio::test]
    async fn cancel_interrupts_a_hanging_get_me() {
        let (api, bot) = fake_bot();
        api.stall_get_me();
        let cancel = CancellationToken::new();
        cancel_soon(&cancel);

        tokio::time::timeout(Duration::from_secs(5), bot.run(cancel))
            .await
            .expect("run should stop once cancelled");

        assert!(api.offsets().is_empty());
        assert_eq!(api.close_calls(), 1);
    }

    #[tokio::test]
    async fn cancel_interrupts_a_hanging_delete_webhook() {
        let (api, bot) = fake_bot();
        let bot = bot.drop_pending_updates(true);
        api.stall_delete_webhook();
        let cancel = CancellationToken::new();
        cancel_soon(&cancel);

        tokio::time::timeout(Duration::from_secs(5), bot.run(cancel))
            .await
            .expect("run should stop once cancelled");

        assert_eq!(api.webhook_drops(), vec![true]);
        assert!(api.offsets().is_empty());
        assert_eq!(api.close_calls(), 1);
    }

    #[tokio::test]
    async fn config_carries_policy_into_the_loop() {
        let api = Arc::new(FakeApi::default());
        let log = CallbackLog::default();
        let mut bot = Bot::with_api(api.clone())
            .poll_interval(Duration::from_millis(1))
            .callback_batch_policy(CallbackBatchPolicy::ProcessAll);
        bot.register_callback(None, log.handler("any"));
        api.push_batch(vec![
            json!({ "update_id": 1, "callback_query": { "id": "a", "data": "x" } }),
            json!({ "update_id": 2, "callback_query": { "id": "b", "data": "y" } }),
        ]);
        let cancel = CancellationToken::new();
        api.cancel_when_drained(cancel.clone());

        bot.run(cancel).await;

        assert_eq!(log.calls().len(), 2);
        assert_eq!(api.offsets(), vec![UpdateId(0), UpdateId(3)]);
    }

    #[tokio::test]
    async fn outbound_helpers_delegate_to_the_transport() {
        let (api, bot) = fake_bot();
        let sent = bot.send_message(ChatId(4), "hi").await.unwrap();
        bot.delete_message(sent.message_ref()).await.unwrap();

        assert_eq!(api.sent()[0].chat_id, ChatId(4));
        assert_eq!(api.deleted(), vec![sent.message_ref()]);
        assert_eq!(bot.get_me().await.unwrap().username.as_deref(), Some("fake_bot"));
    }
}
