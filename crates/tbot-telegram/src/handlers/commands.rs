use std::{collections::HashMap, sync::Arc};

use tbot_core::{
    command::{command_key, CommandInvocation, CommandRoute},
    messaging::port::BotApi,
    update::IncomingMessage,
};

use super::{CommandHandler, Dispatch};
use crate::context::MessageContext;

/// Text-command dispatch table: exact first-token keys plus an optional default.
#[derive(Default)]
pub struct CommandTable {
    exact: HashMap<String, Arc<dyn CommandHandler>>,
    fallback: Option<Arc<dyn CommandHandler>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under every key of `route` and return those keys.
    ///
    /// A fallback route installs the default handler. Re-registering a key
    /// replaces the earlier handler.
    pub fn register<H: CommandHandler>(&mut self, route: &CommandRoute, handler: H) -> Vec<String> {
        let handler: Arc<dyn CommandHandler> = Arc::new(handler);
        if route.is_fallback() {
            if self.fallback.replace(handler).is_some() {
                tracing::warn!("default command handler replaced");
            }
            return Vec::new();
        }

        let keys = route.keys();
        for key in &keys {
            if self.exact.insert(key.clone(), handler.clone()).is_some() {
                tracing::warn!(key = %key, "command handler replaced");
            }
        }
        keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.exact.contains_key(key)
    }

    pub fn has_default(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.fallback.is_none()
    }

    /// Route one message to at most one handler.
    ///
    /// Handler errors are logged and swallowed.
    pub async fn dispatch(&self, message: IncomingMessage, api: Arc<dyn BotApi>) -> Dispatch {
        let key = command_key(&message.text).to_string();
        let (handler, outcome) = match self.exact.get(&key) {
            Some(h) => (h.clone(), Dispatch::Exact(key.clone())),
            None => match &self.fallback {
                Some(h) => (h.clone(), Dispatch::Fallback),
                None => {
                    tracing::debug!(key = %key, chat_id = message.chat.id.0, "no command handler");
                    return Dispatch::Unhandled;
                }
            },
        };

        let invocation = CommandInvocation::parse(&message.text);
        let chat_id = message.chat.id.0;
        let ctx = MessageContext::new(message, api);
        if let Err(e) = handler.handle(ctx, invocation).await {
            tracing::warn!(key = %key, chat_id, error = %e, "command handler failed");
        }
        outcome
    }
}
