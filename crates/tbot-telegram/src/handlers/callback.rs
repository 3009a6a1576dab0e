use std::{collections::HashMap, sync::Arc};

use tbot_core::{messaging::port::BotApi, update::IncomingCallback};

use super::{CallbackHandler, Dispatch};
use crate::context::CallbackContext;

/// Inline-button dispatch table keyed by the exact callback payload.
#[derive(Default)]
pub struct CallbackTable {
    exact: HashMap<String, Arc<dyn CallbackHandler>>,
    fallback: Option<Arc<dyn CallbackHandler>>,
}

impl CallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` registers the default handler.
    pub fn register<H: CallbackHandler>(&mut self, data: Option<&str>, handler: H) {
        let handler: Arc<dyn CallbackHandler> = Arc::new(handler);
        match data {
            Some(key) => {
                if self.exact.insert(key.to_string(), handler).is_some() {
                    tracing::warn!(data = key, "callback handler replaced");
                }
            }
            None => {
                if self.fallback.replace(handler).is_some() {
                    tracing::warn!("default callback handler replaced");
                }
            }
        }
    }

    pub fn contains(&self, data: &str) -> bool {
        self.exact.contains_key(data)
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

    pub async fn dispatch(&self, callback: IncomingCallback, api: Arc<dyn BotApi>) -> Dispatch {
        let exact = callback
            .data
            .as_deref()
            .and_then(|d| self.exact.get(d).map(|h| (h.clone(), d.to_string())));
        let (handler, outcome) = match exact {
            Some((h, key)) => (h, Dispatch::Exact(key)),
            None => match &self.fallback {
                Some(h) => (h.clone(), Dispatch::Fallback),
                None => {
                    tracing::debug!(
                        callback_id = %callback.id,
                        data = ?callback.data,
                        "no callback handler"
                    );
                    return Dispatch::Unhandled;
                }
            },
        };

        let callback_id = callback.id.clone();
        if let Err(e) = handler.handle(CallbackContext::new(callback, api)).await {
            tracing::warn!(callback_id = %callback_id, error = %e, "callback handler failed");
        }
        outcome
    }
}
