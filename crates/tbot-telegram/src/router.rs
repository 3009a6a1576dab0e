//! Long-poll loop: fetch, route, advance the offset, sleep.

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use tbot_core::{
    config::CallbackBatchPolicy,
    domain::UpdateId,
    messaging::port::BotApi,
    update::{parse_update, peek_update_id, UpdateKind},
    ApiResult,
};

use crate::handlers::{CallbackTable, CommandTable};

/// Counters for one routed batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub messages: usize,
    pub callbacks: usize,
    pub unknown: usize,
    pub dead_lettered: usize,
    /// Left for the next cycle by [`CallbackBatchPolicy::StopAfterCallback`].
    pub deferred: usize,
}

/// Owns the offset cursor and both dispatch tables.
pub struct Router {
    api: Arc<dyn BotApi>,
    commands: CommandTable,
    callbacks: CallbackTable,
    policy: CallbackBatchPolicy,
    offset: UpdateId,
}

impl Router {
    pub fn new(
        api: Arc<dyn BotApi>,
        commands: CommandTable,
        callbacks: CallbackTable,
        policy: CallbackBatchPolicy,
    ) -> Self {
        Self {
            api,
            commands,
            callbacks,
            policy,
            offset: UpdateId::default(),
        }
    }

    /// Id of the next update to request.
    pub fn offset(&self) -> UpdateId {
        self.offset
    }

    pub fn api(&self) -> &Arc<dyn BotApi> {
        &self.api
    }

    fn advance(&mut self, id: UpdateId) {
        self.offset = self.offset.max(id.next());
    }

    /// One fetch-and-route cycle without the sleep.
    pub async fn poll_once(&mut self) -> ApiResult<BatchReport> {
        let batch = self.api.get_updates(self.offset).await?;
        Ok(self.route_batch(batch).await)
    }

    /// Route a fetched batch in order, advancing the offset per update.
    pub async fn route_batch(&mut self, batch: Vec<Value>) -> BatchReport {
        let mut report = BatchReport {
            received: batch.len(),
            ..BatchReport::default()
        };

        for (idx, raw) in batch.iter().enumerate() {
            let update = match parse_update(raw) {
                Ok(u) => u,
                Err(e) => {
                    report.dead_lettered += 1;
                    let update_id = peek_update_id(raw);
                    tracing::warn!(
                        update_id = ?update_id.map(|u| u.0),
                        error = %e,
                        "dead-lettered update"
                    );
                    if let Some(id) = update_id {
                        self.advance(id);
                    }
                    continue;
                }
            };

            match update.kind {
                UpdateKind::Message(message) => {
                    report.messages += 1;
                    self.advance(update.id);
                    self.commands.dispatch(message, self.api.clone()).await;
                }
                UpdateKind::Callback(callback) => {
                    report.callbacks += 1;
                    self.callbacks.dispatch(callback, self.api.clone()).await;
                    self.advance(update.id);
                    if self.policy == CallbackBatchPolicy::StopAfterCallback {
                        report.deferred = batch.len() - idx - 1;
                        if report.deferred > 0 {
                            tracing::debug!(
                                deferred = report.deferred,
                                "stopping batch after callback"
                            );
                        }
                        break;
                    }
                }
                UpdateKind::Unknown(kind) => {
                    report.unknown += 1;
                    tracing::debug!(
                        update_id = update.id.0,
                        kind = %kind,
                        "skipping unsupported update"
                    );
                    self.advance(update.id);
                }
            }
        }

        report
    }
}

/// Poll until `cancel` fires, then close the transport session.
///
/// Cancellation is observed while fetching and while sleeping; a handler that
/// is already running finishes first.
pub async fn run_polling(router: &mut Router, interval: Duration, cancel: &CancellationToken) {
    let api = router.api.clone();
    if let Err(e) = api.open().await {
        tracing::error!(error = %e.error, "failed to open session; will retry on first request");
    }

    loop {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            res = api.get_updates(router.offset) => res,
        };

        match fetched {
            Ok(batch) if batch.is_empty() => {}
            Ok(batch) => {
                let report = router.route_batch(batch).await;
                tracing::debug!(?report, offset = router.offset.0, "batch routed");
            }
            Err(e) => {
                tracing::error!(offset = router.offset.0, error = %e.error, "getUpdates failed");
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    api.close().await;
    tracing::info!(offset = router.offset.0, "poll stopped");
}
