//! Handler contracts and the two dispatch tables.
//!
//! Every command handler has the same shape, `(MessageContext, CommandInvocation)`;
//! handlers that do not care about arguments simply ignore the second value.
//! Plain `async fn`s and closures returning futures implement the traits
//! through the blanket impls below.

use std::future::Future;

use async_trait::async_trait;

use tbot_core::command::CommandInvocation;

use crate::context::{CallbackContext, MessageContext};

pub mod callback;
pub mod commands;

pub use callback::CallbackTable;
pub use commands::CommandTable;

/// Handler outcome. Errors are logged by the dispatcher and never stop polling.
pub type HandlerResult = anyhow::Result<()>;

/// Which table entry served an update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Exact key match.
    Exact(String),
    /// No key matched; the default handler ran.
    Fallback,
    /// No key matched and no default handler is registered; the update was dropped.
    Unhandled,
}

impl Dispatch {
    pub fn was_handled(&self) -> bool {
        !matches!(self, Dispatch::Unhandled)
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    async fn handle(&self, ctx: MessageContext, invocation: CommandInvocation) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(MessageContext, CommandInvocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: MessageContext, invocation: CommandInvocation) -> HandlerResult {
        (self)(ctx, invocation).await
    }
}

#[async_trait]
pub trait CallbackHandler: Send + Sync + 'static {
    async fn handle(&self, ctx: CallbackContext) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> CallbackHandler for F
where
    F: Fn(CallbackContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: CallbackContext) -> HandlerResult {
        (self)(ctx).await
    }
}
