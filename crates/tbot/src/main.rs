use anyhow::Context;

use tbot_core::{
    command::{CommandInvocation, CommandRoute},
    config::Config,
    formatting::{bold, escape_html},
    messaging::types::InlineKeyboard,
};
use tbot_telegram::{Bot, CallbackContext, HandlerResult, MessageContext};

async fn start(ctx: MessageContext, _inv: CommandInvocation) -> HandlerResult {
    let name = escape_html(&ctx.from().full_name);
    ctx.answer(format!(
        "Hi {}! Send me anything and I will echo it back. Try /menu.",
        bold(&name)
    ))
    .await?;
    Ok(())
}

async fn menu(ctx: MessageContext, _inv: CommandInvocation) -> HandlerResult {
    let keyboard = InlineKeyboard::one_per_row([("Yes", "vote:yes"), ("No", "vote:no")]);
    ctx.answer_with_keyboard("Do you like Rust?", keyboard).await?;
    Ok(())
}

async fn echo(ctx: MessageContext, inv: CommandInvocation) -> HandlerResult {
    if ctx.text().is_empty() {
        return Ok(());
    }
    tracing::debug!(chat_id = ctx.chat_id().0, command = %inv.command, "echo");
    ctx.reply(escape_html(ctx.text())).await?;
    Ok(())
}

async fn vote(ctx: CallbackContext) -> HandlerResult {
    let choice = ctx.data().unwrap_or_default().trim_start_matches("vote:");
    ctx.answer(Some("Vote counted")).await?;
    ctx.message
        .edit_text(format!("You voted {}", bold(choice)))
        .await?;
    Ok(())
}

async fn unknown_button(ctx: CallbackContext) -> HandlerResult {
    ctx.answer(Some("This button is no longer active")).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tbot_core::logging::init("tbot")?;

    let cfg = Config::load().context("failed to load configuration")?;
    let mut bot = Bot::from_config(&cfg);

    bot.register_command(CommandRoute::command("start").with_prefixes(["/", "!"]), start);
    bot.register_command(CommandRoute::command("/menu").with_aliases(["/poll"]), menu);
    bot.default_command(echo)
        .callback("vote:yes", vote)
        .callback("vote:no", vote)
        .default_callback(unknown_button);

    bot.run_until_ctrl_c().await;
    Ok(())
}
