//! Command replies and the text and document message handlers.

use crate::bot::{TelegramDocument, TelegramProgress};
use crate::pipeline::{self, RequestOutcome};
use crate::runner::AppContext;
use crate::utils::truncate_str;
use anyhow::Result;
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::info;

/// Greeting sent on /start
pub const WELCOME_TEXT: &str = "Hello! 👋\n\n\
     I summarize texts with DeepSeek AI.\n\n\
     I can help you with:\n\
     📝 Summarizing text messages\n\
     📄 Summarizing PDF files\n\
     📋 Summarizing Word (DOCX) files\n\n\
     How to use me:\n\
     1️⃣ Send me a text and I will summarize it\n\
     2️⃣ Send me a PDF or Word file and I will extract the text and summarize it\n\n\
     Give it a try! 🚀";

/// Usage notes sent on /help
pub const HELP_TEXT: &str = "📖 Help: how to use the bot\n\n\
     ✅ To summarize a text:\n   \
     - send the text directly in a message\n\n\
     ✅ To summarize a PDF file:\n   \
     - send the file as an attachment (PDF)\n\n\
     ✅ To summarize a Word file:\n   \
     - send the file as an attachment (DOCX)\n\n\
     ⚠️ Notes:\n\
     - make sure the text or file contains readable content\n\
     - legacy .doc files are not supported, convert them to .docx first\n\
     - summarizing may take a few seconds depending on the length\n\n\
     Use /help to see this message again.";

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Show the welcome message.")]
    Start,
    /// Show usage instructions
    #[command(description = "Explain how to use the bot.")]
    Help,
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

fn get_user_name(msg: &Message) -> String {
    if let Some(ref user) = msg.from {
        if let Some(ref username) = user.username {
            return username.clone();
        }
        if !user.first_name.is_empty() {
            return user.first_name.clone();
        }
    }
    "Unknown".to_string()
}

/// Handle the /start command
///
/// # Errors
///
/// Returns an error if the message fails to send.
pub async fn start(bot: &Bot, msg: &Message) -> Result<()> {
    info!(
        "User {} ({}) initiated /start command.",
        get_user_id_safe(msg),
        get_user_name(msg)
    );
    bot.send_message(msg.chat.id, WELCOME_TEXT).await?;
    Ok(())
}

/// Handle the /help command
///
/// # Errors
///
/// Returns an error if the message fails to send.
pub async fn help(bot: &Bot, msg: &Message) -> Result<()> {
    info!("User {} requested /help.", get_user_id_safe(msg));
    bot.send_message(msg.chat.id, HELP_TEXT).await?;
    Ok(())
}

/// Summarize a plain text message.
///
/// Every pipeline failure is reported to the chat by the progress sink, so
/// there is nothing left for the caller to handle.
pub async fn handle_text(bot: &Bot, msg: &Message, ctx: &AppContext) {
    let text = msg.text().unwrap_or_default();
    let user_id = get_user_id_safe(msg);
    info!(
        "Handling text from user {user_id} ({}). Text: '{}'",
        get_user_name(msg),
        truncate_str(text, 100)
    );

    let sink = TelegramProgress::new(bot.clone(), msg.chat.id);
    let outcome = pipeline::handle_text(text, ctx.summarizer.as_ref(), &sink).await;
    log_outcome(user_id, &outcome);
}

/// Summarize a document attachment.
///
/// Failures are reported to the chat the same way as for [`handle_text`].
pub async fn handle_document(bot: &Bot, msg: &Message, ctx: &AppContext) {
    let Some(document) = msg.document() else {
        return;
    };
    let user_id = get_user_id_safe(msg);
    info!(
        file_name = ?document.file_name,
        mime_type = ?document.mime_type,
        size = document.file.size,
        "Handling document from user {user_id} ({})",
        get_user_name(msg)
    );

    let source = TelegramDocument::new(bot.clone(), document.clone());
    let sink = TelegramProgress::new(bot.clone(), msg.chat.id);
    let outcome = pipeline::handle_document(&source, ctx.summarizer.as_ref(), &sink).await;
    log_outcome(user_id, &outcome);
}

fn log_outcome(user_id: i64, outcome: &RequestOutcome) {
    match outcome {
        Ok(summary) => info!(
            summary_chars = summary.chars().count(),
            "Summary delivered to user {user_id}"
        ),
        Err(failure) => info!(?failure, "Request from user {user_id} ended without a summary"),
    }
}
