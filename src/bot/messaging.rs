//! Delivery of long, formatted messages.

use crate::utils;
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use tracing::warn;

/// Maximum message length for Telegram with safety margin.
/// Telegram's official limit is 4096, but we use 4000 to account for
/// HTML tags and other formatting that may be added.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

/// Sends a long message by splitting it into multiple parts.
///
/// The raw Markdown is split first so code fences stay balanced, then each
/// part is converted to HTML and sent on its own. A part Telegram refuses
/// as HTML is sent again as plain text.
///
/// # Errors
///
/// Returns an error if any message fails to send.
pub async fn send_long_message(bot: &Bot, chat_id: ChatId, text: &str) -> Result<()> {
    for part in utils::split_long_message(text, TELEGRAM_MESSAGE_LIMIT) {
        let formatted = utils::format_text(&part);
        if let Err(e) = bot
            .send_message(chat_id, formatted)
            .parse_mode(ParseMode::Html)
            .await
        {
            warn!("HTML delivery failed, resending as plain text: {e}");
            bot.send_message(chat_id, part).await?;
        }
    }
    Ok(())
}
