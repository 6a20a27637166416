//! Telegram implementations of the pipeline's progress sink and document
//! source.

use crate::bot::messaging::send_long_message;
use crate::pipeline::compose::{ProgressEvent, Stage};
use crate::pipeline::{DocumentSource, ProgressSink};
use anyhow::Result;
use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, Document};
use tracing::debug;

/// Delivers progress events to one chat
pub struct TelegramProgress {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramProgress {
    /// Create a sink for the given chat
    #[must_use]
    pub const fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl ProgressSink for TelegramProgress {
    async fn emit(&self, event: ProgressEvent) -> Result<()> {
        match event.stage {
            // Shown as "typing..." instead of a message
            Stage::Validating => {
                self.bot
                    .send_chat_action(self.chat_id, ChatAction::Typing)
                    .await?;
            }
            Stage::Done => send_long_message(&self.bot, self.chat_id, &event.message).await?,
            Stage::Summarizing => {
                self.bot.send_message(self.chat_id, event.message).await?;
                self.bot
                    .send_chat_action(self.chat_id, ChatAction::Typing)
                    .await?;
            }
            Stage::Downloading | Stage::Extracting | Stage::Failed => {
                self.bot.send_message(self.chat_id, event.message).await?;
            }
        }
        Ok(())
    }
}

/// A document attached to a Telegram message
pub struct TelegramDocument {
    bot: Bot,
    document: Document,
}

impl TelegramDocument {
    /// Wrap an attachment; nothing is downloaded until requested
    #[must_use]
    pub const fn new(bot: Bot, document: Document) -> Self {
        Self { bot, document }
    }
}

#[async_trait]
impl DocumentSource for TelegramDocument {
    fn file_name(&self) -> Option<&str> {
        self.document.file_name.as_deref()
    }

    fn size(&self) -> u64 {
        u64::from(self.document.file.size)
    }

    async fn download(&self) -> Result<Vec<u8>> {
        let file = self.bot.get_file(self.document.file.id.clone()).await?;
        let mut buf = Vec::new();
        self.bot.download_file(&file.path, &mut buf).await?;
        debug!(path = %file.path, bytes = buf.len(), "Downloaded document from Telegram");
        Ok(buf)
    }
}
