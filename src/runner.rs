//! Bot startup: shared context, dispatcher wiring and the update listener.

use crate::bot::handlers::{self, Command};
use crate::config::Settings;
use crate::llm::{DeepSeekSummarizer, Summarizer};
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tracing::{error, info};

/// Reply sent when a handler fails unexpectedly
pub const GENERIC_ERROR_TEXT: &str =
    "❌ Sorry, an error occurred while processing your request. Please try again.";

/// Shared state handed to every handler.
///
/// Built once at startup, injected into the dispatcher and dropped when
/// dispatching stops.
pub struct AppContext {
    /// Loaded settings
    pub settings: Settings,
    /// Completion client used for every request
    pub summarizer: Arc<dyn Summarizer>,
}

impl AppContext {
    /// Build the context with the `DeepSeek` client configured by `settings`
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let summarizer = Arc::new(DeepSeekSummarizer::from_settings(&settings));
        Self::with_summarizer(settings, summarizer)
    }

    /// Build the context around an existing summarizer
    #[must_use]
    pub fn with_summarizer(settings: Settings, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            settings,
            summarizer,
        }
    }
}

/// Run the Telegram bot until ctrl-c.
///
/// Uses a webhook when one is configured and long polling otherwise.
///
/// # Errors
///
/// Returns an error if the webhook URL is invalid or the webhook listener
/// cannot be set up.
pub async fn run_bot(settings: Settings) -> Result<()> {
    let bot = Bot::new(settings.telegram_bot_token.clone());
    let webhook = settings.webhook_endpoint();
    let port = settings.port;

    let context = Arc::new(AppContext::new(settings));
    info!(
        model = %context.settings.deepseek_model,
        "Summarizer initialized."
    );

    let mut dispatcher = Dispatcher::builder(bot.clone(), setup_handler())
        .dependencies(dptree::deps![context])
        .enable_ctrlc_handler()
        .build();

    match webhook {
        Some(endpoint) => {
            let url = reqwest::Url::parse(&endpoint)?;
            let address = SocketAddr::from(([0, 0, 0, 0], port));
            info!("Bot is running with webhook {endpoint} on {address}...");
            let listener = webhooks::axum(bot, webhooks::Options::new(address, url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            info!("Bot is running with long polling...");
            dispatcher.dispatch().await;
        }
    }

    info!("Bot stopped.");
    Ok(())
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::filter(|msg: Message| msg.document().is_some()).endpoint(handle_document))
        .branch(
            // Unknown commands are ignored
            dptree::filter(|msg: Message| msg.text().is_some_and(|t| !t.starts_with('/')))
                .endpoint(handle_text),
        )
}

async fn report_failure(bot: &Bot, msg: &Message, handler: &str, e: &anyhow::Error) {
    error!("{handler} handler error: {e:#}");
    if let Err(e) = bot.send_message(msg.chat.id, GENERIC_ERROR_TEXT).await {
        error!("Failed to send error notice to chat {}: {}", msg.chat.id, e);
    }
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(&bot, &msg).await,
        Command::Help => handlers::help(&bot, &msg).await,
    };
    if let Err(e) = res {
        report_failure(&bot, &msg, "Command", &e).await;
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    context: Arc<AppContext>,
) -> Result<(), teloxide::RequestError> {
    handlers::handle_text(&bot, &msg, &context).await;
    respond(())
}

async fn handle_document(
    bot: Bot,
    msg: Message,
    context: Arc<AppContext>,
) -> Result<(), teloxide::RequestError> {
    handlers::handle_document(&bot, &msg, &context).await;
    respond(())
}
