//! Configuration and settings management
//!
//! Loads settings from environment variables and defines the fixed
//! summarization constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    #[serde(default)]
    pub telegram_bot_token: String,

    /// `DeepSeek` API key
    #[serde(default)]
    pub deepseek_api_key: String,

    /// Public base URL for webhook delivery. Polling is used when unset.
    pub webhook_url: Option<String>,

    /// Port the webhook listener binds to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Chat completions endpoint
    #[serde(default = "default_api_url")]
    pub deepseek_api_url: String,

    /// Model identifier sent with every completion request
    #[serde(default = "default_model")]
    pub deepseek_model: String,
}

const fn default_port() -> u16 {
    8000
}

fn default_api_url() -> String {
    DEEPSEEK_API_URL.to_string()
}

fn default_model() -> String {
    DEEPSEEK_MODEL.to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use deepseek_summarizer::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or if the bot token or the
    /// API key is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // Eg.. `APP__PORT=9000 ./target/app` would set the `port` key
            .add_source(Environment::with_prefix("APP").separator("__"))
            // UPPER_SNAKE_CASE variables map onto snake_case keys; empty ones count as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let settings: Self = s.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every required secret is present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` naming the first missing variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_bot_token.trim().is_empty() {
            return Err(ConfigError::NotFound("TELEGRAM_BOT_TOKEN".to_string()));
        }
        if self.deepseek_api_key.trim().is_empty() {
            return Err(ConfigError::NotFound("DEEPSEEK_API_KEY".to_string()));
        }
        Ok(())
    }

    /// Webhook address registered with Telegram, if webhook mode is configured.
    #[must_use]
    pub fn webhook_endpoint(&self) -> Option<String> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| format!("{}/webhook", url.trim_end_matches('/')))
    }
}

/// Default chat completions endpoint
pub const DEEPSEEK_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";
/// Default model for summarization
pub const DEEPSEEK_MODEL: &str = "deepseek-chat";

/// System instruction sent with every summarization request
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are an assistant specialized in summarizing texts. \
     Summarize the given text clearly and concisely.";
/// Sampling temperature for summarization
pub const SUMMARY_TEMPERATURE: f64 = 0.7;
/// Upper bound on generated tokens
pub const SUMMARY_MAX_TOKENS: u32 = 2000;
/// Single-attempt timeout for the completion call
pub const SUMMARY_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimum number of characters (after trimming) worth summarizing
pub const MIN_TEXT_CHARS: usize = 10;

/// Largest document the Bot API lets a bot download (20 MB)
pub const MAX_DOCUMENT_BYTES: u64 = 20 * 1024 * 1024;
/// Largest uncompressed `word/document.xml` read from a DOCX archive
pub const MAX_DOCX_XML_BYTES: u64 = 64 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn settings() -> Settings {
        Settings {
            telegram_bot_token: "123:abc".to_string(),
            deepseek_api_key: "sk-test".to_string(),
            webhook_url: None,
            port: default_port(),
            deepseek_api_url: default_api_url(),
            deepseek_model: default_model(),
        }
    }

    // Runs sequentially in one test to avoid environment variable races
    #[test]
    fn test_config_env_loading() -> Result<(), Box<dyn std::error::Error>> {
        // 1. Both secrets present
        env::set_var("TELEGRAM_BOT_TOKEN", "dummy_token");
        env::set_var("DEEPSEEK_API_KEY", "dummy_key");

        let settings = Settings::new()?;
        assert_eq!(settings.telegram_bot_token, "dummy_token");
        assert_eq!(settings.deepseek_api_key, "dummy_key");
        assert_eq!(settings.deepseek_api_url, DEEPSEEK_API_URL);
        assert_eq!(settings.deepseek_model, DEEPSEEK_MODEL);

        // 2. Empty API key is treated as missing
        env::set_var("DEEPSEEK_API_KEY", "");
        match Settings::new() {
            Err(ConfigError::NotFound(name)) => assert_eq!(name, "DEEPSEEK_API_KEY"),
            other => panic!("expected missing key error, got {other:?}"),
        }

        // 3. Missing bot token
        env::remove_var("TELEGRAM_BOT_TOKEN");
        env::set_var("DEEPSEEK_API_KEY", "dummy_key");
        match Settings::new() {
            Err(ConfigError::NotFound(name)) => assert_eq!(name, "TELEGRAM_BOT_TOKEN"),
            other => panic!("expected missing token error, got {other:?}"),
        }

        env::remove_var("DEEPSEEK_API_KEY");
        Ok(())
    }

    #[test]
    fn test_webhook_endpoint() {
        let mut settings = settings();
        assert_eq!(settings.webhook_endpoint(), None);

        settings.webhook_url = Some("   ".to_string());
        assert_eq!(settings.webhook_endpoint(), None);

        settings.webhook_url = Some("https://bot.example.com/".to_string());
        assert_eq!(
            settings.webhook_endpoint().as_deref(),
            Some("https://bot.example.com/webhook")
        );
    }

    #[test]
    fn test_validate_rejects_blank_token() {
        let mut settings = settings();
        assert!(settings.validate().is_ok());

        settings.telegram_bot_token = "  ".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::NotFound(name)) if name == "TELEGRAM_BOT_TOKEN"
        ));
    }
}
