use super::http_utils::{create_http_client, extract_text_content, send_json_request};
use super::{Message, SummarizationOutcome, Summarizer};
use crate::config::{
    Settings, SUMMARY_MAX_TOKENS, SUMMARY_SYSTEM_PROMPT, SUMMARY_TEMPERATURE, SUMMARY_TIMEOUT,
};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Request body for the chat completions endpoint
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
}

/// Summarizer backed by the `DeepSeek` chat completions API
pub struct DeepSeekSummarizer {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
    timeout: Duration,
}

impl DeepSeekSummarizer {
    /// Create a new client for the given endpoint and model
    #[must_use]
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: create_http_client(SUMMARY_TIMEOUT),
            api_key,
            api_url,
            model,
            timeout: SUMMARY_TIMEOUT,
        }
    }

    /// Create a client from loaded settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.deepseek_api_key.clone(),
            settings.deepseek_api_url.clone(),
            settings.deepseek_model.clone(),
        )
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_client = create_http_client(timeout);
        self.timeout = timeout;
        self
    }

    fn build_request(&self, text: &str) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(CompletionRequest {
            model: &self.model,
            messages: vec![Message::system(SUMMARY_SYSTEM_PROMPT), Message::user(text)],
            temperature: SUMMARY_TEMPERATURE,
            max_tokens: SUMMARY_MAX_TOKENS,
        })
    }
}

#[async_trait]
impl Summarizer for DeepSeekSummarizer {
    #[instrument(skip_all, fields(model = %self.model, chars = text.chars().count()))]
    async fn summarize(&self, text: &str) -> SummarizationOutcome {
        let body = self
            .build_request(text)
            .map_err(|e| super::SummarizationError::Unknown(e.to_string()))?;

        debug!("Sending summarization request");
        let auth = format!("Bearer {}", self.api_key);
        let response = send_json_request(&self.http_client, &self.api_url, &body, &auth, self.timeout)
            .await
            .inspect_err(|e| warn!("Summarization failed: {e}"))?;

        let summary = extract_text_content(&response, &["choices", "0", "message", "content"])
            .inspect_err(|e| warn!("Unexpected completion shape: {e}"))?;
        info!(summary_chars = summary.chars().count(), "Summary received");
        Ok(summary)
    }
}
