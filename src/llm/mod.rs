//! Summarization backend
//!
//! Sends text to a remote chat completion API and maps every transport or
//! HTTP outcome onto a [`SummarizationError`] kind.

/// `DeepSeek` chat completion client
pub mod deepseek;
mod http_utils;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use deepseek::DeepSeekSummarizer;

/// Reasons a summarization call can fail
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SummarizationError {
    /// The call did not complete within the fixed timeout
    #[error("request timed out")]
    Timeout,
    /// The API rejected the key (HTTP 401)
    #[error("authentication failed (HTTP 401)")]
    AuthError,
    /// Too many requests (HTTP 429)
    #[error("rate limit exceeded (HTTP 429)")]
    RateLimited,
    /// Any other non-success HTTP status
    #[error("service error (HTTP {0})")]
    ServiceError(u16),
    /// DNS failure, refused or unreachable connection
    #[error("network error: {0}")]
    NetworkError(String),
    /// The response body did not carry `choices[0].message.content`
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// Anything that does not fit the kinds above
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Result of a single summarization attempt
pub type SummarizationOutcome = Result<String, SummarizationError>;

/// A message in a chat completion request
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    /// Role of the message sender (system, user)
    pub role: String,
    /// Text content of the message
    pub content: String,
}

impl Message {
    /// Create a new system message
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    /// Create a new user message
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Interface for summarization backends
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text` in a single attempt. Never retries.
    async fn summarize(&self, text: &str) -> SummarizationOutcome;
}
