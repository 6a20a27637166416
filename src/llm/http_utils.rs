//! HTTP utilities for the completion API
//!
//! Sends JSON requests and maps transport failures and status codes onto
//! [`SummarizationError`] kinds.

use crate::llm::SummarizationError;
use crate::utils::truncate_str;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Creates an HTTP client whose every request is bounded by `timeout`.
#[must_use]
pub fn create_http_client(timeout: Duration) -> HttpClient {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// Sends an HTTP POST request with JSON body and returns parsed JSON response.
///
/// The request carries its own `timeout` so a fallback client without one is
/// still bounded.
///
/// # Errors
///
/// Failure kinds are decided in this order: timeout, HTTP 401, HTTP 429,
/// other non-success status, connection failure, undecodable body, anything
/// else.
pub async fn send_json_request(
    client: &HttpClient,
    url: &str,
    body: &Value,
    auth_header: &str,
    timeout: Duration,
) -> Result<Value, SummarizationError> {
    let response = client
        .post(url)
        .timeout(timeout)
        .header("Authorization", auth_header)
        .json(body)
        .send()
        .await
        .map_err(map_transport_error)?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        warn!(
            status = status.as_u16(),
            body = %truncate_str(error_text.trim(), 500),
            "Completion API returned an error status"
        );
        return Err(map_status(status));
    }

    let text = response.text().await.map_err(map_transport_error)?;
    serde_json::from_str(&text).map_err(|e| SummarizationError::MalformedResponse(e.to_string()))
}

/// Maps a non-success status code onto a failure kind.
#[must_use]
pub fn map_status(status: StatusCode) -> SummarizationError {
    match status {
        StatusCode::UNAUTHORIZED => SummarizationError::AuthError,
        StatusCode::TOO_MANY_REQUESTS => SummarizationError::RateLimited,
        other => SummarizationError::ServiceError(other.as_u16()),
    }
}

fn map_transport_error(err: reqwest::Error) -> SummarizationError {
    if err.is_timeout() {
        return SummarizationError::Timeout;
    }
    if err.is_connect() {
        return SummarizationError::NetworkError(err.to_string());
    }
    if err.is_decode() {
        return SummarizationError::MalformedResponse(err.to_string());
    }
    SummarizationError::Unknown(err.to_string())
}

/// Extracts text content from a JSON response by navigating a path.
///
/// # Example
/// ```ignore
/// let content = extract_text_content(&response, &["choices", "0", "message", "content"])?;
/// ```
///
/// # Errors
///
/// Returns `SummarizationError::MalformedResponse` if the path is missing or
/// the target is not a string.
pub fn extract_text_content(response: &Value, path: &[&str]) -> Result<String, SummarizationError> {
    let mut current = response;

    for segment in path {
        if let Ok(index) = segment.parse::<usize>() {
            current = current.get(index).ok_or_else(|| {
                SummarizationError::MalformedResponse(format!("missing index {index}"))
            })?;
        } else {
            current = current.get(*segment).ok_or_else(|| {
                SummarizationError::MalformedResponse(format!("missing key {segment}"))
            })?;
        }
    }

    current.as_str().map(ToString::to_string).ok_or_else(|| {
        SummarizationError::MalformedResponse(format!("expected string at path, got: {current}"))
    })
}
