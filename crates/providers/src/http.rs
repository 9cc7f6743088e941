//! Shared HTTP plumbing for backends: status checking, rate-limit
//! detection and transport error mapping.

use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;

use crate::error::ProviderError;

/// Body fragments that identify a quota or rate-limit response even when
/// the status code is not 429.
const QUOTA_MARKERS: &[&str] = &["RESOURCE_EXHAUSTED", "quota", "rate limit", "rate_limit"];

/// Longest response body excerpt kept in an error message.
const MAX_BODY_EXCERPT: usize = 500;

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or a classified [`ProviderError`] carrying the
/// status and (truncated) body text on failure.
pub async fn ensure_success(
    response: reqwest::Response,
    provider: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());

    Err(classify_failure(status, retry_after_secs, &body, provider))
}

/// Parse a successful JSON response body into the expected type.
pub async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    provider: &str,
) -> Result<T, ProviderError> {
    let response = ensure_success(response, provider).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::provider(provider, format!("Invalid response body: {e}")))
}

/// Map a failed HTTP exchange to a provider error.
pub fn classify_failure(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: &str,
    provider: &str,
) -> ProviderError {
    let excerpt = excerpt(body);
    let quota = QUOTA_MARKERS
        .iter()
        .any(|m| body.to_lowercase().contains(&m.to_lowercase()));

    if status == StatusCode::TOO_MANY_REQUESTS || quota {
        return ProviderError::RateLimited {
            provider: provider.to_string(),
            retry_after_secs,
            message: format!("HTTP {}: {excerpt}", status.as_u16()),
        };
    }
    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        return ProviderError::Timeout(format!("{provider} returned HTTP {}", status.as_u16()));
    }
    ProviderError::provider(provider, format!("HTTP {}: {excerpt}", status.as_u16()))
}

/// Map a transport-level reqwest error.
pub fn transport_error(err: reqwest::Error, provider: &str) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(format!("{provider} did not respond in time"))
    } else {
        ProviderError::provider(provider, format!("HTTP request failed: {err}"))
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_EXCERPT {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX_BODY_EXCERPT).collect();
        format!("{cut}...")
    }
}
