/// Errors surfaced by the provider adapter layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The backend is not configured or no backend is usable at all.
    #[error("Image provider unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the call because of a rate limit or quota. The
    /// caller may retry later; nothing here retries automatically.
    #[error("Rate limited by {provider}: {message}")]
    RateLimited {
        provider: String,
        /// Seconds suggested by the backend's `Retry-After` header.
        retry_after_secs: Option<u64>,
        message: String,
    },

    /// The call exceeded its wall-clock budget.
    #[error("Generation timed out: {0}")]
    Timeout(String),

    /// Any other backend-side failure.
    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },
}

impl ProviderError {
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// True for errors a caller might resolve by retrying later.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Short machine-readable code for API responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "PROVIDER_UNAVAILABLE",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Timeout(_) => "TIMEOUT",
            Self::Provider { .. } => "PROVIDER_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_rate_limited() {
        let err = ProviderError::RateLimited {
            provider: "text-prompt".into(),
            retry_after_secs: Some(30),
            message: "quota exceeded".into(),
        };
        assert_eq!(err.to_string(), "Rate limited by text-prompt: quota exceeded");
        assert!(err.is_rate_limited());
        assert_eq!(err.code(), "RATE_LIMITED");
    }

    #[test]
    fn display_provider_error() {
        let err = ProviderError::provider("reference-image", "bad request");
        assert_eq!(err.to_string(), "reference-image error: bad request");
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn display_timeout() {
        let err = ProviderError::Timeout("no response after 180s".into());
        assert_eq!(err.to_string(), "Generation timed out: no response after 180s");
    }
}
