use crate::provider::ProviderKind;

/// Default model name sent to the text-prompt backend.
pub const DEFAULT_TEXT_MODEL: &str = "flux-pro";

/// Default model name for the reference-image backend.
pub const DEFAULT_REFERENCE_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Default base URL of the reference-image backend API.
pub const DEFAULT_REFERENCE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default per-HTTP-call timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 170;

/// Settings for the prompt-only backend.
#[derive(Debug, Clone, Default)]
pub struct TextPromptConfig {
    /// Full URL of the generation endpoint.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
}

/// Settings for the reference-image backend.
#[derive(Debug, Clone, Default)]
pub struct ReferenceImageConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

/// Provider layer configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Backend used when a request names none.
    pub default_kind: Option<ProviderKind>,
    /// Whether an unavailable backend may be swapped for another one.
    pub allow_fallback: bool,
    pub http_timeout_secs: u64,
    pub text: TextPromptConfig,
    pub reference: ReferenceImageConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default_kind: None,
            allow_fallback: true,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            text: TextPromptConfig {
                endpoint: None,
                api_key: None,
                model: DEFAULT_TEXT_MODEL.to_string(),
            },
            reference: ReferenceImageConfig {
                base_url: DEFAULT_REFERENCE_BASE_URL.to_string(),
                api_key: None,
                model: DEFAULT_REFERENCE_MODEL.to_string(),
            },
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                              |
    /// |------------------------------|--------------------------------------|
    /// | `IMAGE_PROVIDER`             | unset (first available backend)      |
    /// | `PROVIDER_FALLBACK`          | `true`                               |
    /// | `PROVIDER_HTTP_TIMEOUT_SECS` | `170`                                |
    /// | `TEXT_PROVIDER_URL`          | unset                                |
    /// | `TEXT_PROVIDER_API_KEY`      | unset                                |
    /// | `TEXT_PROVIDER_MODEL`        | `flux-pro`                           |
    /// | `REFERENCE_PROVIDER_URL`     | Generative Language API v1beta       |
    /// | `REFERENCE_PROVIDER_API_KEY` | unset                                |
    /// | `REFERENCE_PROVIDER_MODEL`   | `gemini-2.5-flash-image-preview`     |
    ///
    /// # Panics
    ///
    /// Panics if `IMAGE_PROVIDER` names an unknown backend or a numeric
    /// variable does not parse.
    pub fn from_env() -> Self {
        let default_kind = optional_env("IMAGE_PROVIDER").map(|raw| {
            raw.parse::<ProviderKind>()
                .unwrap_or_else(|e| panic!("IMAGE_PROVIDER is invalid: {e}"))
        });

        let allow_fallback = optional_env("PROVIDER_FALLBACK")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        let http_timeout_secs: u64 = optional_env("PROVIDER_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|| DEFAULT_HTTP_TIMEOUT_SECS.to_string())
            .parse()
            .expect("PROVIDER_HTTP_TIMEOUT_SECS must be a valid u64");

        Self {
            default_kind,
            allow_fallback,
            http_timeout_secs,
            text: TextPromptConfig {
                endpoint: optional_env("TEXT_PROVIDER_URL"),
                api_key: optional_env("TEXT_PROVIDER_API_KEY"),
                model: optional_env("TEXT_PROVIDER_MODEL")
                    .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            },
            reference: ReferenceImageConfig {
                base_url: optional_env("REFERENCE_PROVIDER_URL")
                    .unwrap_or_else(|| DEFAULT_REFERENCE_BASE_URL.to_string()),
                api_key: optional_env("REFERENCE_PROVIDER_API_KEY"),
                model: optional_env("REFERENCE_PROVIDER_MODEL")
                    .unwrap_or_else(|| DEFAULT_REFERENCE_MODEL.to_string()),
            },
        }
    }
}

/// Read an env var, treating blank values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Anything other than an explicit "off" value enables the flag.
fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}
