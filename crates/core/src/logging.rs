//! Logging policy shared by the pipeline and the HTTP layer.
//!
//! The policy is injected, not global: whoever builds the pipeline decides
//! whether user content (character names, scene text, prompts) may appear
//! in log records. In production it never does.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Placeholder written in place of user content under
/// [`LogPolicy::Production`].
pub const REDACTED: &str = "[redacted]";

/// Verbosity switch for log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogPolicy {
    /// JSON logs, no user content.
    Production,
    /// Human-readable logs; user content allowed at `debug` level.
    #[default]
    Development,
}

impl LogPolicy {
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Return `content` when it may be logged, [`REDACTED`] otherwise.
    pub fn content<'a>(self, content: &'a str) -> &'a str {
        match self {
            Self::Production => REDACTED,
            Self::Development => content,
        }
    }
}

impl FromStr for LogPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(CoreError::Config(format!(
                "Invalid LOG_MODE '{other}'. Must be one of: production, development"
            ))),
        }
    }
}
