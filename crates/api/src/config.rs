use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use storyme_core::logging::LogPolicy;
use storyme_core::prompt::DEFAULT_ART_STYLE;
use storyme_core::script::MAX_SCENES;
use storyme_core::subject::KeywordTables;
use storyme_pipeline::orchestrator::{
    PipelineConfig, DEFAULT_PUBLIC_BASE_URL, DEFAULT_SCENE_TIMEOUT_SECS,
};
use storyme_providers::config::ProviderConfig;
use url::Url;

use crate::auth::jwt::JwtConfig;

/// Default HTTP request timeout. Generation routes are exempt from the HTTP
/// timeout and use this value as the batch time budget instead.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 900;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `900`). Also the time
    /// budget of one generation batch.
    pub request_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Public origin of this service; relative image URLs resolve against it.
    pub public_base_url: Url,
    /// Directory generated images are written to and served from.
    pub storage_dir: PathBuf,
    /// Log format and content policy.
    pub log_mode: LogPolicy,
    /// Per-scene provider timeout in seconds (default: `180`).
    pub scene_timeout_secs: u64,
    pub default_art_style: String,
    /// Optional JSON file overriding the subject keyword tables.
    pub subject_keywords_path: Option<PathBuf>,
    pub providers: ProviderConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `900`                      |
    /// | `PUBLIC_BASE_URL`       | `http://localhost:3000`    |
    /// | `STORAGE_DIR`           | `./generated`              |
    /// | `LOG_MODE`              | `development`              |
    /// | `SCENE_TIMEOUT_SECS`    | `180`                      |
    /// | `DEFAULT_ART_STYLE`     | storybook illustration     |
    /// | `SUBJECT_KEYWORDS_PATH` | unset (built-in tables)    |
    ///
    /// JWT and provider variables are documented on [`JwtConfig::from_env`]
    /// and [`ProviderConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.into())
            .parse::<Url>()
            .expect("PUBLIC_BASE_URL must be a valid absolute URL");

        let storage_dir = PathBuf::from(
            std::env::var("STORAGE_DIR").unwrap_or_else(|_| "./generated".into()),
        );

        let log_mode = std::env::var("LOG_MODE")
            .map(|raw| LogPolicy::from_str(&raw).unwrap_or_else(|e| panic!("{e}")))
            .unwrap_or_default();

        let scene_timeout_secs: u64 = std::env::var("SCENE_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_SCENE_TIMEOUT_SECS.to_string())
            .parse()
            .expect("SCENE_TIMEOUT_SECS must be a valid u64");

        let default_art_style = std::env::var("DEFAULT_ART_STYLE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ART_STYLE.to_string());

        let subject_keywords_path = std::env::var("SUBJECT_KEYWORDS_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            public_base_url,
            storage_dir,
            log_mode,
            scene_timeout_secs,
            default_art_style,
            subject_keywords_path,
            providers: ProviderConfig::from_env(),
        }
    }

    /// Pipeline settings derived from this configuration.
    pub fn pipeline_config(&self, keyword_tables: KeywordTables) -> PipelineConfig {
        PipelineConfig {
            public_base_url: self.public_base_url.clone(),
            scene_timeout: Duration::from_secs(self.scene_timeout_secs),
            batch_timeout: Some(Duration::from_secs(self.request_timeout_secs)),
            default_art_style: self.default_art_style.clone(),
            log_policy: self.log_mode,
            keyword_tables,
        }
    }

    /// Whether the batch budget leaves every scene of a maximum-size script
    /// its full per-scene timeout.
    pub fn batch_budget_covers_max_scenes(&self) -> bool {
        self.request_timeout_secs >= MAX_SCENES as u64 * self.scene_timeout_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(request_timeout_secs: u64, scene_timeout_secs: u64) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 3000,
            cors_origins: vec![],
            request_timeout_secs,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                access_token_expiry_mins: 15,
            },
            public_base_url: Url::parse("http://localhost:3000").unwrap(),
            storage_dir: PathBuf::from("./generated"),
            log_mode: LogPolicy::Development,
            scene_timeout_secs,
            default_art_style: DEFAULT_ART_STYLE.into(),
            subject_keywords_path: None,
            providers: ProviderConfig::default(),
        }
    }

    #[test]
    fn request_timeout_becomes_batch_budget() {
        let pipeline = config(900, 180).pipeline_config(KeywordTables::default());
        assert_eq!(pipeline.batch_timeout, Some(Duration::from_secs(900)));
        assert_eq!(pipeline.scene_timeout, Duration::from_secs(180));
    }

    #[test]
    fn default_budget_does_not_cover_max_scenes() {
        assert!(!config(DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SCENE_TIMEOUT_SECS)
            .batch_budget_covers_max_scenes());
    }

    #[test]
    fn budget_covering_max_scenes_passes_check() {
        assert!(config(50 * 10, 10).batch_budget_covers_max_scenes());
        assert!(!config(50 * 10 - 1, 10).batch_budget_covers_max_scenes());
    }
}
