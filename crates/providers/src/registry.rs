//! Backend selection.
//!
//! The registry owns one instance of each configured backend and picks the
//! one that serves a batch. Selection happens once per batch, before any
//! scene is generated, so every scene of a batch uses the same backend.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::provider::{ImageProvider, ProviderKind};
use crate::reference::ReferenceImageProvider;
use crate::text_prompt::TextPromptProvider;

/// Per-request backend preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderSelection {
    /// Backend explicitly asked for, if any.
    pub requested: Option<ProviderKind>,
    /// Override for the registry-wide fallback switch.
    pub allow_fallback: Option<bool>,
    /// Whether the subjects come with usable reference photos. `Some(false)`
    /// moves the text-prompt backend ahead when nothing else is preferred.
    pub reference_photos: Option<bool>,
}

impl ProviderSelection {
    pub fn with_reference_photos(self, available: bool) -> Self {
        Self {
            reference_photos: Some(available),
            ..self
        }
    }
}

/// Availability of one backend, as reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub kind: ProviderKind,
    pub available: bool,
    pub is_default: bool,
}

/// The set of backends known to the process.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ImageProvider>>,
    default_kind: Option<ProviderKind>,
    allow_fallback: bool,
}

impl ProviderRegistry {
    pub fn new(
        providers: Vec<Arc<dyn ImageProvider>>,
        default_kind: Option<ProviderKind>,
        allow_fallback: bool,
    ) -> Self {
        Self {
            providers,
            default_kind,
            allow_fallback,
        }
    }

    /// Build both HTTP backends from configuration, sharing one connection
    /// pool.
    pub fn from_config(config: &ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .unwrap_or_default();

        let providers: Vec<Arc<dyn ImageProvider>> = vec![
            Arc::new(ReferenceImageProvider::with_client(
                client.clone(),
                config.reference.clone(),
            )),
            Arc::new(TextPromptProvider::with_client(client, config.text.clone())),
        ];

        Self::new(providers, config.default_kind, config.allow_fallback)
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ImageProvider>> {
        self.providers.iter().find(|p| p.kind() == kind).cloned()
    }

    /// Availability of every supported backend, in preference order.
    pub fn availability(&self) -> Vec<ProviderStatus> {
        self.preference_order(None)
            .into_iter()
            .map(|kind| ProviderStatus {
                kind,
                available: self.get(kind).is_some_and(|p| p.is_available()),
                is_default: self.default_kind == Some(kind),
            })
            .collect()
    }

    /// True when at least one backend could serve a batch.
    pub fn any_available(&self) -> bool {
        self.providers.iter().any(|p| p.is_available())
    }

    /// Pick the backend for one batch.
    ///
    /// The requested backend (or the configured default) wins when it is
    /// available. Otherwise, if fallback is allowed, the first available
    /// backend in preference order is used and a warning is logged. Without
    /// any preference, a batch without reference photos goes to the
    /// text-prompt backend first. With
    /// fallback disabled, or nothing available, the batch is refused with
    /// [`ProviderError::Unavailable`].
    pub fn resolve(
        &self,
        selection: ProviderSelection,
    ) -> Result<Arc<dyn ImageProvider>, ProviderError> {
        let allow_fallback = selection.allow_fallback.unwrap_or(self.allow_fallback);
        let wanted = selection.requested.or(self.default_kind);

        if let Some(kind) = wanted {
            match self.get(kind) {
                Some(provider) if provider.is_available() => return Ok(provider),
                _ if !allow_fallback => {
                    return Err(ProviderError::Unavailable(format!(
                        "{kind} is not configured and fallback is disabled"
                    )));
                }
                _ => {}
            }
        }

        let fallback = self
            .preference_order(selection.reference_photos)
            .into_iter()
            .filter_map(|kind| self.get(kind))
            .find(|p| p.is_available())
            .ok_or_else(|| {
                ProviderError::Unavailable("no image provider is configured".to_string())
            })?;

        if let Some(kind) = wanted {
            tracing::warn!(
                requested = %kind,
                using = %fallback.kind(),
                "Requested image provider unavailable, falling back",
            );
        }

        Ok(fallback)
    }

    /// Default backend first, then the text-prompt backend when there are
    /// no reference photos, then the remaining kinds in their fixed order.
    fn preference_order(&self, reference_photos: Option<bool>) -> Vec<ProviderKind> {
        let mut order: Vec<ProviderKind> = self.default_kind.into_iter().collect();
        if reference_photos == Some(false) && !order.contains(&ProviderKind::TextPrompt) {
            order.push(ProviderKind::TextPrompt);
        }
        for kind in ProviderKind::ALL {
            if !order.contains(&kind) {
                order.push(kind);
            }
        }
        order
    }
}
