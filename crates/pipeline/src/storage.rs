//! Generated-image storage.
//!
//! Backends that return raw bytes need somewhere to put them; the
//! [`ImageStore`] contract turns bytes into a public URL. The local store
//! writes under a directory the HTTP service serves at [`GENERATED_ROUTE`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use url::Url;

/// URL path prefix under which stored images are served.
pub const GENERATED_ROUTE: &str = "/generated";

/// Longest accepted storage key.
const MAX_KEY_LENGTH: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persist image bytes and return the URL clients fetch them from.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, data: &[u8], mime_type: &str, key: &str)
        -> Result<String, StorageError>;
}

/// Filesystem-backed store.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    public_base_url: Url,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: Url) -> Self {
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn public_url(&self, file_name: &str) -> String {
        format!(
            "{}{GENERATED_ROUTE}/{file_name}",
            self.public_base_url.as_str().trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(
        &self,
        data: &[u8],
        mime_type: &str,
        key: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        let file_name = format!("{key}.{}", extension_for(mime_type));

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&file_name), data).await?;

        tracing::debug!(file = %file_name, bytes = data.len(), "Stored generated image");
        Ok(self.public_url(&file_name))
    }
}

/// Keys become file names; only `[A-Za-z0-9_-]` is allowed.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let ok = !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// File extension for an image MIME type.
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}
