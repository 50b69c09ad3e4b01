//! Asset store collaborator for uploaded images and attachments.

use std::collections::HashMap;
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ErrorKind;

/// Largest accepted upload.
pub const MAX_ASSET_BYTES: usize = 5 * 1024 * 1024;

/// Path under which stored assets are served.
pub const ASSET_ROUTE: &str = "/uploads";

/// Content types accepted for upload.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/avif",
];

/// Errors raised by an asset store.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("File too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Empty upload")]
    Empty,

    #[error("Asset storage failed: {0}")]
    Storage(String),
}

impl AssetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssetError::Storage(_) => ErrorKind::ExternalService,
            _ => ErrorKind::Validation,
        }
    }
}

impl From<std::io::Error> for AssetError {
    fn from(e: std::io::Error) -> Self {
        AssetError::Storage(e.to_string())
    }
}

/// A file received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub bytes: Vec<u8>,
    /// Lowercased media type without parameters.
    pub content_type: String,
}

impl Upload {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: &str) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.trim().to_ascii_lowercase(),
        }
    }

    /// Checks the upload against the accepted types and size limit.
    pub fn validate(&self) -> Result<(), AssetError> {
        if !ALLOWED_CONTENT_TYPES.contains(&self.content_type.as_str()) {
            return Err(AssetError::UnsupportedType(self.content_type.clone()));
        }
        if self.bytes.is_empty() {
            return Err(AssetError::Empty);
        }
        if self.bytes.len() > MAX_ASSET_BYTES {
            return Err(AssetError::TooLarge {
                size: self.bytes.len(),
                max: MAX_ASSET_BYTES,
            });
        }
        Ok(())
    }

    fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/avif" => "avif",
            _ => "bin",
        }
    }
}

/// An asset read back for serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Media type for a stored asset name, judged by its extension.
pub fn content_type_for(name: &str) -> Option<&'static str> {
    match name.rsplit_once('.')?.1 {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "avif" => Some("image/avif"),
        _ => None,
    }
}

/// True for a bare file name that cannot escape the asset directory.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && !name.contains("..") && !name.contains('/') && !name.contains('\\')
}

/// Stores binary uploads and hands back a URL for them.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Validates and stores the upload, returning its public URL.
    async fn upload(&self, upload: Upload) -> Result<String, AssetError>;

    /// Reads an asset by the file name at the end of its URL.
    async fn fetch(&self, name: &str) -> Result<Option<StoredAsset>, AssetError>;

    /// Deletes a previously uploaded asset. Unknown URLs are ignored.
    async fn delete(&self, url: &str) -> Result<(), AssetError>;
}

fn name_in<'a>(base_url: &str, url: &'a str) -> Option<&'a str> {
    url.strip_prefix(base_url)?
        .strip_prefix('/')
        .filter(|name| is_safe_name(name))
}

#[derive(Debug, Default)]
struct AssetState {
    assets: HashMap<String, StoredAsset>,
    next_id: u32,
}

/// In-memory asset store.
#[derive(Debug, Clone)]
pub struct InMemoryAssetStore {
    base_url: String,
    state: Arc<RwLock<AssetState>>,
}

impl InMemoryAssetStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Arc::new(RwLock::new(AssetState::default())),
        }
    }

    /// Returns true if the URL refers to a stored asset.
    pub fn contains(&self, url: &str) -> bool {
        let Some(name) = name_in(&self.base_url, url) else {
            return false;
        };
        self.state
            .read()
            .map(|s| s.assets.contains_key(name))
            .unwrap_or(false)
    }

    /// Returns the number of stored assets.
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.assets.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryAssetStore {
    fn default() -> Self {
        Self::new(ASSET_ROUTE)
    }
}

fn poisoned<T>(_: T) -> AssetError {
    AssetError::Storage("lock poisoned".into())
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    #[tracing::instrument(skip(self, upload), fields(size = upload.bytes.len()))]
    async fn upload(&self, upload: Upload) -> Result<String, AssetError> {
        upload.validate()?;

        let mut state = self.state.write().map_err(poisoned)?;
        state.next_id += 1;
        let name = format!("ASSET-{:04}.{}", state.next_id, upload.extension());
        state.assets.insert(
            name.clone(),
            StoredAsset {
                content_type: upload.content_type,
                bytes: upload.bytes,
            },
        );

        let url = format!("{}/{}", self.base_url, name);
        tracing::debug!(%url, "asset stored");
        Ok(url)
    }

    async fn fetch(&self, name: &str) -> Result<Option<StoredAsset>, AssetError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.assets.get(name).cloned())
    }

    async fn delete(&self, url: &str) -> Result<(), AssetError> {
        let Some(name) = name_in(&self.base_url, url) else {
            return Ok(());
        };
        let mut state = self.state.write().map_err(poisoned)?;
        state.assets.remove(name);
        Ok(())
    }
}

/// Asset store writing each upload to its own file under a directory.
///
/// Files are named `<uuid>.<ext>`; the extension decides the content type
/// when the file is served.
#[derive(Debug, Clone)]
pub struct FileSystemAssetStore {
    root: PathBuf,
    base_url: String,
}

impl FileSystemAssetStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AssetStore for FileSystemAssetStore {
    #[tracing::instrument(skip(self, upload), fields(size = upload.bytes.len()))]
    async fn upload(&self, upload: Upload) -> Result<String, AssetError> {
        upload.validate()?;

        tokio::fs::create_dir_all(&self.root).await?;
        let name = format!("{}.{}", Uuid::new_v4().simple(), upload.extension());
        tokio::fs::write(self.root.join(&name), &upload.bytes).await?;

        let url = format!("{}/{}", self.base_url, name);
        tracing::info!(%url, size = upload.bytes.len(), "asset written");
        Ok(url)
    }

    async fn fetch(&self, name: &str) -> Result<Option<StoredAsset>, AssetError> {
        if !is_safe_name(name) {
            return Ok(None);
        }
        let Some(content_type) = content_type_for(name) else {
            return Ok(None);
        };

        match tokio::fs::read(self.root.join(name)).await {
            Ok(bytes) => Ok(Some(StoredAsset {
                content_type: content_type.to_string(),
                bytes,
            })),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, url: &str) -> Result<(), AssetError> {
        let Some(name) = name_in(&self.base_url, url) else {
            return Ok(());
        };
        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
