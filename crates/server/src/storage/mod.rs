//! Object storage for uploaded documents.

mod local;
mod s3;

pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;

use crate::config::feature_flags;

/// Put/delete for uploaded files. `put` returns the public URL of the object.
#[allow(async_fn_in_trait)]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, String>;

    async fn delete(&self, key: &str) -> Result<(), String>;
}

/// Keys must be relative and free of `..` so they cannot escape the store root.
pub fn validate_key(key: &str) -> Result<(), String> {
    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(format!("Invalid object key: {key}"));
    }
    Ok(())
}

/// The configured backend.
#[derive(Clone)]
pub enum DocumentStore {
    Local(LocalObjectStore),
    S3(S3ObjectStore),
}

impl DocumentStore {
    /// S3 when the `s3` flag is on or `STORAGE_BACKEND=s3`, local filesystem otherwise.
    /// Falls back to local storage if the S3 configuration is incomplete.
    pub fn from_env() -> Self {
        let wants_s3 = feature_flags().s3
            || std::env::var("STORAGE_BACKEND")
                .map(|v| v.eq_ignore_ascii_case("s3"))
                .unwrap_or(false);
        if wants_s3 {
            match S3ObjectStore::from_env() {
                Ok(store) => return DocumentStore::S3(store),
                Err(e) => {
                    tracing::error!(error = %e, "S3 storage misconfigured, using local storage")
                }
            }
        }
        DocumentStore::Local(LocalObjectStore::from_env())
    }

    /// Create the bucket if needed. No-op for local storage.
    pub async fn ensure_ready(&self) {
        match self {
            DocumentStore::Local(store) => store.ensure_root().await,
            DocumentStore::S3(store) => store.ensure_bucket().await,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            DocumentStore::Local(_) => "local",
            DocumentStore::S3(_) => "s3",
        }
    }
}

impl ObjectStore for DocumentStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, String> {
        validate_key(key)?;
        match self {
            DocumentStore::Local(store) => store.put(key, bytes, content_type).await,
            DocumentStore::S3(store) => store.put(key, bytes, content_type).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), String> {
        validate_key(key)?;
        match self {
            DocumentStore::Local(store) => store.delete(key).await,
            DocumentStore::S3(store) => store.delete(key).await,
        }
    }
}
