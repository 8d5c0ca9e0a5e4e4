use std::path::PathBuf;

use super::ObjectStore;

/// Files under `UPLOAD_DIR`, served by the app at `PUBLIC_FILES_URL`.
#[derive(Clone, Debug)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    pub fn new(root: PathBuf, public_base: String) -> Self {
        Self {
            root,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Self {
        let root = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
        let base = std::env::var("PUBLIC_FILES_URL").unwrap_or_else(|_| "/uploads".to_string());
        Self::new(PathBuf::from(root), base)
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub async fn ensure_root(&self) {
        if let Err(e) = tokio::fs::create_dir_all(&self.root).await {
            tracing::warn!(error = %e, root = %self.root.display(), "Failed to create upload directory");
        }
    }
}

impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, String> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create directory: {e}"))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| format!("Failed to write file: {e}"))?;
        Ok(format!("{}/{}", self.public_base, key))
    }

    async fn delete(&self, key: &str) -> Result<(), String> {
        match tokio::fs::remove_file(self.root.join(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("Failed to delete file: {e}")),
        }
    }
}
