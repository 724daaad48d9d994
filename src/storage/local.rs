//! Local filesystem sink.
//!
//! Batches land in `{root}/{site}/{relative_path}` as pretty-printed UTF-8 JSON.
//! Writes go to a temp file first and are renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Batch;
use crate::storage::{
    StorageSink, WriteReceipt, check_relative, name_attempts, names_exhausted, suffixed_path,
};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalSink {
    root_dir: PathBuf,
}

impl LocalSink {
    /// Create a new LocalSink rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a site-relative key.
    fn path(&self, site: &str, relative_path: &str) -> PathBuf {
        self.root_dir.join(site).join(relative_path)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::storage(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            drop(file);
            tokio::fs::rename(&tmp, path).await
        }
        .await;

        result.map_err(|e| AppError::storage(format!("cannot write {}: {e}", path.display())))
    }

    async fn exists(path: &Path) -> Result<bool> {
        Ok(tokio::fs::try_exists(path).await?)
    }
}

#[async_trait]
impl StorageSink for LocalSink {
    async fn prepare(&self, site: &str) -> Result<String> {
        let dir = self.root_dir.join(site);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::storage(format!("cannot create {}: {e}", dir.display())))?;
        Ok(dir.display().to_string())
    }

    async fn write_batch(
        &self,
        site: &str,
        relative_path: &str,
        batch: &Batch,
    ) -> Result<WriteReceipt> {
        check_relative(relative_path)?;
        let bytes = serde_json::to_vec_pretty(batch)?;

        for attempt in name_attempts() {
            let candidate = suffixed_path(relative_path, attempt);
            let path = self.path(site, &candidate);
            if Self::exists(&path).await? {
                continue;
            }
            Self::write_bytes(&path, &bytes).await?;
            log::debug!("Wrote {} records to {}", batch.total_fetched, path.display());
            return Ok(WriteReceipt {
                location: path.display().to_string(),
                relative_path: candidate,
            });
        }

        Err(names_exhausted(relative_path))
    }

    async fn read_marker(&self, site: &str, relative_path: &str) -> Result<Option<String>> {
        check_relative(relative_path)?;
        let path = self.path(site, relative_path);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write_marker(&self, site: &str, relative_path: &str, contents: &str) -> Result<()> {
        check_relative(relative_path)?;
        Self::write_bytes(&self.path(site, relative_path), contents.as_bytes()).await
    }
}
