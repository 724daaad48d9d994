//! Storage sinks for batch files and checkpoint markers.
//!
//! ## Layout
//!
//! ```text
//! {data_dir | s3://bucket/prefix}/
//! └── {site}/
//!     └── {category}/
//!         ├── .last_crawl        # checkpoint marker (overwritten)
//!         └── {MMDD}/
//!             ├── 0.json
//!             ├── 0_2.json       # collision, never overwritten
//!             └── 1.json
//! ```

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::{Batch, StorageType};

// Re-export for convenience
pub use local::LocalSink;
#[cfg(feature = "s3")]
pub use s3::S3Sink;

/// Upper bound on collision suffixes tried for a single batch.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Where a batch ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Display location (file path or `s3://` URI)
    pub location: String,
    /// Relative path actually used, after collision suffixing
    pub relative_path: String,
}

/// Destination for batches and markers.
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Create the output location for a site and describe it.
    async fn prepare(&self, site: &str) -> Result<String>;

    /// Write a batch under `{site}/{relative_path}`, never overwriting.
    async fn write_batch(
        &self,
        site: &str,
        relative_path: &str,
        batch: &Batch,
    ) -> Result<WriteReceipt>;

    /// Read a marker file, `None` if absent.
    async fn read_marker(&self, site: &str, relative_path: &str) -> Result<Option<String>>;

    /// Overwrite a marker file.
    async fn write_marker(&self, site: &str, relative_path: &str, contents: &str) -> Result<()>;
}

/// Build the sink selected for this run.
pub async fn create_sink(
    settings: &Settings,
    storage_type: StorageType,
) -> Result<Arc<dyn StorageSink>> {
    match storage_type {
        StorageType::Local => Ok(Arc::new(LocalSink::new(settings.data_dir()))),
        #[cfg(feature = "s3")]
        StorageType::S3 => Ok(Arc::new(S3Sink::from_settings(settings).await?)),
        #[cfg(not(feature = "s3"))]
        StorageType::S3 => Err(AppError::config(
            "S3 storage requested but the `s3` feature is disabled",
        )),
    }
}

/// Candidate name for the `attempt`-th try: `0.json`, `0_2.json`, `0_3.json`, ...
pub fn suffixed_path(relative_path: &str, attempt: u32) -> String {
    if attempt <= 1 {
        return relative_path.to_string();
    }
    let (dir, file) = match relative_path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, relative_path),
    };
    let file = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{attempt}.{ext}"),
        _ => format!("{file}_{attempt}"),
    };
    match dir {
        Some(dir) => format!("{dir}/{file}"),
        None => file,
    }
}

/// Reject paths that could escape the site directory.
pub(crate) fn check_relative(relative_path: &str) -> Result<()> {
    if relative_path.is_empty()
        || relative_path.starts_with('/')
        || relative_path.split('/').any(|part| part == "..")
    {
        return Err(AppError::storage(format!(
            "invalid relative path: {relative_path:?}"
        )));
    }
    Ok(())
}

/// Error for a batch that found no free name.
pub(crate) fn names_exhausted(relative_path: &str) -> AppError {
    AppError::storage(format!(
        "no free name for {relative_path} after {MAX_NAME_ATTEMPTS} attempts"
    ))
}

pub(crate) fn name_attempts() -> impl Iterator<Item = u32> {
    1..=MAX_NAME_ATTEMPTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffixed_path() {
        assert_eq!(suffixed_path("qa/0101/0.json", 1), "qa/0101/0.json");
        assert_eq!(suffixed_path("qa/0101/0.json", 2), "qa/0101/0_2.json");
        assert_eq!(suffixed_path("qa/0101/0.json", 3), "qa/0101/0_3.json");
        assert_eq!(suffixed_path("0.json", 2), "0_2.json");
        assert_eq!(suffixed_path("marker", 2), "marker_2");
    }

    #[test]
    fn test_check_relative() {
        assert!(check_relative("qa/0101/0.json").is_ok());
        assert!(check_relative("../escape.json").is_err());
        assert!(check_relative("/abs.json").is_err());
        assert!(check_relative("").is_err());
    }
}
