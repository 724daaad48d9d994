// src/crawler/checkpoint.rs

//! Per-category checkpoint markers.
//!
//! The marker `{category}/.last_crawl` holds one RFC 3339 timestamp in KST and
//! lives in the same sink as the batches.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::error::Result;
use crate::storage::StorageSink;
use crate::utils::time::{format_checkpoint, parse_timestamp};

/// Marker file name inside each category directory.
pub const MARKER_NAME: &str = ".last_crawl";

/// Reads and writes checkpoint markers through a sink.
#[derive(Clone)]
pub struct CheckpointStore {
    sink: Arc<dyn StorageSink>,
}

impl CheckpointStore {
    pub fn new(sink: Arc<dyn StorageSink>) -> Self {
        Self { sink }
    }

    fn marker_path(category: &str) -> String {
        format!("{category}/{MARKER_NAME}")
    }

    /// Last successful crawl start for a category.
    ///
    /// A marker that cannot be parsed is treated as absent.
    pub async fn load(&self, site: &str, category: &str) -> Result<Option<DateTime<FixedOffset>>> {
        let Some(raw) = self
            .sink
            .read_marker(site, &Self::marker_path(category))
            .await?
        else {
            log::info!("No checkpoint for {site}/{category}");
            return Ok(None);
        };

        match parse_timestamp(&raw) {
            Some(ts) => {
                log::info!("Checkpoint for {site}/{category}: {}", format_checkpoint(&ts));
                Ok(Some(ts))
            }
            None => {
                log::warn!(
                    "Ignoring unreadable checkpoint for {site}/{category}: {:?}",
                    raw.trim()
                );
                Ok(None)
            }
        }
    }

    pub async fn save(&self, site: &str, category: &str, at: &DateTime<FixedOffset>) -> Result<()> {
        let value = format_checkpoint(at);
        self.sink
            .write_marker(site, &Self::marker_path(category), &value)
            .await?;
        log::info!("Saved checkpoint for {site}/{category}: {value}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalSink;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(Arc::new(LocalSink::new(dir.path())));
        assert!(store.load("lawtalk", "consultation_case").await.unwrap().is_none());

        let at = parse_timestamp("2025-05-15T03:00:00Z").unwrap();
        store.save("lawtalk", "consultation_case", &at).await.unwrap();

        let text =
            std::fs::read_to_string(dir.path().join("lawtalk/consultation_case/.last_crawl"))
                .unwrap();
        assert_eq!(text, "2025-05-15T12:00:00+09:00");
        assert_eq!(
            store.load("lawtalk", "consultation_case").await.unwrap(),
            Some(at)
        );
    }

    #[tokio::test]
    async fn test_naive_marker_is_kst() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("easylaw/qa/.last_crawl");
        std::fs::create_dir_all(marker.parent().unwrap()).unwrap();
        std::fs::write(&marker, "2025-05-15T12:00:00\n").unwrap();

        let store = CheckpointStore::new(Arc::new(LocalSink::new(dir.path())));
        let loaded = store.load("easylaw", "qa").await.unwrap().unwrap();
        assert_eq!(loaded, parse_timestamp("2025-05-15T03:00:00Z").unwrap());
    }

    #[tokio::test]
    async fn test_garbage_marker_is_ignored() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("easylaw/qa/.last_crawl");
        std::fs::create_dir_all(marker.parent().unwrap()).unwrap();
        std::fs::write(&marker, "not a date").unwrap();

        let store = CheckpointStore::new(Arc::new(LocalSink::new(dir.path())));
        assert!(store.load("easylaw", "qa").await.unwrap().is_none());
    }
}
