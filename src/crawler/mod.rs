// src/crawler/mod.rs

//! Site crawler contract and the shared lifecycle driver.

pub mod checkpoint;
pub mod incremental;
pub mod paging;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Settings;
use crate::error::Result;
use crate::models::CrawlOptions;
use crate::storage::StorageSink;

pub use checkpoint::CheckpointStore;
pub use incremental::{Admission, IncrementalPolicy};
pub use paging::{Page, PageSource, collect_pages};

/// Everything a crawler needs for one run. Built once, passed by reference.
#[derive(Clone)]
pub struct CrawlContext {
    pub options: CrawlOptions,
    pub settings: Arc<Settings>,
    pub sink: Arc<dyn StorageSink>,
    pub checkpoints: CheckpointStore,
}

impl CrawlContext {
    pub fn new(options: CrawlOptions, settings: Arc<Settings>, sink: Arc<dyn StorageSink>) -> Self {
        let checkpoints = CheckpointStore::new(sink.clone());
        Self {
            options,
            settings,
            sink,
            checkpoints,
        }
    }
}

/// Outcome of one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryReport {
    pub category: String,
    /// Requests issued for list pages
    pub pages_fetched: usize,
    /// Pages dropped because they could not be parsed
    pub pages_skipped: usize,
    pub batches_written: usize,
    pub records_written: usize,
    /// Pagination ended at the incremental boundary
    pub stopped_early: bool,
    pub checkpoint_saved: bool,
}

impl CategoryReport {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Default::default()
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub site: String,
    pub categories: Vec<CategoryReport>,
}

impl CrawlReport {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            categories: Vec::new(),
        }
    }

    pub fn push(&mut self, category: CategoryReport) {
        self.categories.push(category);
    }

    pub fn total_records(&self) -> usize {
        self.categories.iter().map(|c| c.records_written).sum()
    }

    pub fn total_batches(&self) -> usize {
        self.categories.iter().map(|c| c.batches_written).sum()
    }
}

/// One external source.
#[async_trait]
pub trait SiteCrawler: Send {
    /// Registry id; also the output directory name.
    fn site_name(&self) -> &'static str;

    /// Authenticate, page through every category and persist batches.
    async fn crawl(&mut self, ctx: &CrawlContext) -> Result<CrawlReport>;

    /// Release the HTTP session.
    async fn close(&mut self) {}
}

/// Drive a crawler through its lifecycle.
///
/// `close` runs on every path before this returns.
pub async fn run_crawler(crawler: &mut dyn SiteCrawler, ctx: &CrawlContext) -> Result<CrawlReport> {
    let site = crawler.site_name();

    let result = match ctx.sink.prepare(site).await {
        Ok(location) => {
            log::info!("Crawling {} into {}", ctx.options, location);
            crawler.crawl(ctx).await
        }
        Err(e) => Err(e),
    };

    crawler.close().await;

    match result {
        Ok(report) => {
            log::info!(
                "Crawling finished for {}: {} records in {} batches",
                site,
                report.total_records(),
                report.total_batches()
            );
            Ok(report)
        }
        Err(e) => {
            log::error!("Crawling failed for {}: {}", site, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::storage::LocalSink;
    use tempfile::tempdir;

    struct FakeCrawler {
        fail: bool,
        closed: bool,
    }

    #[async_trait]
    impl SiteCrawler for FakeCrawler {
        fn site_name(&self) -> &'static str {
            "fake"
        }

        async fn crawl(&mut self, _ctx: &CrawlContext) -> Result<CrawlReport> {
            if self.fail {
                Err(AppError::auth("fake", "rejected"))
            } else {
                let mut report = CrawlReport::new("fake");
                report.push(CategoryReport {
                    records_written: 3,
                    batches_written: 1,
                    ..CategoryReport::new("qa")
                });
                Ok(report)
            }
        }

        async fn close(&mut self) {
            self.closed = true;
        }
    }

    fn context(root: &std::path::Path) -> CrawlContext {
        CrawlContext::new(
            CrawlOptions::new("fake"),
            Arc::new(Settings::default()),
            Arc::new(LocalSink::new(root)),
        )
    }

    #[tokio::test]
    async fn test_run_creates_location_and_closes() {
        let dir = tempdir().unwrap();
        let mut crawler = FakeCrawler {
            fail: false,
            closed: false,
        };
        let report = run_crawler(&mut crawler, &context(dir.path())).await.unwrap();
        assert_eq!(report.total_records(), 3);
        assert!(crawler.closed);
        assert!(dir.path().join("fake").is_dir());
    }

    #[tokio::test]
    async fn test_close_runs_on_failure() {
        let dir = tempdir().unwrap();
        let mut crawler = FakeCrawler {
            fail: true,
            closed: false,
        };
        let err = run_crawler(&mut crawler, &context(dir.path())).await.unwrap_err();
        assert!(matches!(err, AppError::Authentication { .. }));
        assert!(crawler.closed);
    }

    #[tokio::test]
    async fn test_close_runs_when_location_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let mut crawler = FakeCrawler {
            fail: false,
            closed: false,
        };
        let err = run_crawler(&mut crawler, &context(&blocker)).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(crawler.closed);
    }
}
