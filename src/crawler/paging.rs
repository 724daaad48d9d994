// src/crawler/paging.rs

//! Paging driver shared by every site.
//!
//! One category at a time: fetch a page, filter it against the checkpoint,
//! shape the records, write a batch, and move on. Requests are strictly
//! sequential with a fixed delay between them. The checkpoint is written
//! last, only after every batch of the category is stored.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::crawler::{CategoryReport, CrawlContext, IncrementalPolicy};
use crate::error::Result;
use crate::models::{Batch, Scope};
use crate::utils::polite_delay;
use crate::utils::time::{date_folder, now_kst};

/// Raw records from one list request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    /// Source offset or page number, copied into the batch
    pub offset: usize,
}

impl Page {
    pub fn new(records: Vec<Value>, offset: usize) -> Self {
        Self { records, offset }
    }
}

/// A paginated listing for one category.
#[async_trait]
pub trait PageSource: Send {
    /// Category path below the site directory, e.g. `precedent/근로`.
    fn category(&self) -> &str;

    /// Key the records are stored under in `data`.
    fn records_key(&self) -> &'static str;

    /// Site-side category id copied into each batch.
    fn category_id(&self) -> Option<&str> {
        None
    }

    /// Fetch page `index` (0-based). `Ok(None)` means there is nothing more.
    async fn fetch_page(&mut self, index: usize) -> Result<Option<Page>>;

    /// Update time used for incremental filtering.
    fn updated_at(&self, record: &Value) -> Option<DateTime<FixedOffset>>;

    /// Shape admitted records for output (simple or detailed).
    async fn prepare_records(&mut self, records: Vec<Value>, simple: bool) -> Result<Vec<Value>>;

    fn request_delay(&self) -> Duration;

    /// Page cap, `None` for unbounded.
    fn max_pages(&self) -> Option<usize> {
        None
    }

    /// Consecutive empty pages that end pagination.
    fn empty_page_limit(&self) -> usize {
        1
    }
}

/// Page through one category and persist it.
pub async fn collect_pages(
    ctx: &CrawlContext,
    site: &str,
    source: &mut dyn PageSource,
) -> Result<CategoryReport> {
    let started = now_kst();
    let folder = date_folder(&started);
    let category = source.category().to_string();
    let simple = ctx.options.simple_result();
    let max_parse_failures = ctx.settings.config.crawler.max_parse_failures.max(1) as usize;

    let checkpoint = match ctx.options.scope {
        Scope::New => ctx.checkpoints.load(site, &category).await?,
        Scope::All => None,
    };
    let policy = IncrementalPolicy::for_scope(ctx.options.scope, checkpoint);

    let mut report = CategoryReport::new(&category);
    let mut parse_failures = 0;
    let mut empty_pages = 0;

    log::info!("Collecting {site}/{category}");

    let mut index = 0;
    loop {
        if source.max_pages().is_some_and(|max| index >= max) {
            log::info!("{site}/{category}: page limit reached");
            break;
        }
        if index > 0 {
            polite_delay(source.request_delay()).await;
        }

        report.pages_fetched += 1;
        let page = match source.fetch_page(index).await {
            Ok(Some(page)) => {
                parse_failures = 0;
                page
            }
            Ok(None) => break,
            Err(e) if e.is_parse() => {
                report.pages_skipped += 1;
                parse_failures += 1;
                log::warn!("{site}/{category}: skipping page {index}: {e}");
                if parse_failures >= max_parse_failures {
                    log::warn!(
                        "{site}/{category}: {parse_failures} unparseable pages in a row, stopping"
                    );
                    break;
                }
                index += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        index += 1;

        if page.records.is_empty() {
            empty_pages += 1;
            log::debug!("{site}/{category}: empty page {}", index - 1);
            if empty_pages >= source.empty_page_limit() {
                break;
            }
            continue;
        }
        empty_pages = 0;

        let fetched = page.records.len();
        let admission = policy.admit(page.records, |record| source.updated_at(record));
        if admission.boundary_reached {
            log::info!(
                "{site}/{category}: reached checkpoint, keeping {} of {fetched} records",
                admission.kept.len()
            );
        }

        if !admission.kept.is_empty() {
            let records = source.prepare_records(admission.kept, simple).await?;
            if !records.is_empty() {
                let batch = Batch::new(
                    source.records_key(),
                    records,
                    page.offset,
                    simple,
                    Some(category.clone()),
                )
                .with_category_id(source.category_id().map(str::to_string));
                let path = format!("{category}/{folder}/{}.json", report.batches_written);
                let receipt = ctx.sink.write_batch(site, &path, &batch).await?;
                report.batches_written += 1;
                report.records_written += batch.total_fetched;
                log::info!("Saved {} records to {}", batch.total_fetched, receipt.location);
            }
        }

        if admission.boundary_reached {
            report.stopped_early = true;
            break;
        }
    }

    if report.pages_skipped > 0 && policy.is_active() {
        log::warn!(
            "{site}/{category}: {} pages skipped, checkpoint left unchanged",
            report.pages_skipped
        );
    } else {
        ctx.checkpoints.save(site, &category, &started).await?;
        report.checkpoint_saved = true;
    }

    log::info!(
        "Finished {site}/{category}: {} records in {} batches over {} pages",
        report.records_written,
        report.batches_written,
        report.pages_fetched
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;

    use serde_json::json;
    use tempfile::tempdir;

    use crate::config::Settings;
    use crate::error::AppError;
    use crate::models::CrawlOptions;
    use crate::storage::LocalSink;
    use crate::utils::time::parse_timestamp;

    /// Scripted pages; each entry is one fetch result.
    struct Scripted {
        pages: VecDeque<Result<Option<Page>>>,
        fetched: Vec<usize>,
        empty_limit: usize,
    }

    impl Scripted {
        fn new(pages: Vec<Result<Option<Page>>>) -> Self {
            Self {
                pages: pages.into(),
                fetched: Vec::new(),
                empty_limit: 1,
            }
        }
    }

    fn page(dates: &[&str], offset: usize) -> Result<Option<Page>> {
        let records = dates
            .iter()
            .map(|d| json!({ "updatedAt": d, "title": "t", "secret": "x" }))
            .collect();
        Ok(Some(Page::new(records, offset)))
    }

    #[async_trait]
    impl PageSource for Scripted {
        fn category(&self) -> &str {
            "cases"
        }

        fn records_key(&self) -> &'static str {
            "questions"
        }

        async fn fetch_page(&mut self, index: usize) -> Result<Option<Page>> {
            self.fetched.push(index);
            self.pages.pop_front().unwrap_or(Ok(None))
        }

        fn updated_at(&self, record: &Value) -> Option<DateTime<FixedOffset>> {
            record["updatedAt"].as_str().and_then(parse_timestamp)
        }

        async fn prepare_records(&mut self, records: Vec<Value>, simple: bool) -> Result<Vec<Value>> {
            Ok(records
                .into_iter()
                .map(|mut r| {
                    if simple {
                        if let Some(obj) = r.as_object_mut() {
                            obj.remove("secret");
                        }
                    }
                    r
                })
                .collect())
        }

        fn request_delay(&self) -> Duration {
            Duration::ZERO
        }

        fn empty_page_limit(&self) -> usize {
            self.empty_limit
        }
    }

    fn context(root: &std::path::Path, scope: Scope) -> CrawlContext {
        CrawlContext::new(
            CrawlOptions::new("test").with_scope(scope),
            Arc::new(Settings::default()),
            Arc::new(LocalSink::new(root)),
        )
    }

    fn batch_files(root: &std::path::Path) -> Vec<std::path::PathBuf> {
        let mut files = Vec::new();
        let category = root.join("test/cases");
        if let Ok(days) = std::fs::read_dir(&category) {
            for day in days.flatten() {
                if day.path().is_dir() {
                    for file in std::fs::read_dir(day.path()).unwrap().flatten() {
                        files.push(file.path());
                    }
                }
            }
        }
        files.sort();
        files
    }

    fn write_checkpoint(root: &std::path::Path, value: &str) {
        let marker = root.join("test/cases/.last_crawl");
        std::fs::create_dir_all(marker.parent().unwrap()).unwrap();
        std::fs::write(marker, value).unwrap();
    }

    #[tokio::test]
    async fn test_boundary_page_is_last_request() {
        let dir = tempdir().unwrap();
        write_checkpoint(dir.path(), "2025-05-15T00:00:00+09:00");
        let ctx = context(dir.path(), Scope::New);

        let mut source = Scripted::new(vec![
            page(&["2025-06-01T00:00:00+09:00"], 0),
            page(&["2025-05-01T00:00:00+09:00"], 10),
            page(&["2025-04-01T00:00:00+09:00"], 20),
        ]);
        let report = collect_pages(&ctx, "test", &mut source).await.unwrap();

        assert_eq!(source.fetched, vec![0, 1]);
        assert_eq!(report.batches_written, 1);
        assert_eq!(report.records_written, 1);
        assert!(report.stopped_early);
        assert!(report.checkpoint_saved);

        let files = batch_files(dir.path());
        assert_eq!(files.len(), 1);
        let value: Value =
            serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
        assert_eq!(
            value["data"]["questions"][0]["updatedAt"],
            "2025-06-01T00:00:00+09:00"
        );
        assert_eq!(value["category"], "cases");
    }

    #[tokio::test]
    async fn test_mixed_page_keeps_newer_prefix() {
        let dir = tempdir().unwrap();
        write_checkpoint(dir.path(), "2025-05-15T00:00:00+09:00");
        let ctx = context(dir.path(), Scope::New);

        let mut source = Scripted::new(vec![
            page(&["2025-06-01T00:00:00+09:00", "2025-05-20T00:00:00+09:00"], 0),
            page(&["2025-05-16T00:00:00+09:00", "2025-05-15T00:00:00+09:00"], 10),
            page(&["2025-05-01T00:00:00+09:00"], 20),
        ]);
        let report = collect_pages(&ctx, "test", &mut source).await.unwrap();

        assert_eq!(source.fetched, vec![0, 1]);
        assert_eq!(report.records_written, 3);
        assert_eq!(report.batches_written, 2);
    }

    #[tokio::test]
    async fn test_nothing_new_still_refreshes_checkpoint() {
        let dir = tempdir().unwrap();
        write_checkpoint(dir.path(), "2025-05-15T00:00:00+09:00");
        let ctx = context(dir.path(), Scope::New);

        let mut source = Scripted::new(vec![page(&["2025-05-01T00:00:00+09:00"], 0)]);
        let report = collect_pages(&ctx, "test", &mut source).await.unwrap();

        assert_eq!(report.records_written, 0);
        assert!(batch_files(dir.path()).is_empty());
        let marker =
            std::fs::read_to_string(dir.path().join("test/cases/.last_crawl")).unwrap();
        assert_ne!(marker, "2025-05-15T00:00:00+09:00");
    }

    #[tokio::test]
    async fn test_scope_all_ignores_checkpoint() {
        let dir = tempdir().unwrap();
        write_checkpoint(dir.path(), "2025-05-15T00:00:00+09:00");
        let ctx = context(dir.path(), Scope::All);

        let mut source = Scripted::new(vec![
            page(&["2025-06-01T00:00:00+09:00"], 0),
            page(&["2025-05-01T00:00:00+09:00"], 10),
            page(&["2025-04-01T00:00:00+09:00"], 20),
        ]);
        let report = collect_pages(&ctx, "test", &mut source).await.unwrap();

        assert_eq!(source.fetched, vec![0, 1, 2, 3]);
        assert_eq!(report.records_written, 3);
        assert!(!report.stopped_early);
    }

    #[tokio::test]
    async fn test_scope_new_without_checkpoint_creates_one() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), Scope::New);

        let mut source = Scripted::new(vec![
            page(&["2025-06-01T00:00:00+09:00"], 0),
            page(&["2025-04-01T00:00:00+09:00"], 10),
        ]);
        let report = collect_pages(&ctx, "test", &mut source).await.unwrap();

        assert_eq!(report.records_written, 2);
        let marker =
            std::fs::read_to_string(dir.path().join("test/cases/.last_crawl")).unwrap();
        assert!(parse_timestamp(&marker).is_some());
        assert!(marker.ends_with("+09:00"));
    }

    #[tokio::test]
    async fn test_simple_mode_shapes_records() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), Scope::All);
        let mut source = Scripted::new(vec![page(&["2025-06-01T00:00:00+09:00"], 0)]);
        collect_pages(&ctx, "test", &mut source).await.unwrap();

        let files = batch_files(dir.path());
        let value: Value =
            serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
        assert_eq!(value["simple_result"], true);
        assert!(value["data"]["questions"][0].get("secret").is_none());
    }

    #[tokio::test]
    async fn test_parse_failures_skip_then_stop() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), Scope::All);

        let mut source = Scripted::new(vec![
            Err(AppError::parse("page 0", "bad")),
            page(&["2025-06-01T00:00:00+09:00"], 10),
            Err(AppError::parse("page 2", "bad")),
            Err(AppError::parse("page 3", "bad")),
            Err(AppError::parse("page 4", "bad")),
            page(&["2025-05-01T00:00:00+09:00"], 50),
        ]);
        let report = collect_pages(&ctx, "test", &mut source).await.unwrap();

        assert_eq!(source.fetched, vec![0, 1, 2, 3, 4]);
        assert_eq!(report.pages_skipped, 4);
        assert_eq!(report.records_written, 1);
    }

    #[tokio::test]
    async fn test_skipped_pages_keep_incremental_checkpoint() {
        let dir = tempdir().unwrap();
        write_checkpoint(dir.path(), "2025-05-15T00:00:00+09:00");
        let ctx = context(dir.path(), Scope::New);

        let mut source = Scripted::new(vec![
            page(&["2025-06-01T00:00:00+09:00"], 0),
            Err(AppError::parse("page 1", "bad")),
        ]);
        let report = collect_pages(&ctx, "test", &mut source).await.unwrap();

        assert!(!report.checkpoint_saved);
        let marker =
            std::fs::read_to_string(dir.path().join("test/cases/.last_crawl")).unwrap();
        assert_eq!(marker, "2025-05-15T00:00:00+09:00");
    }

    #[tokio::test]
    async fn test_fatal_error_propagates_without_checkpoint() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), Scope::New);

        let mut source = Scripted::new(vec![
            page(&["2025-06-01T00:00:00+09:00"], 0),
            Err(AppError::HttpStatus {
                url: "http://x".to_string(),
                status: 500,
            }),
        ]);
        let err = collect_pages(&ctx, "test", &mut source).await.unwrap_err();

        assert!(matches!(err, AppError::HttpStatus { status: 500, .. }));
        assert!(!dir.path().join("test/cases/.last_crawl").exists());
    }

    #[tokio::test]
    async fn test_empty_page_limit() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), Scope::All);

        let mut source = Scripted::new(vec![
            page(&["2025-06-01T00:00:00+09:00"], 1),
            page(&[], 2),
            page(&["2025-05-01T00:00:00+09:00"], 3),
            page(&[], 4),
            page(&[], 5),
            page(&["2025-04-01T00:00:00+09:00"], 6),
        ]);
        source.empty_limit = 2;
        let report = collect_pages(&ctx, "test", &mut source).await.unwrap();

        assert_eq!(source.fetched, vec![0, 1, 2, 3, 4]);
        assert_eq!(report.records_written, 2);
    }
}
