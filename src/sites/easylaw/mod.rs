// src/sites/easylaw/mod.rs

//! EasyLaw (easylaw.go.kr) public Q&A list.
//!
//! No login. Items carry no update time, so `scope = new` cannot filter and
//! every run walks the list until it runs dry.

pub mod extract;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::config::Settings;
use crate::crawler::{CrawlContext, CrawlReport, Page, PageSource, SiteCrawler, collect_pages};
use crate::error::{AppError, Result};
use crate::models::EasylawConfig;
use crate::utils::http;
use crate::utils::retry::RetryConfig;

use extract::Extractor;

pub const SITE: &str = "easylaw";

const CATEGORY: &str = "qa";

/// Crawler for EasyLaw.
pub struct EasylawCrawler {
    client: Option<reqwest::Client>,
    config: EasylawConfig,
    retry: RetryConfig,
}

/// Registry factory.
pub fn create(settings: &Settings) -> Result<Box<dyn SiteCrawler>> {
    Ok(Box::new(EasylawCrawler::new(settings)?))
}

impl EasylawCrawler {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: Some(http::create_client(&settings.config.crawler)?),
            config: settings.config.easylaw.clone(),
            retry: http::retry_config(&settings.config.crawler),
        })
    }
}

#[async_trait]
impl SiteCrawler for EasylawCrawler {
    fn site_name(&self) -> &'static str {
        SITE
    }

    async fn crawl(&mut self, ctx: &CrawlContext) -> Result<CrawlReport> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AppError::config("easylaw session already closed"))?;
        let base = self.config.base_url.trim_end_matches('/');

        let mut source = QaSource {
            client,
            retry: &self.retry,
            config: &self.config,
            list_url: format!("{base}/CSP/OnhunqueansLstRetrieve.laf"),
            referer: format!("{base}/CSP/OnhunqueansLstRetrieve.laf?search_put="),
            extractor: Extractor::new(base)?,
        };

        let mut report = CrawlReport::new(SITE);
        report.push(collect_pages(ctx, SITE, &mut source).await?);
        Ok(report)
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            log::debug!("Closed {} session", SITE);
        }
    }
}

/// Form-posted list pages, numbered from 1.
struct QaSource<'a> {
    client: &'a reqwest::Client,
    retry: &'a RetryConfig,
    config: &'a EasylawConfig,
    list_url: String,
    referer: String,
    extractor: Extractor,
}

#[async_trait]
impl PageSource for QaSource<'_> {
    fn category(&self) -> &str {
        CATEGORY
    }

    fn records_key(&self) -> &'static str {
        "items"
    }

    async fn fetch_page(&mut self, index: usize) -> Result<Option<Page>> {
        let page_num = index + 1;
        let form = [
            ("curPage", page_num.to_string()),
            ("sch", self.config.search.clone()),
            ("pageTpe", self.config.page_size.to_string()),
        ];

        let response = http::send(self.retry, || {
            self.client
                .post(&self.list_url)
                .header(reqwest::header::REFERER, &self.referer)
                .form(&form)
        })
        .await?;
        let html = response.text().await?;
        let records = self.extractor.extract_items(&html);

        log::debug!("Page {page_num}: {} Q&A items", records.len());
        Ok(Some(Page::new(records, page_num)))
    }

    fn updated_at(&self, _record: &Value) -> Option<DateTime<FixedOffset>> {
        None
    }

    async fn prepare_records(&mut self, records: Vec<Value>, simple: bool) -> Result<Vec<Value>> {
        if simple {
            Ok(records.iter().map(extract::simplify).collect())
        } else {
            Ok(records)
        }
    }

    fn request_delay(&self) -> Duration {
        self.config.request_delay()
    }

    fn max_pages(&self) -> Option<usize> {
        (self.config.max_pages > 0).then_some(self.config.max_pages)
    }

    fn empty_page_limit(&self) -> usize {
        self.config.max_empty_pages
    }
}
