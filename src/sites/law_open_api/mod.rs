// src/sites/law_open_api/mod.rs

//! Court precedents from the national law information center.
//!
//! Search results come from the open API (`lawSearch.do`, HTML output) per
//! keyword. With `fetch_detail` on, each admitted precedent is enriched from
//! its `precInfoP.do` page before shaping.

pub mod parse;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use crate::config::Settings;
use crate::crawler::{CrawlContext, CrawlReport, Page, PageSource, SiteCrawler, collect_pages};
use crate::error::{AppError, Result};
use crate::models::LawOpenApiConfig;
use crate::utils::http;
use crate::utils::polite_delay;
use crate::utils::retry::RetryConfig;
use crate::utils::time::{now_kst, parse_timestamp};

use parse::Parser;

pub const SITE: &str = "law_open_api";

/// Crawler for precedent search.
pub struct LawOpenApiCrawler {
    client: Option<reqwest::Client>,
    config: LawOpenApiConfig,
    retry: RetryConfig,
    api_key: Option<String>,
}

/// Registry factory.
pub fn create(settings: &Settings) -> Result<Box<dyn SiteCrawler>> {
    Ok(Box::new(LawOpenApiCrawler::new(settings)?))
}

impl LawOpenApiCrawler {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: Some(http::create_client(&settings.config.crawler)?),
            config: settings.config.law_open_api.clone(),
            retry: http::retry_config(&settings.config.crawler),
            api_key: settings.env.law_open_api_key().map(str::to_string),
        })
    }
}

#[async_trait]
impl SiteCrawler for LawOpenApiCrawler {
    fn site_name(&self) -> &'static str {
        SITE
    }

    async fn crawl(&mut self, ctx: &CrawlContext) -> Result<CrawlReport> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::auth(SITE, "LAW_OPEN_API_ID must be set"))?;
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AppError::config("law_open_api session already closed"))?;

        let mut report = CrawlReport::new(SITE);
        for keyword in &self.config.keywords {
            log::info!("Searching precedents for '{keyword}'");
            let mut source = PrecedentSource {
                client,
                retry: &self.retry,
                config: &self.config,
                api_key,
                keyword,
                category: format!("precedent/{keyword}"),
                parser: Parser::new()?,
            };
            report.push(collect_pages(ctx, SITE, &mut source).await?);
        }
        Ok(report)
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            log::debug!("Closed {} session", SITE);
        }
    }
}

/// Search result pages for one keyword, numbered from 1.
struct PrecedentSource<'a> {
    client: &'a reqwest::Client,
    retry: &'a RetryConfig,
    config: &'a LawOpenApiConfig,
    api_key: &'a str,
    keyword: &'a str,
    category: String,
    parser: Parser,
}

impl PrecedentSource<'_> {
    fn judgment_date(record: &Value) -> Option<DateTime<FixedOffset>> {
        record
            .get("judgment_date")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    }

    /// Detail page fields, or `None` when the page could not be used.
    async fn fetch_detail(&self, prec_id: &str) -> Result<Option<Map<String, Value>>> {
        let url = format!(
            "{}/LSW/precInfoP.do",
            self.config.detail_base_url.trim_end_matches('/')
        );
        let query = [("mode", "0"), ("precSeq", prec_id)];
        let response = http::send(self.retry, || self.client.get(&url).query(&query)).await?;
        let body = response.text().await?;

        if !Parser::is_judgment_page(&body) {
            log::debug!("No judgment content for precedent {prec_id}");
            return Ok(None);
        }
        let detail = self.parser.parse_detail(&body);
        Ok((!detail.is_empty()).then_some(detail))
    }
}

#[async_trait]
impl PageSource for PrecedentSource<'_> {
    fn category(&self) -> &str {
        &self.category
    }

    fn records_key(&self) -> &'static str {
        "precedents"
    }

    async fn fetch_page(&mut self, index: usize) -> Result<Option<Page>> {
        let page_num = index + 1;
        let url = format!("{}/DRF/lawSearch.do", self.config.base_url.trim_end_matches('/'));
        let query = [
            ("OC", self.api_key.to_string()),
            ("target", "prec".to_string()),
            ("type", "HTML".to_string()),
            ("search", "1".to_string()),
            ("display", self.config.display.to_string()),
            ("page", page_num.to_string()),
            ("sort", "ddes".to_string()),
            ("query", self.keyword.to_string()),
        ];

        let response = http::send(self.retry, || self.client.get(&url).query(&query)).await?;
        let html = response.text().await?;
        let crawl_date = now_kst().to_rfc3339();
        let mut records = self.parser.parse_list(&html, self.keyword, &crawl_date);
        records.sort_by(|a, b| Self::judgment_date(b).cmp(&Self::judgment_date(a)));

        log::debug!("'{}' page {page_num}: {} precedents", self.keyword, records.len());
        Ok(Some(Page::new(records, page_num)))
    }

    fn updated_at(&self, record: &Value) -> Option<DateTime<FixedOffset>> {
        Self::judgment_date(record)
    }

    async fn prepare_records(&mut self, records: Vec<Value>, simple: bool) -> Result<Vec<Value>> {
        let mut prepared = Vec::with_capacity(records.len());

        for record in records {
            let Value::Object(mut record) = record else {
                continue;
            };

            if self.config.fetch_detail {
                let prec_id = record
                    .get("prec_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if !prec_id.is_empty() {
                    polite_delay(self.request_delay()).await;
                    match self.fetch_detail(&prec_id).await {
                        Ok(Some(detail)) => record.extend(detail),
                        Ok(None) => {}
                        Err(e) => {
                            log::warn!("Detail fetch failed for precedent {prec_id}: {e}");
                        }
                    }
                }
            }

            let shaped = parse::shape_for_retrieval(record);
            let shaped = if simple { parse::simplify(shaped) } else { shaped };
            prepared.push(Value::Object(shaped));
        }

        Ok(prepared)
    }

    fn request_delay(&self) -> Duration {
        self.config.request_delay()
    }

    fn max_pages(&self) -> Option<usize> {
        (self.config.max_pages > 0).then_some(self.config.max_pages)
    }
}
