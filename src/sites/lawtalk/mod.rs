// src/sites/lawtalk/mod.rs

//! Lawtalk (lawtalk.co.kr) consultation cases and guide posts.
//!
//! Requires a login; the session cookie `connect.sid` is kept in the
//! client's cookie store for every following request.

pub mod normalize;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::{Value, json};

use crate::config::{Credentials, Settings};
use crate::crawler::{CrawlContext, CrawlReport, Page, PageSource, SiteCrawler, collect_pages};
use crate::error::{AppError, Result};
use crate::models::LawtalkConfig;
use crate::utils::http::{self, read_json};
use crate::utils::retry::RetryConfig;
use crate::utils::time::parse_timestamp;

pub const SITE: &str = "lawtalk";

const SESSION_COOKIE: &str = "connect.sid";
const CONSULTATION_CATEGORY: &str = "consultation_case";

/// Crawler for Lawtalk.
pub struct LawtalkCrawler {
    client: Option<reqwest::Client>,
    config: LawtalkConfig,
    retry: RetryConfig,
    credentials: Option<Credentials>,
}

/// Registry factory.
pub fn create(settings: &Settings) -> Result<Box<dyn SiteCrawler>> {
    Ok(Box::new(LawtalkCrawler::new(settings)?))
}

impl LawtalkCrawler {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: Some(http::create_client(&settings.config.crawler)?),
            config: settings.config.lawtalk.clone(),
            retry: http::retry_config(&settings.config.crawler),
            credentials: settings.env.credentials(SITE),
        })
    }

    fn client(&self) -> Result<&reqwest::Client> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::config("lawtalk session already closed"))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Log in and check that the session cookie was issued.
    async fn login(&self) -> Result<()> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            AppError::auth(SITE, "LAWTALK_ID and LAWTALK_PW must be set")
        })?;
        let client = self.client()?;
        let url = self.url("/api/session");
        let referer = self.url("/sign-in");
        let payload = json!({
            "username": credentials.username,
            "password": credentials.password,
            "remember": false,
        });

        log::info!("Logging in to {} as {}", SITE, credentials.username);
        let response = http::send(&self.retry, || {
            client
                .post(&url)
                .header(reqwest::header::REFERER, &referer)
                .json(&payload)
        })
        .await
        .map_err(|e| match e {
            AppError::HttpStatus { status, .. } if (400..500).contains(&status) => {
                AppError::auth(SITE, format!("login rejected with HTTP {status}"))
            }
            other => other,
        })?;

        if response.cookies().any(|c| c.name() == SESSION_COOKIE) {
            log::info!("Logged in to {}", SITE);
            Ok(())
        } else {
            Err(AppError::auth(SITE, "no session cookie in login response"))
        }
    }

    fn max_pages(&self) -> Option<usize> {
        (self.config.max_pages > 0).then_some(self.config.max_pages)
    }
}

#[async_trait]
impl SiteCrawler for LawtalkCrawler {
    fn site_name(&self) -> &'static str {
        SITE
    }

    async fn crawl(&mut self, ctx: &CrawlContext) -> Result<CrawlReport> {
        self.login().await?;

        let client = self.client()?;
        let mut report = CrawlReport::new(SITE);

        if self.config.consultation {
            let mut source = ListSource {
                client,
                retry: &self.retry,
                url: self.url("/api/qna/question/search"),
                category: CONSULTATION_CATEGORY.to_string(),
                kind: ListKind::Consultation,
                page_size: self.config.page_size,
                max_pages: self.max_pages(),
                delay: self.config.request_delay(),
            };
            report.push(collect_pages(ctx, SITE, &mut source).await?);
        }

        for (name, id) in &self.config.guide_categories {
            let mut source = ListSource {
                client,
                retry: &self.retry,
                url: self.url(&self.config.guide_posts_path),
                category: format!("guide_posts/{name}"),
                kind: ListKind::GuidePosts {
                    category_id: id.clone(),
                },
                page_size: self.config.guide_page_size,
                max_pages: self.max_pages(),
                delay: self.config.request_delay(),
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

enum ListKind {
    Consultation,
    GuidePosts { category_id: String },
}

/// Offset-paginated JSON listing (questions or guide posts).
struct ListSource<'a> {
    client: &'a reqwest::Client,
    retry: &'a RetryConfig,
    url: String,
    category: String,
    kind: ListKind,
    page_size: usize,
    max_pages: Option<usize>,
    delay: Duration,
}

impl ListSource<'_> {
    fn query(&self, offset: usize) -> Vec<(&'static str, String)> {
        match &self.kind {
            ListKind::Consultation => vec![
                ("blindFilter", "true".to_string()),
                ("filter", "answers".to_string()),
                ("limit", self.page_size.to_string()),
                ("offset", offset.to_string()),
                ("sort", "recentAnswer".to_string()),
                (
                    "withRelated",
                    "answers,lawyer,answerRevisions,keywords".to_string(),
                ),
            ],
            ListKind::GuidePosts { category_id } => vec![
                ("category", category_id.clone()),
                ("offset", offset.to_string()),
                ("limit", self.page_size.to_string()),
            ],
        }
    }
}

#[async_trait]
impl PageSource for ListSource<'_> {
    fn category(&self) -> &str {
        &self.category
    }

    fn category_id(&self) -> Option<&str> {
        match &self.kind {
            ListKind::Consultation => None,
            ListKind::GuidePosts { category_id } => Some(category_id),
        }
    }

    fn records_key(&self) -> &'static str {
        match self.kind {
            ListKind::Consultation => "questions",
            ListKind::GuidePosts { .. } => "posts",
        }
    }

    async fn fetch_page(&mut self, index: usize) -> Result<Option<Page>> {
        let offset = index * self.page_size;
        let query = self.query(offset);
        let response = http::send(self.retry, || self.client.get(&self.url).query(&query)).await?;

        let context = format!("{} offset {offset}", self.category);
        let mut body = read_json(response, &context).await?;
        let records = match body.get_mut(self.records_key()).map(Value::take) {
            Some(Value::Array(records)) => records,
            Some(Value::Null) => Vec::new(),
            None => {
                return Err(AppError::parse(
                    context,
                    format!("response has no `{}`", self.records_key()),
                ));
            }
            Some(_) => {
                return Err(AppError::parse(
                    context,
                    format!("`{}` is not an array", self.records_key()),
                ));
            }
        };

        log::debug!("Fetched {} records at offset {offset}", records.len());
        Ok(Some(Page::new(records, offset)))
    }

    fn updated_at(&self, record: &Value) -> Option<DateTime<FixedOffset>> {
        record
            .get("updatedAt")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    }

    async fn prepare_records(&mut self, records: Vec<Value>, simple: bool) -> Result<Vec<Value>> {
        Ok(match self.kind {
            ListKind::Consultation => records
                .iter()
                .map(|r| normalize::question(r, simple))
                .collect(),
            ListKind::GuidePosts { .. } => records
                .iter()
                .map(|r| normalize::guide_post(r, simple))
                .collect(),
        })
    }

    fn request_delay(&self) -> Duration {
        self.delay
    }

    fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }
}
