//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP, retry and paging behavior shared by every site
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Output locations
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub lawtalk: LawtalkConfig,

    #[serde(default)]
    pub easylaw: EasylawConfig,

    #[serde(default)]
    pub law_open_api: LawOpenApiConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_parse_failures == 0 {
            return Err(AppError::validation(
                "crawler.max_parse_failures must be > 0",
            ));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(AppError::validation("storage.data_dir is empty"));
        }
        if self.lawtalk.page_size == 0 || self.lawtalk.guide_page_size == 0 {
            return Err(AppError::validation("lawtalk page sizes must be > 0"));
        }
        if self.easylaw.page_size == 0 {
            return Err(AppError::validation("easylaw.page_size must be > 0"));
        }
        if self.easylaw.max_empty_pages == 0 {
            return Err(AppError::validation("easylaw.max_empty_pages must be > 0"));
        }
        if self.law_open_api.display == 0 {
            return Err(AppError::validation("law_open_api.display must be > 0"));
        }
        if self.law_open_api.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(AppError::validation(
                "law_open_api.keywords contains an empty keyword",
            ));
        }
        for (section, url) in [
            ("lawtalk.base_url", &self.lawtalk.base_url),
            ("easylaw.base_url", &self.easylaw.base_url),
            ("law_open_api.base_url", &self.law_open_api.base_url),
            ("law_open_api.detail_base_url", &self.law_open_api.detail_base_url),
        ] {
            url::Url::parse(url)
                .map_err(|e| AppError::validation(format!("{section} is invalid: {e}")))?;
        }
        Ok(())
    }
}

/// HTTP client and paging behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds
    #[serde(default = "defaults::retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Consecutive unparseable pages that end a category
    #[serde(default = "defaults::max_parse_failures")]
    pub max_parse_failures: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            retry_base_delay_ms: defaults::retry_base_delay(),
            max_parse_failures: defaults::max_parse_failures(),
        }
    }
}

/// Output locations for local disk and S3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for local output
    #[serde(default = "defaults::data_dir")]
    pub data_dir: String,

    /// Key prefix prepended to every S3 object (may be empty)
    #[serde(default)]
    pub s3_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            s3_prefix: String::new(),
        }
    }
}

/// Lawtalk API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LawtalkConfig {
    #[serde(default = "defaults::lawtalk_base_url")]
    pub base_url: String,

    #[serde(default = "defaults::lawtalk_delay")]
    pub request_delay_ms: u64,

    /// Questions per request; the offset advances by this much
    #[serde(default = "defaults::lawtalk_page_size")]
    pub page_size: usize,

    /// Page cap per category (0 = until an empty page)
    #[serde(default = "defaults::lawtalk_max_pages")]
    pub max_pages: usize,

    /// Collect consultation cases
    #[serde(default = "defaults::enabled")]
    pub consultation: bool,

    /// Guide post search endpoint, relative to `base_url`
    #[serde(default = "defaults::guide_posts_path")]
    pub guide_posts_path: String,

    #[serde(default = "defaults::guide_page_size")]
    pub guide_page_size: usize,

    /// Guide post categories, display name to category id
    #[serde(default)]
    pub guide_categories: BTreeMap<String, String>,
}

impl Default for LawtalkConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::lawtalk_base_url(),
            request_delay_ms: defaults::lawtalk_delay(),
            page_size: defaults::lawtalk_page_size(),
            max_pages: defaults::lawtalk_max_pages(),
            consultation: defaults::enabled(),
            guide_posts_path: defaults::guide_posts_path(),
            guide_page_size: defaults::guide_page_size(),
            guide_categories: BTreeMap::new(),
        }
    }
}

/// EasyLaw Q&A list settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EasylawConfig {
    #[serde(default = "defaults::easylaw_base_url")]
    pub base_url: String,

    #[serde(default = "defaults::easylaw_delay")]
    pub request_delay_ms: u64,

    /// Items per list page (`pageTpe`)
    #[serde(default = "defaults::easylaw_page_size")]
    pub page_size: usize,

    /// Page cap (0 = until `max_empty_pages` empty pages)
    #[serde(default)]
    pub max_pages: usize,

    #[serde(default = "defaults::max_empty_pages")]
    pub max_empty_pages: usize,

    /// Optional search term (`sch`)
    #[serde(default)]
    pub search: String,
}

impl Default for EasylawConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::easylaw_base_url(),
            request_delay_ms: defaults::easylaw_delay(),
            page_size: defaults::easylaw_page_size(),
            max_pages: 0,
            max_empty_pages: defaults::max_empty_pages(),
            search: String::new(),
        }
    }
}

/// Law Open API precedent search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LawOpenApiConfig {
    /// Host serving `/DRF/lawSearch.do`
    #[serde(default = "defaults::law_open_api_base_url")]
    pub base_url: String,

    /// Host serving `/LSW/precInfoP.do`
    #[serde(default = "defaults::law_open_api_detail_base_url")]
    pub detail_base_url: String,

    #[serde(default = "defaults::law_open_api_delay")]
    pub request_delay_ms: u64,

    /// Results per search page
    #[serde(default = "defaults::law_open_api_display")]
    pub display: usize,

    /// Search pages per keyword
    #[serde(default = "defaults::law_open_api_max_pages")]
    pub max_pages: usize,

    /// Fetch and merge the full judgment text for each precedent
    #[serde(default = "defaults::enabled")]
    pub fetch_detail: bool,

    #[serde(default = "defaults::law_open_api_keywords")]
    pub keywords: Vec<String>,
}

impl Default for LawOpenApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::law_open_api_base_url(),
            detail_base_url: defaults::law_open_api_detail_base_url(),
            request_delay_ms: defaults::law_open_api_delay(),
            display: defaults::law_open_api_display(),
            max_pages: defaults::law_open_api_max_pages(),
            fetch_detail: defaults::enabled(),
            keywords: defaults::law_open_api_keywords(),
        }
    }
}

impl LawtalkConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl EasylawConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl LawOpenApiConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_base_delay() -> u64 {
        1000
    }
    pub fn max_parse_failures() -> u32 {
        3
    }
    pub fn enabled() -> bool {
        true
    }

    // Storage defaults
    pub fn data_dir() -> String {
        "data".into()
    }

    // Lawtalk defaults
    pub fn lawtalk_base_url() -> String {
        "https://www.lawtalk.co.kr".into()
    }
    pub fn lawtalk_delay() -> u64 {
        1000
    }
    pub fn lawtalk_page_size() -> usize {
        10
    }
    pub fn lawtalk_max_pages() -> usize {
        5
    }
    pub fn guide_posts_path() -> String {
        "/api/post/search".into()
    }
    pub fn guide_page_size() -> usize {
        9
    }

    // EasyLaw defaults
    pub fn easylaw_base_url() -> String {
        "https://www.easylaw.go.kr".into()
    }
    pub fn easylaw_delay() -> u64 {
        500
    }
    pub fn easylaw_page_size() -> usize {
        20
    }
    pub fn max_empty_pages() -> usize {
        3
    }

    // Law Open API defaults
    pub fn law_open_api_base_url() -> String {
        "http://www.law.go.kr".into()
    }
    pub fn law_open_api_detail_base_url() -> String {
        "https://www.law.go.kr".into()
    }
    pub fn law_open_api_delay() -> u64 {
        200
    }
    pub fn law_open_api_display() -> usize {
        20
    }
    pub fn law_open_api_max_pages() -> usize {
        5
    }
    pub fn law_open_api_keywords() -> Vec<String> {
        ["근로", "노동", "계약", "임대차", "전세", "월세"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}
