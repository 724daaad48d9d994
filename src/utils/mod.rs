//! Utility functions and helpers.

pub mod http;
pub mod retry;
pub mod time;

use std::time::Duration;

use regex::Regex;
use scraper::Selector;
use url::Url;

use crate::error::{AppError, Result};

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compile a CSS selector.
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::config(format!("invalid selector `{css}`: {e:?}")))
}

/// Compile a regular expression.
pub fn pattern(re: &str) -> Result<Regex> {
    Regex::new(re).map_err(|e| AppError::config(format!("invalid pattern `{re}`: {e}")))
}

/// Sleep between requests; zero skips the await entirely.
pub async fn polite_delay(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://www.easylaw.go.kr/CSP/").unwrap();
        assert_eq!(
            resolve_url(&base, "OnhunqueansInfoRetrieve.laf?onhunqueSeq=1"),
            "https://www.easylaw.go.kr/CSP/OnhunqueansInfoRetrieve.laf?onhunqueSeq=1"
        );
        assert_eq!(
            resolve_url(&base, "/CSP/x.laf"),
            "https://www.easylaw.go.kr/CSP/x.laf"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_resolve_bad_base() {
        assert!(resolve("not a url", "/x").is_none());
    }

    #[test]
    fn test_bad_selector_is_config_error() {
        assert!(selector("div.ok > a").is_ok());
        assert!(matches!(selector("div[[").unwrap_err(), AppError::Config(_)));
        assert!(pattern(r"(\d+").is_err());
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  임대차 \n\t 계약  해지 "), "임대차 계약 해지");
        assert_eq!(clean_text("\n \t"), "");
    }
}
