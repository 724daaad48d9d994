// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::retry::{RetryConfig, with_retry};

/// Create a configured asynchronous HTTP client with a cookie store.
pub fn create_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .cookie_store(true)
        .build()?;
    Ok(client)
}

/// Retry policy derived from the crawler settings.
pub fn retry_config(config: &CrawlerConfig) -> RetryConfig {
    RetryConfig::new(config.max_retries, config.retry_base_delay_ms)
}

/// Turn a non-success status into `AppError::HttpStatus`.
pub fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AppError::HttpStatus {
            url: response.url().to_string(),
            status: status.as_u16(),
        })
    }
}

/// Send a request built by `build`, retrying transient failures.
///
/// `build` is called once per attempt since a sent request is consumed.
pub async fn send<F>(retry: &RetryConfig, build: F) -> Result<reqwest::Response>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    with_retry(retry, || {
        let request = build();
        async move { check_status(request.send().await?) }
    })
    .await
}

/// Read a response body as JSON, reporting malformed bodies as parse errors.
pub async fn read_json(response: reqwest::Response, context: &str) -> Result<Value> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| AppError::parse(context, e))
}

