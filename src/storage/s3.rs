//! AWS S3 sink.
//!
//! Objects are keyed `{prefix}/{site}/{relative_path}`. Uploads are retried
//! with exponential backoff; collisions are detected with a HEAD request.

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use async_trait::async_trait;

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::Batch;
use crate::storage::{
    StorageSink, WriteReceipt, check_relative, name_attempts, names_exhausted, suffixed_path,
};
use crate::utils::http::retry_config;
use crate::utils::retry::{RetryConfig, with_retry_if};

/// S3-based batch storage.
pub struct S3Sink {
    client: Client,
    bucket: String,
    prefix: String,
    retry: RetryConfig,
}

impl S3Sink {
    /// Create a new S3 sink.
    pub fn new(
        client: Client,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
            retry,
        }
    }

    /// Create a sink from `AWS_PROFILE`, `AWS_REGION` and `AWS_S3_BUCKET`.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let bucket = settings
            .env
            .s3_bucket()
            .ok_or_else(|| AppError::config("AWS_S3_BUCKET is not set"))?
            .to_string();

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = settings.env.aws_profile() {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = settings.env.aws_region() {
            loader = loader.region(Region::new(region.to_string()));
        }
        let sdk_config = loader.load().await;
        let client = Client::new(&sdk_config);

        Ok(Self::new(
            client,
            bucket,
            settings.config.storage.s3_prefix.clone(),
            retry_config(&settings.config.crawler),
        ))
    }

    /// Full object key for a site-relative path.
    fn key(&self, site: &str, relative_path: &str) -> String {
        if self.prefix.is_empty() {
            format!("{site}/{relative_path}")
        } else {
            format!("{}/{site}/{relative_path}", self.prefix)
        }
    }

    fn uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> Result<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(AppError::storage(format!(
                        "HEAD {} failed: {service_err}",
                        self.uri(key)
                    )))
                }
            }
        }
    }

    /// Upload bytes, retrying every failure until attempts run out.
    async fn put_bytes(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        with_retry_if(
            &self.retry,
            || async move {
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .body(ByteStream::from(bytes.to_vec()))
                    .content_type(content_type)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|e| {
                        AppError::storage(format!("PUT {} failed: {e}", self.uri(key)))
                    })
            },
            |e| matches!(e, AppError::Storage(_)),
        )
        .await
    }
}

#[async_trait]
impl StorageSink for S3Sink {
    async fn prepare(&self, site: &str) -> Result<String> {
        // S3 has no directories; the prefix exists once something is written.
        Ok(self.uri(&self.key(site, "")))
    }

    async fn write_batch(
        &self,
        site: &str,
        relative_path: &str,
        batch: &Batch,
    ) -> Result<WriteReceipt> {
        check_relative(relative_path)?;
        let bytes = serde_json::to_vec_pretty(batch)?;

        for attempt in name_attempts() {
            let candidate = suffixed_path(relative_path, attempt);
            let key = self.key(site, &candidate);
            if self.exists(&key).await? {
                continue;
            }
            self.put_bytes(&key, &bytes, "application/json").await?;
            log::info!("Uploaded {} records to {}", batch.total_fetched, self.uri(&key));
            return Ok(WriteReceipt {
                location: self.uri(&key),
                relative_path: candidate,
            });
        }

        Err(names_exhausted(relative_path))
    }

    async fn read_marker(&self, site: &str, relative_path: &str) -> Result<Option<String>> {
        check_relative(relative_path)?;
        let key = self.key(site, relative_path);
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::storage(format!("GET {}: {e}", self.uri(&key))))?;
                let text = String::from_utf8(bytes.into_bytes().to_vec()).map_err(|e| {
                    AppError::storage(format!("{} is not UTF-8: {e}", self.uri(&key)))
                })?;
                Ok(Some(text))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::info!("No marker at {}", self.uri(&key));
                    Ok(None)
                } else {
                    Err(AppError::storage(format!(
                        "GET {} failed: {service_err}",
                        self.uri(&key)
                    )))
                }
            }
        }
    }

    async fn write_marker(&self, site: &str, relative_path: &str, contents: &str) -> Result<()> {
        check_relative(relative_path)?;
        let key = self.key(site, relative_path);
        self.put_bytes(&key, contents.as_bytes(), "text/plain; charset=utf-8")
            .await
    }
}
