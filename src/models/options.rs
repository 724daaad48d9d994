// src/models/options.rs

//! Per-run crawl options.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How much of each record is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ResultDetail {
    /// Core fields only
    #[default]
    Simple,
    /// Full payload
    Detail,
}

impl ResultDetail {
    pub fn is_simple(self) -> bool {
        self == Self::Simple
    }
}

/// Where batches are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Local,
    S3,
}

/// Which records are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Only records newer than the stored checkpoint
    New,
    /// Everything, ignoring the checkpoint
    #[default]
    All,
}

impl fmt::Display for ResultDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Simple => "simple",
            Self::Detail => "detail",
        })
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::S3 => "s3",
        })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "new",
            Self::All => "all",
        })
    }
}

/// Options for one invocation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlOptions {
    /// Registered site identifier
    pub site: String,

    /// Simple or detailed records
    pub result_detail: ResultDetail,

    /// Local disk or S3
    pub storage_type: StorageType,

    /// Incremental or full crawl
    pub scope: Scope,
}

impl CrawlOptions {
    /// Options with the defaults `simple local all`.
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            result_detail: ResultDetail::default(),
            storage_type: StorageType::default(),
            scope: Scope::default(),
        }
    }

    pub fn with_detail(mut self, detail: ResultDetail) -> Self {
        self.result_detail = detail;
        self
    }

    pub fn with_storage(mut self, storage: StorageType) -> Self {
        self.storage_type = storage;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Whether records are trimmed to their core fields.
    pub fn simple_result(&self) -> bool {
        self.result_detail.is_simple()
    }
}

impl fmt::Display for CrawlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.site, self.result_detail, self.storage_type, self.scope
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_simple_local_all() {
        let options = CrawlOptions::new("lawtalk");
        assert_eq!(options.result_detail, ResultDetail::Simple);
        assert_eq!(options.storage_type, StorageType::Local);
        assert_eq!(options.scope, Scope::All);
        assert!(options.simple_result());
        assert_eq!(options.to_string(), "lawtalk (simple, local, all)");
    }

    #[test]
    fn test_builder() {
        let options = CrawlOptions::new("easylaw")
            .with_detail(ResultDetail::Detail)
            .with_storage(StorageType::S3)
            .with_scope(Scope::New);
        assert!(!options.simple_result());
        assert_eq!(options.to_string(), "easylaw (detail, s3, new)");
    }
}
