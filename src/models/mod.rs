// src/models/mod.rs

//! Data models for the collector.

pub mod batch;
pub mod config;
pub mod options;

pub use batch::Batch;
pub use config::{
    Config, CrawlerConfig, EasylawConfig, LawOpenApiConfig, LawtalkConfig, StorageConfig,
};
pub use options::{CrawlOptions, ResultDetail, Scope, StorageType};
