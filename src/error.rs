// src/error.rs

//! Unified error handling for the collector.

use std::fmt;

use thiserror::Error;

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The requested site is not in the registry
    #[error("Unknown site '{site}'. Available sites: {}", available.join(", "))]
    UnknownSite {
        site: String,
        available: Vec<&'static str>,
    },

    /// Login or credential failure
    #[error("Authentication failed for {site}: {message}")]
    Authentication { site: String, message: String },

    /// HTTP transport failed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Writing output or checkpoints failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unexpected page or response shape
    #[error("Parse error for {context}: {message}")]
    Parse { context: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create an authentication error for a site.
    pub fn auth(site: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Authentication {
            site: site.into(),
            message: message.to_string(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the failure is transient and worth another attempt.
    ///
    /// Timeouts, connection failures, `429` and `5xx` responses qualify.
    /// Authentication, parsing and local storage failures never do.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
            }
            Self::HttpStatus { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }

    /// Whether the paging driver may skip the page that produced this error.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
