// src/config.rs

//! Runtime settings: the TOML config plus environment variables.
//!
//! Both are read once at startup and shared immutably for the rest of the run.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::models::Config;

/// Login credentials for a site.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Snapshot of the environment variables the collector reads.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit key/value pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Non-empty value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// `{SITE}_ID` / `{SITE}_PW` for a site id.
    pub fn credentials(&self, site: &str) -> Option<Credentials> {
        let prefix = site.to_uppercase();
        let username = self.get(&format!("{prefix}_ID"))?;
        let password = self.get(&format!("{prefix}_PW"))?;
        Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Law Open API key: `LAW_OPEN_API_ID`, falling back to `LAW_OPEN_API_OC`.
    pub fn law_open_api_key(&self) -> Option<&str> {
        self.get("LAW_OPEN_API_ID")
            .or_else(|| self.get("LAW_OPEN_API_OC"))
    }

    pub fn aws_profile(&self) -> Option<&str> {
        self.get("AWS_PROFILE")
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.get("AWS_REGION")
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.get("AWS_S3_BUCKET")
    }

    pub fn log_level(&self) -> Option<&str> {
        self.get("LOG_LEVEL")
    }

    pub fn data_dir(&self) -> Option<&str> {
        self.get("DATA_DIR")
    }
}

/// Config file plus environment, built once in `main`.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub config: Config,
    pub env: Environment,
}

impl Settings {
    pub fn new(config: Config, env: Environment) -> Self {
        Self { config, env }
    }

    /// Load the TOML config (missing file means defaults) and validate it.
    pub fn load(config_path: impl AsRef<Path>, env: Environment) -> Result<Self> {
        let path = config_path.as_ref();
        let config = if path.exists() {
            Config::load(path)?
        } else {
            log::info!("No config at {:?}, using defaults", path);
            Config::default()
        };
        config.validate()?;
        Ok(Self::new(config, env))
    }

    /// Local output root: `DATA_DIR` wins over `storage.data_dir`.
    pub fn data_dir(&self) -> &str {
        self.env
            .data_dir()
            .unwrap_or(self.config.storage.data_dir.as_str())
    }
}
