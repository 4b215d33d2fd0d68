//! Runtime settings loaded from a YAML file.
//!
//! Every key is optional except the token secret, which may instead come from
//! the `SALES_API_TOKEN_SECRET` environment variable. Command-line flags are
//! applied on top by the caller.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dataset::DEFAULT_SNAPSHOT_PATTERN;

pub const TOKEN_SECRET_ENV: &str = "SALES_API_TOKEN_SECRET";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub server: ServerSettings,
    pub data: DataSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataSettings {
    /// Directory holding the snapshot files.
    pub directory: PathBuf,
    /// File-name pattern; `*` matches any run of characters.
    pub pattern: String,
    /// Start with an empty table instead of failing when nothing matches.
    pub allow_empty: bool,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("app/data"),
            pattern: DEFAULT_SNAPSHOT_PATTERN.to_string(),
            allow_empty: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSettings {
    pub token_secret: String,
    pub token_ttl_secs: u64,
    pub users: Vec<UserEntry>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_secs: 3600,
            users: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserEntry {
    pub email: String,
    /// Hex SHA-256 of the password (`sales-api hash-password`).
    pub password_sha256: String,
}

impl Settings {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading configuration file {path:?}"))?;
        Self::from_yaml_str(&raw).with_context(|| format!("Parsing configuration file {path:?}"))
    }

    /// Loads `path` when given, defaults otherwise, then applies environment
    /// overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(TOKEN_SECRET_ENV).filter(|s| !s.is_empty()) {
            self.auth.token_secret = secret;
        }
    }
}
