// src/config.rs

//! Runtime configuration
//!
//! Everything here has a default matching the stock deployment; the CLI
//! overrides fields from flags or environment variables.

use crate::error::Result;
use crate::store::LocalStore;
use std::path::PathBuf;
use std::time::Duration;

/// Origin serving `index.xml` and, usually, the package tarballs
pub const DEFAULT_BASE_URL: &str = "http://93.100.25.80:8080/reposx/";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL the index is fetched from
    pub base_url: String,

    /// Store root; `None` means `<home>/.local/reposx`
    pub root: Option<PathBuf>,

    /// Per-request HTTP timeout; `None` disables it
    pub timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            root: None,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl Config {
    /// Configuration pointing at a different origin, other fields default
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Open (and create) the local store this configuration points at
    pub fn open_store(&self) -> Result<LocalStore> {
        match &self.root {
            Some(root) => LocalStore::open(root),
            None => LocalStore::open_default(),
        }
    }
}
