//! Runtime settings read from the environment (after `.env` is loaded).
//!
//! | Variable            | Default                          |
//! |---------------------|----------------------------------|
//! | `LASS_URL`          | NYC Open Data LASS CSV export    |
//! | `LEP_URL`           | NYC Open Data LEP CSV export     |
//! | `SOCRATA_APP_TOKEN` | unset (anonymous requests)       |
//! | `CACHE_TTL_SECS`    | `3600`                           |
//! | `HTTP_TIMEOUT_SECS` | `30`                             |
//! | `SOSI_DATA_DIR`     | `.`                              |

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_TTL;
use crate::datasets::{lass, lep};
use crate::fetch::{ApiKey, BasicClient, HttpClient};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub lass_url: String,
    pub lep_url: String,
    pub app_token: Option<String>,
    pub cache_ttl: Duration,
    pub http_timeout: Duration,
    pub sosi_data_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable lookup. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str, default: Duration| -> Result<Duration> {
            match get(key) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{key} must be a whole number of seconds, got '{v}'")),
                None => Ok(default),
            }
        };

        Ok(Self {
            lass_url: get("LASS_URL").unwrap_or_else(|| lass::DEFAULT_URL.to_string()),
            lep_url: get("LEP_URL").unwrap_or_else(|| lep::DEFAULT_URL.to_string()),
            app_token: get("SOCRATA_APP_TOKEN"),
            cache_ttl: secs("CACHE_TTL_SECS", DEFAULT_TTL)?,
            http_timeout: secs("HTTP_TIMEOUT_SECS", Duration::from_secs(30))?,
            sosi_data_dir: get("SOSI_DATA_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from),
        })
    }

    /// HTTP client for remote feeds, sending the app token when one is set.
    pub fn http_client(&self) -> Result<Box<dyn HttpClient>> {
        let basic = BasicClient::with_timeout(self.http_timeout)?;
        Ok(match &self.app_token {
            Some(token) => Box::new(ApiKey::socrata(basic, token)?),
            None => Box::new(basic),
        })
    }
}
