//! Run configuration: an optional TOML file overlaid with environment variables.

use crate::{ConfigError, Platform, ProxyEndpoint};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CONFIG_PATH_VAR: &str = "JOBSCOUT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "jobscout.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serp_api_key: Option<String>,
    pub search_keyword: Option<String>,
    pub days_back: Option<u32>,
    pub serp_pages: u32,
    pub platforms: Vec<Platform>,
    pub output_path: PathBuf,
    pub worker_pool_size: usize,
    pub detail_concurrency: usize,
    pub detail_delay_ms: u64,
    pub page_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub match_recency: bool,
    pub sort_newest_first: bool,
    pub proxies: Vec<ProxyEndpoint>,
    pub proxy_list_url: Option<String>,
    pub schedule_interval_hours: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            serp_api_key: None,
            search_keyword: None,
            days_back: Some(3),
            serp_pages: 2,
            platforms: Platform::ALL.to_vec(),
            output_path: PathBuf::from("jobs.json"),
            worker_pool_size: 10,
            detail_concurrency: 3,
            detail_delay_ms: 100,
            page_delay_ms: 500,
            request_timeout_secs: 30,
            max_retries: 3,
            match_recency: true,
            sort_newest_first: true,
            proxies: Vec::new(),
            proxy_list_url: None,
            schedule_interval_hours: None,
        }
    }
}

impl AppConfig {
    /// Loads the file named by `JOBSCOUT_CONFIG` (or `jobscout.toml`), then
    /// applies environment overrides and validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_PATH_VAR).ok();
        let path = explicit
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = match Self::from_file(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            // Only an explicitly requested file has to exist.
            Err(ConfigError::FileNotFound { .. }) if explicit.is_none() => {
                debug!("No {} found, using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(e),
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::InvalidFormat {
                details: e.to_string(),
            },
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Environment wins over the file. `lookup` is injectable for tests.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("SERP_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.serp_api_key = Some(key.trim().to_string());
        }
        if let Some(keyword) = lookup("SEARCH_QUERY") {
            let keyword = keyword.trim();
            self.search_keyword = (!keyword.is_empty()).then(|| keyword.to_string());
        }
        if let Some(pages) = lookup("SERP_PAGES") {
            match pages.trim().parse() {
                Ok(pages) => self.serp_pages = pages,
                Err(_) => warn!("Ignoring unparsable SERP_PAGES={:?}", pages),
            }
        }
        if let Some(days) = lookup("SEARCH_DAYS_BACK") {
            let days = days.trim();
            if days.is_empty() || days.eq_ignore_ascii_case("none") {
                self.days_back = None;
            } else {
                match days.parse() {
                    Ok(days) => self.days_back = Some(days),
                    Err(_) => warn!("Ignoring unparsable SEARCH_DAYS_BACK={:?}", days),
                }
            }
        }
        if let Some(output) = lookup("JOBSCOUT_OUTPUT").filter(|v| !v.trim().is_empty()) {
            self.output_path = PathBuf::from(output.trim());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("serp_pages", self.serp_pages as u64),
            ("worker_pool_size", self.worker_pool_size as u64),
            ("detail_concurrency", self.detail_concurrency as u64),
            ("request_timeout_secs", self.request_timeout_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            }
        }
        if self.platforms.is_empty() {
            return Err(ConfigError::MissingField {
                field: "platforms".to_string(),
            });
        }
        if self.schedule_interval_hours == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "schedule_interval_hours".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Missing credentials are reported once, never treated as fatal.
    pub fn warn_missing_credentials(&self) {
        if self.serp_api_key.is_none() {
            warn!("SERP_API_KEY is not set; search discovery requests will be rejected upstream");
        }
    }
}
