//! Purpose: Resolve client configuration from defaults, environment, and flags.
//! Exports: `CatalogConfig` and the default constants.
//! Role: Single source for remote endpoint, timeouts, and view defaults.
//! Invariants: Precedence is flags > environment > defaults.
//! Invariants: Limits and timeouts are always positive after validation.
use crate::core::board::DEFAULT_NOTICE_TTL;
use crate::core::error::{Error, ErrorKind};
use crate::core::filter::DEFAULT_PAGE_LIMIT;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";
pub const DEFAULT_RESOURCE: &str = "posts";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_FETCH_LIMIT: usize = 100;

pub const ENV_BASE_URL: &str = "CATALOG_BASE_URL";
pub const ENV_RESOURCE: &str = "CATALOG_RESOURCE";
pub const ENV_TIMEOUT_MS: &str = "CATALOG_TIMEOUT_MS";
pub const ENV_FETCH_LIMIT: &str = "CATALOG_FETCH_LIMIT";
pub const ENV_PAGE_LIMIT: &str = "CATALOG_PAGE_LIMIT";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CatalogConfig {
    pub base_url: String,
    pub resource: String,
    pub timeout: Duration,
    /// Records requested by the initial load; the whole working set lives client-side.
    pub fetch_limit: usize,
    pub page_limit: usize,
    pub notice_ttl: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            resource: DEFAULT_RESOURCE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            page_limit: DEFAULT_PAGE_LIMIT,
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|value| !value.trim().is_empty()) {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(resource) = lookup(ENV_RESOURCE).filter(|value| !value.trim().is_empty()) {
            config.resource = resource.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            config.timeout = Duration::from_millis(parse_positive(ENV_TIMEOUT_MS, &raw)? as u64);
        }
        if let Some(raw) = lookup(ENV_FETCH_LIMIT) {
            config.fetch_limit = parse_positive(ENV_FETCH_LIMIT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PAGE_LIMIT) {
            config.page_limit = parse_positive(ENV_PAGE_LIMIT, &raw)?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.timeout.is_zero() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("timeout must be greater than zero")
                .with_hint("Use a positive value like 5000 (milliseconds)."));
        }
        if self.fetch_limit == 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("fetch limit must be greater than zero")
                .with_hint("Use a positive value like 100."));
        }
        if self.page_limit == 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("page limit must be greater than zero")
                .with_hint("Use a positive value like 10."));
        }
        Ok(())
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize, Error> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("{key} must be a positive integer"))
            .with_hint(format!("Got `{raw}`; unset it or use a value like 10."))),
    }
}
