//! Runtime configuration, resolved once at startup.

use anyhow::{bail, Result};
use std::env;
use std::time::Duration;

/// Base URL used when `MEAL_API_BASE` is not set
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Prefix for every service endpoint, used verbatim
    pub api_base: String,
    /// Upper bound for the `/health` probe
    pub probe_timeout: Duration,
    /// Upper bound for the `/analyze` upload + inference
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// - `MEAL_API_BASE`: analysis service base URL
    /// - `MEAL_PROBE_TIMEOUT_SECS`: liveness probe timeout
    /// - `MEAL_REQUEST_TIMEOUT_SECS`: analyze request timeout
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_base = env::var("MEAL_API_BASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.api_base);

        Self {
            api_base,
            probe_timeout: secs_from_env("MEAL_PROBE_TIMEOUT_SECS").unwrap_or(defaults.probe_timeout),
            request_timeout: secs_from_env("MEAL_REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout),
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn docs_url(&self) -> String {
        format!("{}/api/docs", self.api_base)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base.is_empty() {
            bail!("api base URL cannot be empty");
        }

        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            bail!("api base URL must start with http:// or https:// (got {})", self.api_base);
        }

        if self.probe_timeout.is_zero() || self.request_timeout.is_zero() {
            bail!("timeouts cannot be zero");
        }

        Ok(())
    }
}

fn secs_from_env(key: &str) -> Option<Duration> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            log::warn!("⚠️ Ignoring {}={:?}: not a whole number of seconds", key, raw);
            None
        }
    }
}
