//! Client configuration

use std::time::Duration;

use dra_core::task::DEFAULT_HISTORY_CAP;

/// Default service address, matching the service's own default port
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TASK_POLL_SECS: u64 = 2;
const DEFAULT_DASHBOARD_REFRESH_SECS: u64 = 30;

/// Connection and cadence settings for a client session
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service address, kept without a trailing slash
    pub base_url: String,
    /// Hard cap on any single request
    pub request_timeout: Duration,
    /// Cadence of status polls while a task is running
    pub task_poll_interval: Duration,
    /// Cadence of full dashboard refreshes
    pub dashboard_refresh_interval: Duration,
    /// Number of past tasks kept in memory
    pub history_cap: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            task_poll_interval: Duration::from_secs(DEFAULT_TASK_POLL_SECS),
            dashboard_refresh_interval: Duration::from_secs(DEFAULT_DASHBOARD_REFRESH_SECS),
            history_cap: DEFAULT_HISTORY_CAP,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset or unparsable
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(url) = std::env::var("DRA_API_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            config.base_url = normalize_base_url(&url);
        }
        if let Some(timeout) = env_secs("DRA_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = timeout;
        }
        if let Some(interval) = env_secs("DRA_TASK_POLL_SECS") {
            config.task_poll_interval = interval;
        }
        if let Some(interval) = env_secs("DRA_DASHBOARD_REFRESH_SECS") {
            config.dashboard_refresh_interval = interval;
        }
        if let Some(cap) = std::env::var("DRA_HISTORY_CAP")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|cap| *cap > 0)
        {
            config.history_cap = cap;
        }

        config
    }

    /// Set the service address
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(&base_url.into());
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the status poll cadence
    pub fn with_task_poll_interval(mut self, interval: Duration) -> Self {
        self.task_poll_interval = interval;
        self
    }

    /// Set the dashboard refresh cadence
    pub fn with_dashboard_refresh_interval(mut self, interval: Duration) -> Self {
        self.dashboard_refresh_interval = interval;
        self
    }

    /// Set the history capacity
    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap.max(1);
        self
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
