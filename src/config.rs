//! Runtime configuration for the propfeed service
//!
//! Holds the upstream endpoint settings, refresh cadence, backoff policy,
//! and the HTTP bind address. Defaults match the upstream provider's public
//! API and a 15-minute refresh interval; everything is overridable from the
//! command line (see [`crate::cli`]).

use std::time::Duration;

/// Default base URL of the upstream projections provider
pub const DEFAULT_BASE_URL: &str = "https://api.prizepicks.com";

/// Default per-request upstream timeout
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between scheduled refresh cycles (15 minutes)
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Default base delay for exponential backoff after a failed refresh
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(30);

/// Default cap on the backoff delay
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(15 * 60);

/// Complete service configuration, supplied at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the upstream provider API
    pub base_url: String,
    /// Hard deadline for each upstream request
    pub fetch_timeout: Duration,
    /// Interval between scheduled refresh cycles
    pub refresh_interval: Duration,
    /// Initial backoff delay after a failed refresh
    pub base_backoff: Duration,
    /// Maximum backoff delay between refresh attempts
    pub max_backoff: Duration,
    /// Address the HTTP server binds to
    pub host: String,
    /// Port the HTTP server listens on
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}
