//! Command-line interface parsing for the propfeed service
//!
//! This module handles parsing of CLI arguments using clap and merging them
//! over the built-in defaults into a [`Config`].

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::config::Config;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// A duration flag was given a zero value
    #[error("--{0} must be greater than zero seconds")]
    ZeroDuration(&'static str),
}

/// Propfeed - cached API service for fantasy sports projections
#[derive(Parser, Debug)]
#[command(name = "propfeed")]
#[command(about = "Fronts a sports projections provider with a refreshed in-memory cache")]
#[command(version)]
pub struct Cli {
    /// Base URL of the upstream projections provider
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port the HTTP server listens on
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Seconds between scheduled refresh cycles
    #[arg(long, value_name = "SECONDS")]
    pub refresh_interval: Option<u64>,

    /// Upstream request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub fetch_timeout: Option<u64>,

    /// Initial backoff after a failed refresh, in seconds
    #[arg(long, value_name = "SECONDS")]
    pub base_backoff: Option<u64>,

    /// Maximum backoff between refresh attempts, in seconds
    #[arg(long, value_name = "SECONDS")]
    pub max_backoff: Option<u64>,
}

impl Config {
    /// Builds a Config from parsed CLI arguments layered over the defaults
    ///
    /// # Returns
    /// * `Ok(Config)` with CLI overrides applied
    /// * `Err(CliError)` if a duration flag is zero
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut config = Config::default();

        if let Some(ref base_url) = cli.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(ref host) = cli.host {
            config.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(secs) = cli.refresh_interval {
            config.refresh_interval = nonzero_secs(secs, "refresh-interval")?;
        }
        if let Some(secs) = cli.fetch_timeout {
            config.fetch_timeout = nonzero_secs(secs, "fetch-timeout")?;
        }
        if let Some(secs) = cli.base_backoff {
            config.base_backoff = nonzero_secs(secs, "base-backoff")?;
        }
        if let Some(secs) = cli.max_backoff {
            config.max_backoff = nonzero_secs(secs, "max-backoff")?;
        }

        Ok(config)
    }
}

/// Converts a seconds flag into a Duration, rejecting zero
fn nonzero_secs(secs: u64, flag: &'static str) -> Result<Duration, CliError> {
    if secs == 0 {
        return Err(CliError::ZeroDuration(flag));
    }
    Ok(Duration::from_secs(secs))
}
