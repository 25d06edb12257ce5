//! Upstream API client for the projections provider
//!
//! Performs the network round trips of a single refresh cycle: one GET per
//! endpoint (`/leagues` for the sport list, `/projections` for the full
//! projection set with included players and games). The client holds no state
//! across calls and never retries internally; retry policy belongs to the
//! refresh scheduler.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::data::RawPayload;

/// Query parameters sent with the projections request, mirroring the
/// provider's web app
const PROJECTION_PARAMS: &[(&str, &str)] = &[
    ("single_stat", "true"),
    ("game_mode", "pickem"),
    ("per_page", "250"),
];

/// Errors that can occur during an upstream fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request exceeded the configured timeout
    #[error("upstream request timed out")]
    Timeout,

    /// The connection could not be established or was dropped
    #[error("upstream connection failed: {0}")]
    ConnectionFailed(String),

    /// The provider answered with a non-success HTTP status
    #[error("upstream returned HTTP {0}")]
    HttpStatus(u16),
}

impl FetchError {
    /// Classifies a reqwest transport error into the fetch taxonomy
    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::ConnectionFailed(err.to_string())
        }
    }
}

/// Client for fetching the full current dataset from the provider
///
/// Safe to invoke from the single in-flight refresh cycle; the underlying
/// reqwest client is cheaply cloneable and connection pooling is internal.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    /// HTTP client for making requests
    http: Client,
    /// Base URL of the provider API
    base_url: String,
    /// Per-request deadline
    timeout: Duration,
}

impl UpstreamClient {
    /// Creates a new UpstreamClient for the given base URL and request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Fetches the full current dataset from the provider
    ///
    /// The two endpoints are fetched concurrently; each request is bounded
    /// by the configured timeout, and the first failure aborts the fetch.
    ///
    /// # Returns
    /// * `Ok(RawPayload)` - The raw bodies of both endpoint responses
    /// * `Err(FetchError)` - On timeout, transport failure, or HTTP error status
    pub async fn fetch(&self) -> Result<RawPayload, FetchError> {
        let (leagues, projections) = futures::try_join!(
            self.get_body("leagues", &[]),
            self.get_body("projections", PROJECTION_PARAMS),
        )?;

        Ok(RawPayload {
            leagues,
            projections,
        })
    }

    /// Performs a single GET against an endpoint and returns the response body
    async fn get_body(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint);
        debug!(%url, "fetching upstream endpoint");

        let response = self
            .http
            .get(&url)
            .query(params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        response.text().await.map_err(FetchError::from_transport)
    }
}
