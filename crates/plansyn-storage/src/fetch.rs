//! Retrying HTTP client for the public planning APIs.
//!
//! Collectors run sequentially, so there is no concurrency control here;
//! politeness comes from the timeout, the identifying user agent, and
//! exponential backoff on retryable failures (server errors, rate limits,
//! transport faults).

use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::warn;

/// 5xx and 429 are worth retrying; anything else in an HTTP response is
/// a stable answer.
fn retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn retryable_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, doubling per completed attempt and
    /// capped at `max_delay`.
    pub fn delay(&self, completed_attempts: u32) -> Duration {
        let factor = 2u32.saturating_pow(completed_attempts.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: Some("plansyn/0.1".to_string()),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub final_url: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed after retries: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self {
            client,
            retry: config.retry,
        })
    }

    /// GET `url`, retrying retryable failures with exponential backoff.
    pub async fn fetch_bytes(
        &self,
        source_id: &str,
        url: &str,
    ) -> Result<FetchedResponse, FetchError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let (error, retryable) = match self.attempt_get(url).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            if !retryable || attempt >= self.retry.max_attempts {
                return Err(error);
            }
            let delay = self.retry.delay(attempt - 1);
            warn!(
                source_id,
                url,
                attempt,
                %error,
                delay_ms = delay.as_millis() as u64,
                "retrying fetch"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One GET attempt; failures come back tagged with whether a retry
    /// could help.
    async fn attempt_get(&self, url: &str) -> Result<FetchedResponse, (FetchError, bool)> {
        let response = self.client.get(url).send().await.map_err(|err| {
            let retryable = retryable_transport(&err);
            (FetchError::Request(err), retryable)
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return Err((
                FetchError::HttpStatus {
                    status: status.as_u16(),
                    url: final_url,
                },
                retryable_status(status),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| {
                let retryable = retryable_transport(&err);
                (FetchError::Request(err), retryable)
            })?
            .to_vec();

        Ok(FetchedResponse {
            status,
            final_url,
            body,
        })
    }

    /// GET `base_url` with `params` encoded into the query string.
    pub async fn fetch_with_params(
        &self,
        source_id: &str,
        base_url: &str,
        params: &[(&str, &str)],
    ) -> Result<FetchedResponse, FetchError> {
        let url = reqwest::Url::parse_with_params(base_url, params).map_err(|err| {
            FetchError::InvalidUrl {
                url: base_url.to_string(),
                reason: err.to_string(),
            }
        })?;
        self.fetch_bytes(source_id, url.as_str()).await
    }
}
