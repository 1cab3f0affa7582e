//! Retried, cached, rate-limited HTTP GET for the acquisition loops.

use std::time::{Duration, Instant};

use common::error::AppError;
use tokio::time::sleep;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    RetryIf,
};
use tracing::{debug, info};

use crate::cache::ContentCache;

const RETRY_BASE_DELAY_MS: u64 = 2_000;
const RETRY_MAX_DELAY_SECS: u64 = 30;
const MAX_RETRIES: usize = 2;

/// Sequential, single-caller fetcher. Cache hits bypass both the network
/// and the inter-request delay; live bodies are written to the cache
/// before they are returned, so a crash after a fetch never loses the
/// round trip.
pub struct RateLimitedFetcher {
    client: reqwest::Client,
    cache: ContentCache,
    delay: Duration,
    last_live_fetch: Option<Instant>,
}

impl RateLimitedFetcher {
    /// The client is built by the caller (user agent, timeouts) and
    /// injected, so tests can point it at fixtures.
    pub fn new(client: reqwest::Client, cache: ContentCache, delay: Duration) -> Self {
        Self {
            client,
            cache,
            delay,
            last_live_fetch: None,
        }
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Fetch an HTML page, preferring the cache.
    pub async fn fetch_text(&mut self, cache_key: &str, url: &str) -> Result<String, AppError> {
        if let Some(cached) = self.cache.get_html(cache_key).await? {
            return Ok(cached);
        }

        info!(url, cache_key, "fetching page");
        let response = self.fetch_live(url).await?;
        let body = response
            .text()
            .await
            .map_err(|err| AppError::FetchFailed(format!("{url}: {err}")))?;

        self.cache.put_html(cache_key, &body).await?;
        Ok(body)
    }

    /// Fetch a PDF body, preferring the cache.
    pub async fn fetch_pdf(&mut self, cache_key: &str, url: &str) -> Result<Vec<u8>, AppError> {
        if let Some(cached) = self.cache.get_pdf(cache_key).await? {
            return Ok(cached);
        }

        info!(url, cache_key, "downloading pdf");
        let response = self.fetch_live(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| AppError::FetchFailed(format!("{url}: {err}")))?;

        self.cache.put_pdf(cache_key, &bytes).await?;
        info!(cache_key, bytes = bytes.len(), "downloaded pdf");
        Ok(bytes.to_vec())
    }

    async fn fetch_live(&mut self, url: &str) -> Result<reqwest::Response, AppError> {
        self.throttle().await;

        let strategy = ExponentialBackoff::from_millis(RETRY_BASE_DELAY_MS)
            .max_delay(Duration::from_secs(RETRY_MAX_DELAY_SECS))
            .map(jitter)
            .take(MAX_RETRIES);

        let response = RetryIf::spawn(
            strategy,
            || self.client.get(url).send(),
            is_transient,
        )
        .await
        .map_err(|err| AppError::FetchFailed(format!("{url}: {err}")))?;

        self.last_live_fetch = Some(Instant::now());

        // Non-retryable HTTP errors surface immediately.
        response
            .error_for_status()
            .map_err(|err| AppError::FetchFailed(format!("{url}: {err}")))
    }

    /// Minimum inter-request delay, counted between live fetches only.
    async fn throttle(&self) {
        if let Some(last) = self.last_live_fetch {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                let wait = self.delay - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "rate limit");
                sleep(wait).await;
            }
        }
    }
}

/// Connection resets and timeouts are worth retrying; anything else is not.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
