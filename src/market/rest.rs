//! Market REST Client
//!
//! Fetches the item catalog, per-good order books and per-good statistics
//! from the warframe.market API. Rate limiting shows up as non-200 responses,
//! so requests are retried after a random back-off.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT},
    Client, StatusCode,
};
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{decode_catalog, decode_orders, decode_statistics, CatalogItem};
use crate::config::{FetchConfig, MarketConfig};
use crate::oracle::StatHistory;
use crate::types::Order;

/// Source of raw market data. The snapshot refresher only talks to this.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Every tradeable good
    async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>>;

    /// All resting orders for one good
    async fn fetch_orders(&self, slug: &str) -> Result<Vec<Order>>;

    /// Hourly and daily closed-trade statistics for one good
    async fn fetch_statistics(&self, slug: &str) -> Result<StatHistory>;
}

/// HTTP client for the warframe.market API
pub struct MarketClient {
    client: Client,
    base_url: String,
    max_retries: usize,
    retry_jitter_ms: u64,
}

impl MarketClient {
    pub fn new(market: &MarketConfig, fetch: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&market.user_agent).context("Invalid user agent header")?,
        );
        headers.insert(
            "Platform",
            HeaderValue::from_str(&market.platform).context("Invalid platform header")?,
        );
        headers.insert(
            "Language",
            HeaderValue::from_str(&market.language).context("Invalid language header")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: market.api_url.trim_end_matches('/').to_string(),
            max_retries: fetch.max_retries,
            retry_jitter_ms: fetch.retry_jitter_ms,
        })
    }

    fn backoff(&self) -> Duration {
        if self.retry_jitter_ms == 0 {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(0..self.retry_jitter_ms);
        Duration::from_millis(ms)
    }

    /// GET `path` until it answers 200, at most `max_retries` extra attempts.
    /// Only throttling and server errors are retried.
    async fn get_with_retry(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            match self.client.get(&url).send().await {
                Ok(resp) if resp.status() == StatusCode::OK => {
                    debug!(url = %url, attempt, "Fetched");
                    return resp
                        .text()
                        .await
                        .with_context(|| format!("Failed to read body of {}", url));
                }
                Ok(resp) => {
                    let status = resp.status();
                    let retryable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    if !retryable {
                        bail!("GET {} failed with status {}", url, status);
                    }
                    if attempt > self.max_retries {
                        bail!("GET {} failed with status {} after {} attempts", url, status, attempt);
                    }
                    warn!(url = %url, status = %status, attempt, "Request throttled, retrying");
                }
                Err(e) => {
                    if attempt > self.max_retries {
                        return Err(e)
                            .with_context(|| format!("GET {} failed after {} attempts", url, attempt));
                    }
                    warn!(url = %url, error = %e, attempt, "Request failed, retrying");
                }
            }

            let delay = self.backoff();
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl MarketSource for MarketClient {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>> {
        let body = self.get_with_retry("/v2/items").await?;
        let items = decode_catalog(&body).context("Malformed item catalog")?;
        Ok(items)
    }

    async fn fetch_orders(&self, slug: &str) -> Result<Vec<Order>> {
        let body = self
            .get_with_retry(&format!("/v2/orders/item/{}", slug))
            .await?;
        let orders =
            decode_orders(&body).with_context(|| format!("Malformed orders for {}", slug))?;
        Ok(orders)
    }

    async fn fetch_statistics(&self, slug: &str) -> Result<StatHistory> {
        let body = self
            .get_with_retry(&format!("/v1/items/{}/statistics", slug))
            .await?;
        let history = decode_statistics(&body)
            .with_context(|| format!("Malformed statistics for {}", slug))?;
        Ok(history)
    }
}
