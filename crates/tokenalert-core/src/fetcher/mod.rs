//! Price fetching from the token page
//!
//! [`PriceFetcher`] issues a GET against the configured page, extracts the
//! current price and retries a bounded number of times with a fixed delay.

mod scrape;

pub use scrape::{extract_price, PRICE_DELIMITER, PRICE_MARKER};

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::models::Price;

/// Errors raised while obtaining the current price
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure or unreadable body
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status code
    #[error("Source returned status {0}")]
    Status(u16),

    /// The page does not contain the price marker
    #[error("Price marker not found in page")]
    MarkerNotFound,

    /// Nothing terminates the price text after the marker
    #[error("Price delimiter not found after marker")]
    DelimiterNotFound,

    /// The price text does not parse as a non-negative integer
    #[error("Price text is not a valid integer: '{0}'")]
    InvalidNumber(String),

    /// Every attempt failed
    #[error("Price fetch failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made, including the first
        attempts: u32,
        /// Error from the final attempt
        last: Box<FetchError>,
    },
}

/// Anything that can report the current price
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current price, after any retries the source applies
    async fn fetch(&self) -> std::result::Result<Price, FetchError>;
}

/// Scrapes the token price over HTTP
pub struct PriceFetcher {
    client: Client,
    url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl PriceFetcher {
    /// Create a new fetcher from the source configuration
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("tokenalert/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        })
    }

    /// Single attempt: GET the page and extract the price
    async fn fetch_once(&self) -> std::result::Result<Price, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        extract_price(&html)
    }
}

#[async_trait]
impl PriceSource for PriceFetcher {
    async fn fetch(&self) -> std::result::Result<Price, FetchError> {
        let price =
            with_retries(self.max_retries, self.retry_delay, || self.fetch_once()).await?;
        debug!(price, url = %self.url, "Fetched token price");
        Ok(price)
    }
}

/// Run `op` up to `max_retries + 1` times, sleeping `delay` between failed attempts.
pub async fn with_retries<F, Fut, T>(
    max_retries: u32,
    delay: Duration,
    mut op: F,
) -> std::result::Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, FetchError>>,
{
    let attempts = max_retries.saturating_add(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => {
                warn!(attempt, attempts, error = %e, "Price fetch failed, giving up");
                return Err(FetchError::Exhausted {
                    attempts,
                    last: Box::new(e),
                });
            }
            Err(e) => {
                warn!(attempt, attempts, error = %e, "Price fetch failed, retrying");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = "<html><b>Current:</b>&nbsp;235,000&nbsp;gold</html>";

    fn source(url: String, max_retries: u32) -> SourceConfig {
        SourceConfig {
            url,
            max_retries,
            retry_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_success_on_final_attempt() {
        let calls = AtomicU32::new(0);

        let result = with_retries(2, Duration::ZERO, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(FetchError::MarkerNotFound)
            } else {
                Ok(42u64)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_all_attempts_fail() {
        let calls = AtomicU32::new(0);

        let result: std::result::Result<u64, _> = with_retries(3, Duration::ZERO, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Status(503))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(FetchError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 4);
                assert!(matches!(*last, FetchError::Status(503)));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let calls = AtomicU32::new(0);

        let result: std::result::Result<u64, _> = with_retries(0, Duration::ZERO, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::MarkerNotFound)
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_from_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let fetcher = PriceFetcher::new(&source(format!("{}/token", server.uri()), 0)).unwrap();
        assert_eq!(fetcher.fetch().await.unwrap(), 235_000);
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let fetcher = PriceFetcher::new(&source(format!("{}/token", server.uri()), 2)).unwrap();
        assert_eq!(fetcher.fetch().await.unwrap(), 235_000);
    }

    #[tokio::test]
    async fn test_fetch_gives_up_when_page_changes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>redesigned</html>"))
            .expect(2)
            .mount(&server)
            .await;

        let fetcher = PriceFetcher::new(&source(format!("{}/token", server.uri()), 1)).unwrap();
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Exhausted { attempts: 2, .. }));
    }
}
