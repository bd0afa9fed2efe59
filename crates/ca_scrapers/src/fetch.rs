use std::time::Duration;

use ca_core::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use tracing::{debug, warn};

/// Browser-like identification so sites don't reject the client outright.
/// Fixed configuration, never varied per call.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub max_retries: u32,
    /// Exponential backoff: `backoff_base * 2^attempt` between retries.
    pub backoff_base: Duration,
    pub request_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Resilient HTTP retrieval. Retries transport-level failures (timeouts,
/// connection resets, non-2xx) with exponential backoff; exhausting the
/// retry budget yields `Error::FetchFailed`, which callers treat as
/// "page unavailable" rather than fatal.
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    pub async fn fetch(&self, url: &str) -> Result<String> {
        for attempt in 0..self.config.max_retries {
            debug!(url, attempt = attempt + 1, "fetching page");
            match self.try_fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!(url, attempt = attempt + 1, error = %e, "fetch attempt failed");
                    if attempt + 1 < self.config.max_retries {
                        let delay = self.config.backoff_base * 2u32.pow(attempt);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(Error::FetchFailed {
            url: url.to_string(),
            attempts: self.config.max_retries,
        })
    }

    async fn try_fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let body = response.error_for_status()?.text().await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Local endpoint that answers every request with 500 and counts hits.
    async fn spawn_failing_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    )
                    .await;
            }
        });
        (format!("http://{}/", addr), hits)
    }

    #[tokio::test]
    async fn test_retry_bound_is_exact() {
        let (url, hits) = spawn_failing_server().await;
        let fetcher = Fetcher::new(FetchConfig {
            max_retries: 3,
            backoff_base: Duration::ZERO,
            request_timeout: Duration::from_secs(5),
        })
        .unwrap();

        let result = fetcher.fetch(&url).await;
        match result {
            Err(Error::FetchFailed { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected FetchFailed, got {:?}", other.map(|_| ())),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unreachable_host_yields_fetch_failed() {
        let fetcher = Fetcher::new(FetchConfig {
            max_retries: 2,
            backoff_base: Duration::ZERO,
            request_timeout: Duration::from_millis(500),
        })
        .unwrap();

        // Reserved TEST-NET address, nothing listens there.
        let result = fetcher.fetch("http://192.0.2.1:9/").await;
        assert!(matches!(result, Err(Error::FetchFailed { attempts: 2, .. })));
    }
}
