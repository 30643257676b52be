//! HTTP client with fixed-delay retry.
//!
//! `retry` makes up to `retries + 1` attempts, sleeping `delay` between
//! them, and returns the first success or the last error. Delays do not
//! grow and carry no jitter.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BridgeError, Result};

/// Default time allowed for one attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first.
    pub retries: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Single attempt.
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.retries => {
                attempt += 1;
                tracing::debug!(attempt, retries = policy.retries, error = %e, "attempt failed, retrying");
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                if policy.retries > 0 {
                    tracing::warn!(attempts = attempt + 1, error = %e, "giving up after retries");
                }
                return Err(e);
            }
        }
    }
}

/// JSON/text HTTP client. Non-2xx responses are errors and are retried
/// like transport failures.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(RetryPolicy::default(), DEFAULT_ATTEMPT_TIMEOUT)
    }
}

impl HttpClient {
    pub fn new(policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            policy,
            attempt_timeout,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response> {
        let response = tokio::time::timeout(self.attempt_timeout, request.send())
            .await
            .map_err(|_| BridgeError::Timeout(self.attempt_timeout))??;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn attempt_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder, url: &str) -> Result<T> {
        let response = self.send(request, url).await?;
        tokio::time::timeout(self.attempt_timeout, response.json::<T>())
            .await
            .map_err(|_| BridgeError::Timeout(self.attempt_timeout))?
            .map_err(BridgeError::from)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        retry(self.policy, || self.attempt_json(self.client.get(url), url)).await
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        retry(self.policy, || async {
            let response = self.send(self.client.get(url), url).await?;
            tokio::time::timeout(self.attempt_timeout, response.text())
                .await
                .map_err(|_| BridgeError::Timeout(self.attempt_timeout))?
                .map_err(BridgeError::from)
        })
        .await
    }

    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        retry(self.policy, || self.attempt_json(self.client.post(url).json(body), url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(100));

        let start = tokio::time::Instant::now();
        let value = retry(policy, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 3 {
                Err(BridgeError::handler(format!("fail {n}")))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_returns_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(10));

        let err = retry(policy, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(BridgeError::handler(format!("fail {n}")))
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.to_string(), "fail 2");
    }

    #[tokio::test]
    async fn test_retry_none_is_single_attempt() {
        let calls = AtomicU32::new(0);
        let result = retry(RetryPolicy::none(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(BridgeError::handler("nope"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Serve canned responses, one per connection, in order.
    async fn serve(responses: Vec<&'static str>) -> (String, Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/data", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let mut read = 0;
                while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf[read..]).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    read += n;
                }
                counter.fetch_add(1, Ordering::SeqCst);
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });
        (url, hits)
    }

    const SERVER_ERROR: &str =
        "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
    const OK_JSON: &str =
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 11\r\nconnection: close\r\n\r\n{\"ok\":true}";

    #[tokio::test]
    async fn test_get_json_retries_server_errors() {
        let (url, hits) = serve(vec![SERVER_ERROR, OK_JSON]).await;
        let client = HttpClient::new(
            RetryPolicy::new(2, Duration::from_millis(10)),
            Duration::from_secs(5),
        );

        let body: serde_json::Value = client.get_json(&url).await.unwrap();
        assert_eq!(body, serde_json::json!({"ok": true}));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_status_error_after_exhaustion() {
        let (url, _hits) = serve(vec![SERVER_ERROR, SERVER_ERROR]).await;
        let client = HttpClient::new(
            RetryPolicy::new(1, Duration::from_millis(10)),
            Duration::from_secs(5),
        );

        let err = client.get_text(&url).await.unwrap_err();
        assert!(matches!(err, BridgeError::HttpStatus { status: 500, .. }));
    }
}
