//! HTTP push client for the log sink.

use reqwest::header::CONTENT_TYPE;
use std::time::{Duration, Instant};
use url::Url;

use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::shipper::encoder::PushRequest;
use crate::shipper::error::ShipperError;

/// Pushes encoded batches to the sink with bounded retries.
#[derive(Debug, Clone)]
pub struct PushClient {
    http: reqwest::Client,
    endpoint: Url,
    retry: RetryPolicy,
}

impl PushClient {
    pub fn new(endpoint: Url, timeout: Duration, retry: RetryPolicy) -> Result<Self, ShipperError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("loki-crud-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ShipperError::Client)?;

        Ok(Self {
            http,
            endpoint,
            retry,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Deliver one payload, retrying transient failures.
    ///
    /// Returns the last error once the retry policy is exhausted or the
    /// failure is not retryable.
    pub async fn push(&self, request: &PushRequest) -> Result<(), ShipperError> {
        let body = serde_json::to_vec(request)?;
        let entries = request.entry_count();
        let start = Instant::now();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(body.clone()).await {
                Ok(()) => {
                    metrics::record_batch_sent(entries, start);
                    return Ok(());
                }
                Err(e) if e.is_retryable() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(
                        endpoint = %self.endpoint,
                        attempt,
                        delay = ?delay,
                        error = %e,
                        "Push failed, retrying"
                    );
                    metrics::record_push_retry();
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, body: Vec<u8>) -> Result<(), ShipperError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ShipperError::Rejected { status, body })
    }
}
