//! HTTP client for the external GST calculation service.
//!
//! Success is an HTTP 200 with a JSON body; the body is passed through to
//! observers untouched. Every request carries a timeout.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::EnrichmentConfig;
use crate::interfaces::{EnrichmentError, GstDetails, TaxCalculator};

/// Request sent to the GST service.
#[derive(Serialize)]
struct GstRequest {
    total_booking_amount: f64,
}

/// HTTP client for the GST service.
pub struct GstServiceClient {
    client: Client,
    url: String,
    timeout: Duration,
    max_retries: usize,
}

impl GstServiceClient {
    /// Create a new GST service client.
    pub fn new(config: &EnrichmentConfig) -> Result<Self, EnrichmentError> {
        let timeout = config.timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnrichmentError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            timeout,
            max_retries: config.max_retries,
        })
    }

    /// Backoff between attempts; `max_retries` of 0 means a single attempt.
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.max_retries)
            .with_jitter()
    }

    fn classify(&self, err: reqwest::Error) -> EnrichmentError {
        if err.is_timeout() {
            EnrichmentError::Timeout(self.timeout)
        } else if err.is_decode() {
            EnrichmentError::BadResponse(err.to_string())
        } else {
            EnrichmentError::Unreachable(err.to_string())
        }
    }

    async fn post_once(&self, amount: f64) -> Result<GstDetails, EnrichmentError> {
        let response = self
            .client
            .post(&self.url)
            .json(&GstRequest {
                total_booking_amount: amount,
            })
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::BadResponse(format!(
                "HTTP {} - {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        response
            .json::<GstDetails>()
            .await
            .map_err(|e| self.classify(e))
    }
}

#[async_trait]
impl TaxCalculator for GstServiceClient {
    #[tracing::instrument(name = "gst.compute", skip(self))]
    async fn compute_tax(&self, amount: f64) -> Result<GstDetails, EnrichmentError> {
        let details = (|| async { self.post_once(amount).await })
            .retry(self.backoff())
            .when(EnrichmentError::is_retryable)
            .notify(|err, delay| {
                warn!(
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "GST call failed, retrying"
                );
            })
            .await?;

        debug!(url = %self.url, "GST calculated");
        Ok(details)
    }
}
