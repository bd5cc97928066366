//! Tax calculation interface.

use std::time::Duration;

use async_trait::async_trait;

/// GST payload returned by the tax service.
///
/// Opaque to the relay: it is attached to the broadcast as-is.
pub type GstDetails = serde_json::Value;

/// Errors from tax service calls.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnrichmentError {
    #[error("GST service unreachable: {0}")]
    Unreachable(String),

    #[error("GST service bad response: {0}")]
    BadResponse(String),

    #[error("GST service timed out after {0:?}")]
    Timeout(Duration),
}

impl EnrichmentError {
    /// Transport-level failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout(_))
    }
}

/// Interface for computing GST on a booking amount.
#[async_trait]
pub trait TaxCalculator: Send + Sync {
    /// Compute tax details for the given amount.
    async fn compute_tax(&self, amount: f64) -> Result<GstDetails, EnrichmentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_categories() {
        assert!(EnrichmentError::Unreachable("refused".into()).is_retryable());
        assert!(EnrichmentError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!EnrichmentError::BadResponse("HTTP 500".into()).is_retryable());
    }
}
