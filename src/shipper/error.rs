//! Shipper error definitions.

use reqwest::StatusCode;
use thiserror::Error;

use crate::resilience::retries::is_retryable_status;
use crate::shipper::config::ConfigIssue;

/// Errors raised while building the shipper or delivering a batch.
#[derive(Debug, Error)]
pub enum ShipperError {
    /// Push URL could not be parsed or uses an unsupported scheme.
    #[error("invalid sink endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("invalid shipper config: {}", join_issues(.0))]
    InvalidConfig(Vec<ConfigIssue>),

    /// The HTTP client could not be constructed.
    #[error("failed to build sink client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection, timeout or body transfer failure.
    #[error("sink request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The sink answered with a non-success status.
    #[error("sink rejected batch with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("log shipper must be started inside a Tokio runtime")]
    NoRuntime,
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ShipperError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ShipperError::Transport(_) => true,
            ShipperError::Rejected { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_classified_by_status() {
        let throttled = ShipperError::Rejected {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        let bad_request = ShipperError::Rejected {
            status: StatusCode::BAD_REQUEST,
            body: "entry out of order".into(),
        };
        let invalid = ShipperError::InvalidEndpoint {
            url: "nope".into(),
            reason: "relative URL without a base".into(),
        };

        assert!(throttled.is_retryable());
        assert!(!bad_request.is_retryable());
        assert!(!invalid.is_retryable());
        assert_eq!(
            bad_request.to_string(),
            "sink rejected batch with status 400 Bad Request: entry out of order"
        );
    }
}
