//! Resolved shipper configuration.

use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::schema::SinkConfig;
use crate::resilience::RetryPolicy;
use crate::shipper::encoder::DEFAULT_MAX_LINE_BYTES;
use crate::shipper::error::ShipperError;
use crate::shipper::event::{LabelSet, Level};

/// A setting the flush loop cannot honor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigIssue {
    #[error("batch_max_entries must be greater than 0")]
    ZeroBatchEntries,

    #[error("batch_wait must be greater than 0")]
    ZeroBatchWait,

    #[error("max_buffered_entries ({buffered}) must be at least batch_max_entries ({batch})")]
    BufferSmallerThanBatch { buffered: usize, batch: usize },

    #[error("max_attempts must be greater than 0")]
    ZeroAttempts,

    #[error("max_line_bytes must be greater than 0")]
    ZeroLineLimit,

    #[error("shutdown_timeout must be greater than 0")]
    ZeroShutdownTimeout,
}

/// Immutable shipper settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ShipperConfig {
    pub push_url: Url,
    pub labels: LabelSet,
    /// Longest an event may wait in the buffer before a flush.
    pub batch_wait: Duration,
    /// Buffered count that forces a flush; also the largest batch sent.
    pub batch_max_entries: usize,
    /// Hard bound on buffered events; the oldest are dropped beyond it.
    pub max_buffered_entries: usize,
    /// Events below this level are not shipped.
    pub send_level: Level,
    /// Events at or above this level are also printed locally.
    pub print_level: Level,
    pub max_line_bytes: usize,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub shutdown_timeout: Duration,
}

impl ShipperConfig {
    /// Defaults matching `SinkConfig::default()` for the given endpoint.
    pub fn new(push_url: &str, labels: LabelSet) -> Result<Self, ShipperError> {
        Ok(Self {
            push_url: parse_endpoint(push_url)?,
            labels,
            batch_wait: Duration::from_secs(5),
            batch_max_entries: 10_000,
            max_buffered_entries: 50_000,
            send_level: Level::Info,
            print_level: Level::Error,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            request_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            shutdown_timeout: Duration::from_secs(10),
        })
    }

    /// Every setting that would break the flush contract.
    pub fn issues(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.batch_max_entries == 0 {
            issues.push(ConfigIssue::ZeroBatchEntries);
        }
        if self.batch_wait.is_zero() {
            issues.push(ConfigIssue::ZeroBatchWait);
        }
        // The count trigger could never fire.
        if self.max_buffered_entries < self.batch_max_entries {
            issues.push(ConfigIssue::BufferSmallerThanBatch {
                buffered: self.max_buffered_entries,
                batch: self.batch_max_entries,
            });
        }
        if self.retry.max_attempts == 0 {
            issues.push(ConfigIssue::ZeroAttempts);
        }
        if self.max_line_bytes == 0 {
            issues.push(ConfigIssue::ZeroLineLimit);
        }
        if self.shutdown_timeout.is_zero() {
            issues.push(ConfigIssue::ZeroShutdownTimeout);
        }

        issues
    }

    pub fn validate(&self) -> Result<(), ShipperError> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ShipperError::InvalidConfig(issues))
        }
    }
}

impl TryFrom<&SinkConfig> for ShipperConfig {
    type Error = ShipperError;

    fn try_from(sink: &SinkConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            push_url: parse_endpoint(&sink.push_url)?,
            labels: sink.labels.clone().into_iter().collect(),
            batch_wait: Duration::from_millis(sink.batch_wait_ms),
            batch_max_entries: sink.batch_max_entries,
            max_buffered_entries: sink.max_buffered_entries,
            send_level: sink.send_level,
            print_level: sink.print_level,
            max_line_bytes: sink.max_line_bytes,
            request_timeout: Duration::from_secs(sink.request_timeout_secs),
            retry: RetryPolicy {
                max_attempts: sink.max_attempts,
                base_delay: Duration::from_millis(sink.retry_base_delay_ms),
                max_delay: Duration::from_millis(sink.retry_max_delay_ms),
            },
            shutdown_timeout: Duration::from_secs(sink.shutdown_timeout_secs),
        })
    }
}

/// Parse and check a push endpoint.
pub fn parse_endpoint(raw: &str) -> Result<Url, ShipperError> {
    let invalid = |reason: String| ShipperError::InvalidEndpoint {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint() {
        let url = parse_endpoint("http://localhost:3100/loki/api/v1/push").unwrap();
        assert_eq!(url.port(), Some(3100));
        assert_eq!(url.path(), "/loki/api/v1/push");

        assert!(matches!(
            parse_endpoint("localhost:3100"),
            Err(ShipperError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            parse_endpoint("ftp://logs.example.com/push"),
            Err(ShipperError::InvalidEndpoint { .. })
        ));
        assert!(parse_endpoint("not a url").is_err());
    }

    #[test]
    fn test_from_sink_config() {
        let mut sink = SinkConfig::default();
        sink.batch_wait_ms = 250;
        sink.batch_max_entries = 100;
        sink.max_attempts = 0;

        let config = ShipperConfig::try_from(&sink).unwrap();
        assert_eq!(config.batch_wait, Duration::from_millis(250));
        assert_eq!(config.batch_max_entries, 100);
        assert_eq!(config.retry.max_attempts, 0);
        assert_eq!(config.issues(), vec![ConfigIssue::ZeroAttempts]);
        assert_eq!(config.labels.get("app"), Some("crud-server"));
        assert_eq!(config.send_level, Level::Info);
        assert_eq!(config.print_level, Level::Error);
    }

    #[test]
    fn test_defaults_pass_validation() {
        let config = ShipperConfig::new(
            "http://localhost:3100/loki/api/v1/push",
            [("app", "crud-server")].into_iter().collect(),
        )
        .unwrap();
        assert!(config.issues().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let mut config = ShipperConfig::new(
            "http://localhost:3100/loki/api/v1/push",
            LabelSet::default(),
        )
        .unwrap();
        config.batch_wait = Duration::ZERO;
        config.batch_max_entries = 100;
        config.max_buffered_entries = 10;
        config.shutdown_timeout = Duration::ZERO;

        assert_eq!(
            config.issues(),
            vec![
                ConfigIssue::ZeroBatchWait,
                ConfigIssue::BufferSmallerThanBatch {
                    buffered: 10,
                    batch: 100
                },
                ConfigIssue::ZeroShutdownTimeout,
            ]
        );
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ShipperError::InvalidConfig(ref issues) if issues.len() == 3));
        assert!(err.to_string().contains("batch_wait must be greater than 0"));
    }

    #[test]
    fn test_from_sink_config_rejects_bad_url() {
        let sink = SinkConfig {
            push_url: "::nope".into(),
            ..SinkConfig::default()
        };
        let err = ShipperConfig::try_from(&sink).unwrap_err();
        assert!(err.to_string().starts_with("invalid sink endpoint '::nope'"));
    }
}
