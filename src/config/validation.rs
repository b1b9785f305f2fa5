//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::shipper::config::{ConfigIssue, ShipperConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("sink.push_url: {0}")]
    PushUrl(String),

    #[error("sink.labels must not be empty")]
    EmptyLabels,

    #[error("sink.labels: invalid label name '{0}'")]
    LabelName(String),

    #[error("sink.{0}")]
    Sink(#[from] ConfigIssue),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let sink = &config.sink;

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.server.bind_address.clone()));
    }

    // Flush settings are checked by the shipper itself; a bad URL hides them.
    match ShipperConfig::try_from(sink) {
        Ok(shipper) => errors.extend(shipper.issues().into_iter().map(ValidationError::Sink)),
        Err(e) => errors.push(ValidationError::PushUrl(e.to_string())),
    }

    if sink.labels.is_empty() {
        errors.push(ValidationError::EmptyLabels);
    }
    for name in sink.labels.keys() {
        if !is_valid_label_name(name) {
            errors.push(ValidationError::LabelName(name.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Loki label names: `[a-zA-Z_][a-zA-Z0-9_]*`.
fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
