//! Startup errors.
//!
//! Any error here is fatal: the process exits non-zero before serving.

use thiserror::Error;

use crate::config::ConfigError;
use crate::shipper::ShipperError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("log shipper error: {0}")]
    Shipper(#[from] ShipperError),

    #[error("log shipper already started")]
    AlreadyStarted,

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
