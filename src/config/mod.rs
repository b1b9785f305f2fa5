//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → command line overrides (port, sink URL)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → SinkConfig resolved into ShipperConfig at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, ObservabilityConfig, ServerConfig, SinkConfig, TimeoutConfig};
pub use validation::{validate_config, ValidationError};
