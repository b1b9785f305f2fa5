//! CRUD placeholder service with batched request logging to a Loki sink.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod shipper;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{Lifecycle, Shutdown};
pub use shipper::{Shipper, ShipperConfig};
