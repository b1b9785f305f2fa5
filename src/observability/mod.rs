//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Process diagnostics:
//!     → logging.rs (tracing subscriber, stdout)
//!     → metrics.rs (counters, histograms, Prometheus scrape)
//!
//! Application log lines:
//!     → crate::shipper (batched push to the log sink)
//! ```

pub mod logging;
pub mod metrics;
