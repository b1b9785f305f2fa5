//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Lifecycle::start (shipper Ready) → Bind → Serve
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger → server stops accepting → drains connections
//!
//! Drain (manager.rs):
//!     server task finished (ok, error or panic) → Lifecycle::drain → exit code
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The shipper outlives the server so the last responses are logged
//! - Drain has a timeout: leftover events are counted as dropped

pub mod manager;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use manager::{Lifecycle, LifecycleState};
pub use shutdown::Shutdown;
pub use startup::StartupError;
