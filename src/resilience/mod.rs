//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Batch push to sink:
//!     → timeout on every request (reqwest client timeout)
//!     → On failure: retries.rs (check if retryable, wait backoff.rs delay)
//!     → After max attempts: batch dropped and counted by the shipper
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Jittered backoff prevents synchronized retries
//! - Retries never block the request path; only the flush task waits

pub mod backoff;
pub mod retries;

pub use retries::RetryPolicy;
