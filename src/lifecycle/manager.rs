//! Shipper lifetime state machine.
//!
//! # State Transitions
//! ```text
//! Uninitialized → Ready:      start() validated the config and spawned the flush task
//! Ready → Draining:           drain() called (signal, server exit or panic)
//! Draining → Terminated:      final flush finished or timed out
//! ```
//!
//! No transition skips a state. `drain()` is idempotent and concurrent
//! callers share one drain and one report.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use tokio::sync::OnceCell;

use crate::lifecycle::startup::StartupError;
use crate::shipper::{Shipper, ShipperConfig, ShutdownReport};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized = 0,
    Ready = 1,
    Draining = 2,
    Terminated = 3,
}

impl From<u8> for LifecycleState {
    fn from(val: u8) -> Self {
        match val {
            1 => LifecycleState::Ready,
            2 => LifecycleState::Draining,
            3 => LifecycleState::Terminated,
            _ => LifecycleState::Uninitialized,
        }
    }
}

/// Owns the shipper from process start to the final drain.
pub struct Lifecycle {
    state: AtomicU8,
    shipper: OnceLock<Shipper>,
    report: OnceCell<ShutdownReport>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Uninitialized as u8),
            shipper: OnceLock::new(),
            report: OnceCell::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state.load(Ordering::Acquire).into()
    }

    /// Start the shipper. Fails if called twice or if the client cannot be built.
    pub fn start(&self, config: ShipperConfig) -> Result<Shipper, StartupError> {
        if self.state() != LifecycleState::Uninitialized {
            return Err(StartupError::AlreadyStarted);
        }

        let shipper = Shipper::start(config)?;
        if self.shipper.set(shipper.clone()).is_err() {
            shipper.signal_stop();
            return Err(StartupError::AlreadyStarted);
        }
        self.transition(LifecycleState::Uninitialized, LifecycleState::Ready);
        Ok(shipper)
    }

    /// Drain the shipper and terminate.
    ///
    /// Returns an empty report if the lifecycle was never started.
    pub async fn drain(&self) -> ShutdownReport {
        let Some(shipper) = self.shipper.get() else {
            return ShutdownReport::default();
        };

        *self
            .report
            .get_or_init(|| async {
                self.transition(LifecycleState::Ready, LifecycleState::Draining);
                let report = shipper.shutdown().await;
                self.transition(LifecycleState::Draining, LifecycleState::Terminated);
                report
            })
            .await
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) {
        match self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => tracing::debug!(from = ?from, to = ?to, "Lifecycle transition"),
            Err(actual) => tracing::warn!(
                from = ?from,
                to = ?to,
                actual = ?LifecycleState::from(actual),
                "Unexpected lifecycle state"
            ),
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if self.state() == LifecycleState::Ready {
            if let Some(shipper) = self.shipper.get() {
                tracing::warn!("Lifecycle dropped without drain; buffered logs may be lost");
                shipper.signal_stop();
            }
        }
    }
}
