//! Batching log shipper.
//!
//! # Data Flow
//! ```text
//! request tasks                       flush task
//!     enqueue(level, msg)                 ┌──────────────────────────────┐
//!       → buffer.rs (append, bounded) ───▶│ wake: batch_wait elapsed     │
//!       → notify when batch_max reached ─▶│    or batch_max_entries hit  │
//!                                         │ take_all → encoder.rs        │
//!                                         │ → client.rs (push + retry)   │
//!                                         └──────────────────────────────┘
//! shutdown()
//!     → stop flush loop → final drain → done (bounded by shutdown_timeout)
//! ```
//!
//! # Design Decisions
//! - `enqueue` never touches the network and holds the lock for one append
//! - The flush task is the only consumer of the buffer
//! - Sustained outages drop the oldest events instead of growing memory
//! - Drops are counted locally and never logged through the shipper itself

pub mod buffer;
pub mod client;
pub mod config;
pub mod encoder;
pub mod error;
pub mod event;

pub use client::PushClient;
pub use config::{ConfigIssue, ShipperConfig};
pub use encoder::{decode, Encoder, PushRequest, PushStream, WireEntry};
pub use error::ShipperError;
pub use event::{LabelSet, Level, LogEvent};

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::observability::metrics;
use buffer::{Admission, EventBuffer};

/// Delivery counters returned by [`Shipper::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Events acknowledged by the sink over the shipper's lifetime.
    pub sent: u64,
    /// Events evicted, rejected or abandoned over the shipper's lifetime.
    pub dropped: u64,
    /// Whether the final drain hit the shutdown timeout.
    pub timed_out: bool,
}

/// Handle to a running shipper. Clones share the same buffer and task.
#[derive(Clone)]
pub struct Shipper {
    inner: Arc<Inner>,
}

struct Inner {
    config: ShipperConfig,
    buffer: Mutex<EventBuffer>,
    /// Wakes the flush task once `batch_max_entries` are buffered.
    capacity: Notify,
    stop: watch::Sender<bool>,
    done: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    sent: AtomicU64,
    dropped: AtomicU64,
    in_flight: AtomicUsize,
    timed_out: AtomicBool,
}

impl Shipper {
    /// Validate the settings, build the push client and spawn the flush task
    /// on the current runtime.
    pub fn start(config: ShipperConfig) -> Result<Self, ShipperError> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ShipperError::NoRuntime)?;
        let client = PushClient::new(config.push_url.clone(), config.request_timeout, config.retry)?;

        let (stop, stop_rx) = watch::channel(false);
        let (done, _) = watch::channel(false);
        let inner = Arc::new(Inner {
            buffer: Mutex::new(EventBuffer::new(config.max_buffered_entries)),
            capacity: Notify::new(),
            stop,
            done,
            task: Mutex::new(None),
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            timed_out: AtomicBool::new(false),
            config,
        });

        let task = runtime.spawn(run_flush_loop(inner.clone(), client, stop_rx));
        *inner.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);

        tracing::info!(
            endpoint = %inner.config.push_url,
            labels = %inner.config.labels,
            batch_wait = ?inner.config.batch_wait,
            batch_max_entries = inner.config.batch_max_entries,
            max_buffered_entries = inner.config.max_buffered_entries,
            "Log shipper started"
        );

        Ok(Self { inner })
    }

    /// Queue a message for delivery. Never blocks on the sink.
    pub fn enqueue(&self, level: Level, message: impl Into<String>) {
        if level == Level::Disabled {
            return;
        }
        let inner = &*self.inner;
        let message = message.into();

        if level >= inner.config.print_level {
            print_local(level, &message);
        }
        if level < inner.config.send_level {
            return;
        }

        let admission = inner
            .lock_buffer()
            .push(level, message, &inner.config.labels);

        match admission {
            Admission::Accepted { len, evicted } => {
                metrics::record_event_enqueued(level);
                if evicted > 0 {
                    inner.record_dropped(evicted, "buffer_full");
                }
                if len >= inner.config.batch_max_entries {
                    inner.capacity.notify_one();
                }
            }
            Admission::Closed => inner.record_dropped(1, "closed"),
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.enqueue(Level::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.enqueue(Level::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.enqueue(Level::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.enqueue(Level::Error, message);
    }

    /// Stop the flush task and drain the buffer.
    ///
    /// Waits at most `shutdown_timeout`. On timeout the task is aborted and
    /// everything still buffered or in flight is counted as dropped. Safe to
    /// call repeatedly and concurrently; every caller waits for the same
    /// completion.
    pub async fn shutdown(&self) -> ShutdownReport {
        let inner = &*self.inner;
        let mut done = inner.done.subscribe();
        inner.stop.send_replace(true);

        let drained = tokio::time::timeout(inner.config.shutdown_timeout, done.wait_for(|d| *d))
            .await
            .is_ok();

        if !drained {
            inner.abandon();
        }

        let report = self.report();
        tracing::info!(
            sent = report.sent,
            dropped = report.dropped,
            timed_out = report.timed_out,
            "Log shipper stopped"
        );
        report
    }

    /// Ask the flush task to stop without waiting for the drain.
    pub fn signal_stop(&self) {
        self.inner.stop.send_replace(true);
    }

    pub fn report(&self) -> ShutdownReport {
        ShutdownReport {
            sent: self.sent(),
            dropped: self.dropped(),
            timed_out: self.inner.timed_out.load(Ordering::Acquire),
        }
    }

    pub fn sent(&self) -> u64 {
        self.inner.sent.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Events waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.inner.lock_buffer().len()
    }

    pub fn config(&self) -> &ShipperConfig {
        &self.inner.config
    }

    #[cfg(test)]
    pub(crate) fn buffered_messages(&self) -> Vec<String> {
        self.inner.lock_buffer().messages()
    }
}

impl Inner {
    fn lock_buffer(&self) -> MutexGuard<'_, EventBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap out the buffer and push it in chunks of `batch_max_entries`.
    async fn flush(&self, client: &PushClient) {
        let batch = {
            let mut buffer = self.lock_buffer();
            let batch = buffer.take_all();
            self.in_flight.store(batch.len(), Ordering::SeqCst);
            batch
        };
        if batch.is_empty() {
            return;
        }

        let encoder = Encoder::new(self.config.max_line_bytes);
        for chunk in batch.chunks(self.config.batch_max_entries.max(1)) {
            let request = encoder.batch(chunk);
            let delivered = client.push(&request).await;
            if !self.settle_in_flight(chunk.len()) {
                // Already counted as dropped by a timed-out shutdown.
                return;
            }
            match delivered {
                Ok(()) => {
                    self.sent.fetch_add(chunk.len() as u64, Ordering::Relaxed);
                    tracing::debug!(entries = chunk.len(), "Batch delivered");
                }
                Err(e) => {
                    tracing::warn!(
                        endpoint = %client.endpoint(),
                        entries = chunk.len(),
                        error = %e,
                        "Dropping batch after failed delivery"
                    );
                    self.record_dropped(chunk.len(), "delivery_failed");
                }
            }
        }
    }

    /// Claim `count` finished events back from the in-flight tally.
    ///
    /// Fails once `abandon` has taken the tally, so each event is counted
    /// as sent or dropped exactly once.
    fn settle_in_flight(&self, count: usize) -> bool {
        self.in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(count))
            .is_ok()
    }

    /// Give up on the drain: abort the task and account for what it held.
    fn abandon(&self) {
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }

        let stranded = {
            let mut buffer = self.lock_buffer();
            buffer.close();
            buffer.take_all().len() + self.in_flight.swap(0, Ordering::SeqCst)
        };
        if stranded > 0 {
            self.record_dropped(stranded, "shutdown_timeout");
        }

        self.timed_out.store(true, Ordering::Release);
        self.done.send_replace(true);
        tracing::warn!(
            timeout = ?self.config.shutdown_timeout,
            abandoned = stranded,
            "Log shipper drain timed out"
        );
    }

    fn record_dropped(&self, count: usize, reason: &'static str) {
        let before = self.dropped.fetch_add(count as u64, Ordering::Relaxed);
        let total = before + count as u64;
        metrics::record_events_dropped(reason, count);

        // First drop, then once per thousand.
        if before == 0 || before / 1000 != total / 1000 {
            tracing::warn!(reason, count, total, "Log events dropped");
        }
    }
}

async fn run_flush_loop(inner: Arc<Inner>, client: PushClient, mut stop: watch::Receiver<bool>) {
    let batch_wait = inner.config.batch_wait;
    let mut deadline = Instant::now() + batch_wait;

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = inner.capacity.notified() => {
                // A timer flush may already have taken the batch.
                if inner.lock_buffer().len() < inner.config.batch_max_entries {
                    continue;
                }
            }
            _ = tokio::time::sleep_until(deadline) => {}
        }

        inner.flush(&client).await;
        deadline = Instant::now() + batch_wait;
    }

    tracing::debug!(buffered = inner.lock_buffer().len(), "Draining log buffer");
    inner.lock_buffer().close();
    inner.flush(&client).await;
    inner.done.send_replace(true);
}

fn print_local(level: Level, message: &str) {
    match level {
        Level::Debug => tracing::debug!(target: "shipper", "{}", message),
        Level::Info => tracing::info!(target: "shipper", "{}", message),
        Level::Warn => tracing::warn!(target: "shipper", "{}", message),
        Level::Error => tracing::error!(target: "shipper", "{}", message),
        Level::Disabled => {}
    }
}
