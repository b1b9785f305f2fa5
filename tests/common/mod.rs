//! Shared utilities for integration testing: an in-process log sink.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use loki_crud_server::shipper::{decode, LogEvent, PushRequest, ShipperConfig};

pub const PUSH_PATH: &str = "/loki/api/v1/push";

#[derive(Default)]
struct SinkState {
    accepted: Mutex<Vec<PushRequest>>,
    attempts: AtomicUsize,
    /// Status returned once `failures_left` is exhausted (0 means 204).
    status: AtomicU16,
    /// Number of upcoming pushes answered with 503.
    failures_left: AtomicUsize,
    delay_ms: AtomicU64,
}

/// A Loki push endpoint that records what it accepts.
#[derive(Clone)]
pub struct MockSink {
    addr: SocketAddr,
    state: Arc<SinkState>,
}

#[allow(dead_code)]
impl MockSink {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(SinkState::default());

        let app = Router::new()
            .route(PUSH_PATH, post(push))
            .layer(DefaultBodyLimit::disable())
            .with_state(state.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn push_url(&self) -> String {
        format!("http://{}{}", self.addr, PUSH_PATH)
    }

    /// Answer every push with `status` from now on.
    pub fn respond_with(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }

    /// Answer the next `n` pushes with 503.
    pub fn fail_next(&self, n: usize) {
        self.state.failures_left.store(n, Ordering::SeqCst);
    }

    /// Hold every push for `delay` before answering.
    pub fn delay_responses(&self, delay: Duration) {
        self.state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<PushRequest> {
        self.state.accepted.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches().iter().map(PushRequest::entry_count).collect()
    }

    /// Every accepted event, in arrival order.
    pub fn events(&self) -> Vec<LogEvent> {
        self.batches()
            .iter()
            .flat_map(|batch| decode(batch).unwrap())
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.message).collect()
    }

    pub fn entry_count(&self) -> usize {
        self.batch_sizes().iter().sum()
    }

    /// Poll until at least `n` entries arrived or `timeout` elapsed.
    pub async fn wait_for_entries(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.entry_count() >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.entry_count() >= n
    }
}

async fn push(State(state): State<Arc<SinkState>>, Json(body): Json<PushRequest>) -> StatusCode {
    state.attempts.fetch_add(1, Ordering::SeqCst);

    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let failing = state
        .failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    let status = match state.status.load(Ordering::SeqCst) {
        0 => StatusCode::NO_CONTENT,
        code => StatusCode::from_u16(code).unwrap(),
    };
    if status.is_success() {
        state.accepted.lock().unwrap().push(body);
    }
    status
}

/// A push URL on a port nothing listens on.
#[allow(dead_code)]
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", addr, PUSH_PATH)
}

/// Shipper settings tuned for tests: fast retries, short timeouts.
#[allow(dead_code)]
pub fn shipper_config(push_url: &str) -> ShipperConfig {
    let mut config =
        ShipperConfig::new(push_url, [("app", "integration-test")].into_iter().collect()).unwrap();
    config.batch_wait = Duration::from_secs(3600);
    config.request_timeout = Duration::from_secs(2);
    config.retry.max_attempts = 3;
    config.retry.base_delay = Duration::from_millis(20);
    config.retry.max_delay = Duration::from_millis(100);
    config.shutdown_timeout = Duration::from_secs(5);
    config
}
