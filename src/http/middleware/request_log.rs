//! Request logging middleware.
//!
//! Ships one line when a request arrives and one when its response is
//! ready. The "received" line is always enqueued before the inner service
//! runs and the "completed" line after it returns, whatever the status.
//! Nothing here can fail the response.

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::observability::metrics;
use crate::shipper::{Level, Shipper};

/// Interceptor hooks around a request/response cycle.
#[derive(Clone)]
pub struct RequestLogger {
    shipper: Shipper,
}

impl RequestLogger {
    pub fn new(shipper: Shipper) -> Self {
        Self { shipper }
    }

    pub fn on_request_start(&self, method: &Method, path: &str) {
        self.shipper
            .info(format!("Received {} request for {}", method, path));
    }

    pub fn on_request_end(&self, method: &Method, path: &str, status: StatusCode) {
        let level = if status.is_server_error() {
            Level::Error
        } else {
            Level::Info
        };
        self.shipper.enqueue(
            level,
            format!(
                "Sent response with status {} for {} request to {}",
                status.as_u16(),
                method,
                path
            ),
        );
    }
}

pub async fn request_log(
    State(logger): State<RequestLogger>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    logger.on_request_start(&method, &path);
    let response = next.run(request).await;
    logger.on_request_end(&method, &path, response.status());

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipper::ShipperConfig;
    use axum::http::Request;
    use axum::{body::Body, middleware, routing::get, Router};
    use std::time::Duration;
    use tower::ServiceExt;

    fn shipper() -> Shipper {
        let mut config = ShipperConfig::new(
            "http://127.0.0.1:9/loki/api/v1/push",
            [("app", "middleware-test")].into_iter().collect(),
        )
        .unwrap();
        config.batch_wait = Duration::from_secs(3600);
        config.retry.max_attempts = 1;
        Shipper::start(config).unwrap()
    }

    fn app(shipper: &Shipper) -> Router {
        Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route(
                "/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "nope") }),
            )
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn_with_state(
                RequestLogger::new(shipper.clone()),
                request_log,
            ))
    }

    #[tokio::test]
    async fn test_logs_received_then_completed() {
        let shipper = shipper();
        let response = app(&shipper)
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            shipper.buffered_messages(),
            vec![
                "Received GET request for /ok",
                "Sent response with status 200 for GET request to /ok",
            ]
        );
        shipper.shutdown().await;
    }

    #[tokio::test]
    async fn test_error_status_still_logged() {
        let shipper = shipper();
        let response = app(&shipper)
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/broken")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let messages = shipper.buffered_messages();
        assert_eq!(
            messages.last().map(String::as_str),
            Some("Sent response with status 500 for GET request to /broken")
        );
        shipper.shutdown().await;
    }

    #[tokio::test]
    async fn test_unrouted_request_logged_as_404() {
        let shipper = shipper();
        let response = app(&shipper)
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            shipper.buffered_messages(),
            vec![
                "Received DELETE request for /missing",
                "Sent response with status 404 for DELETE request to /missing",
            ]
        );
        shipper.shutdown().await;
    }
}
