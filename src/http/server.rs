//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the item handlers and the static test page
//! - Wire up middleware (request ID, tracing, CORS, request logging, timeout)
//! - Bind server to listener and stop on the shutdown signal
//!
//! # Layer order (outermost first)
//! ```text
//! SetRequestId → PropagateRequestId → Trace → Cors → request_log → Timeout → CatchPanic → routes
//! ```
//! `request_log` sits outside timeout and panic handling so it sees the
//! final status of every request, including 408 and 500.

use axum::{
    extract::Request,
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeFile,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::handlers::{create_item, delete_item, get_item, not_found, update_item};
use crate::http::middleware::request_log::{request_log, RequestLogger};
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::shipper::Shipper;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub shipper: Shipper,
}

/// HTTP server for the item API.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    pub fn new(config: AppConfig, shipper: Shipper) -> Self {
        let router = Self::build_router(&config, shipper);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &AppConfig, shipper: Shipper) -> Router {
        let routes = Router::new()
            .route("/item", post(create_item))
            .route(
                "/item/{id}",
                get(get_item).put(update_item).delete(delete_item),
            )
            .route_service("/test", ServeFile::new(&config.server.static_file))
            .fallback(not_found)
            .with_state(AppState {
                shipper: shipper.clone(),
            });

        Self::with_layers(routes, config, shipper)
    }

    /// Wrap `routes` in the middleware stack, innermost first.
    #[allow(deprecated)]
    fn with_layers(routes: Router, config: &AppConfig, shipper: Shipper) -> Router {
        routes
            .layer(CatchPanicLayer::new())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(middleware::from_fn_with_state(
                RequestLogger::new(shipper),
                request_log,
            ))
            .layer(CorsLayer::permissive())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id(request),
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires, then drain connections.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
