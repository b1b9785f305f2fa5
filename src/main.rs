//! loki-crud-server
//!
//! Placeholder item API whose every request is logged to a Loki-compatible
//! sink through a batching shipper.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!   Client Request   │  ┌─────────┐    ┌─────────────┐    ┌──────────────┐  │
//!   ─────────────────┼─▶│  axum   │───▶│ request_log │───▶│   handlers   │  │
//!                    │  │ server  │    │ middleware  │    │  (canned)    │  │
//!   Client Response  │  └─────────┘    └──────┬──────┘    └──────┬───────┘  │
//!   ◀────────────────┼──────────────────────  │ enqueue          │ enqueue  │
//!                    │                        ▼                  ▼          │
//!                    │                 ┌─────────────────────────────┐      │
//!                    │                 │ shipper: bounded buffer     │      │
//!                    │                 │ + flush task (time / count) │──────┼──▶ Loki push API
//!                    │                 └─────────────────────────────┘      │
//!                    │  lifecycle: start → serve → signal → drain → exit    │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::net::TcpListener;

use loki_crud_server::config::{load_config, validate_config, AppConfig, ConfigError};
use loki_crud_server::http::HttpServer;
use loki_crud_server::lifecycle::{signals, Lifecycle, Shutdown, StartupError};
use loki_crud_server::observability::{logging, metrics};
use loki_crud_server::shipper::{Shipper, ShipperConfig};

#[derive(Parser)]
#[command(name = "loki-crud-server")]
#[command(about = "Item API with request logging shipped to Loki", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port, overriding server.bind_address's port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Loki push URL, overriding sink.push_url.
    #[arg(long)]
    sink_url: Option<String>,
}

impl Cli {
    fn resolve_config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => AppConfig::default(),
        };

        if let Some(port) = self.port {
            let host = config
                .server
                .bind_address
                .rsplit_once(':')
                .map_or("0.0.0.0", |(host, _)| host)
                .to_string();
            config.server.bind_address = format!("{}:{}", host, port);
        }
        if let Some(url) = &self.sink_url {
            config.sink.push_url = url.clone();
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("loki-crud-server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "loki-crud-server starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let lifecycle = Lifecycle::new();
    let shipper = match start_shipper(&lifecycle, &config) {
        Ok(shipper) => shipper,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let served = serve(config, shipper).await;

    // Runs on every exit path of the server: clean stop, bind or serve
    // error, and handler-task panic (caught as a JoinError).
    let report = lifecycle.drain().await;
    tracing::info!(
        sent = report.sent,
        dropped = report.dropped,
        timed_out = report.timed_out,
        "Shutdown complete"
    );

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

fn start_shipper(lifecycle: &Lifecycle, config: &AppConfig) -> Result<Shipper, StartupError> {
    let shipper_config = ShipperConfig::try_from(&config.sink)?;
    lifecycle.start(shipper_config)
}

async fn serve(config: AppConfig, shipper: Shipper) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            addr: config.server.bind_address.clone(),
            source,
        })?;

    let server_shutdown = signals::listen_for_signals(Shutdown::new());

    let server = HttpServer::new(config, shipper);
    tokio::spawn(server.run(listener, server_shutdown)).await??;
    Ok(())
}
