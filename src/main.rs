//! Request tracing backend binary.
//!
//! Loads config, initializes observability, wires the correlation store,
//! sink and interceptor, and serves the demo app until shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use request_tracer::config::{load_config, AppConfig};
use request_tracer::http::{build_app, TracerState};
use request_tracer::lifecycle::{shutdown::wait_for_signal, Shutdown};
use request_tracer::observability::{logging, metrics};
use request_tracer::sink::ChannelSink;
use request_tracer::store::MemoryStore;

/// Sweep interval for the correlation store reaper.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "request-tracer", about = "Request tracing backend")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "tracer.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        AppConfig::default()
    };

    logging::init(&config.observability);
    if config.observability.metrics_enabled {
        metrics::install_recorder();
    }

    let shutdown = Shutdown::new();

    let store = MemoryStore::new();
    store.spawn_sweeper(SWEEP_INTERVAL, shutdown.subscribe());

    let sink = ChannelSink::spawn(shutdown.subscribe());
    let tracer = TracerState::new(config.tracer.clone(), Arc::new(store), sink)?;

    let app = build_app(&config, tracer);
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "server starting");

    let mut server_shutdown = shutdown.subscribe();
    let signal_task = tokio::spawn(async move {
        wait_for_signal(&shutdown).await;
    });

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.recv().await;
        })
        .await?;

    signal_task.abort();
    tracing::info!("server stopped");
    Ok(())
}
