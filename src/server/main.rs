//! Alert server.
//!
//! Serves position checks, route checks, incident reports and emergency
//! contact alerts over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crimewatch::config::Config;
use crimewatch::services::{
    load_incidents_csv, ContactBook, IntersectionGeocoder, LogDispatcher, MemoryStore,
    RecordStore,
};

mod routes;
use routes::AppState;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Location-based crime alert server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(short, long)]
    listen: Option<String>,

    /// Incident CSV used to seed the store (overrides the config file)
    #[arg(long)]
    incidents: Option<PathBuf>,

    /// Maximum log level
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Crimewatch Alert Server");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Config::load_from_file(path)?
        }
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(incidents) = args.incidents {
        config.store.incidents = Some(incidents);
    }

    let store: Arc<dyn RecordStore> = match &config.store.incidents {
        Some(path) => Arc::new(MemoryStore::with_records(load_incidents_csv(path)?)),
        None => {
            info!("No incident dataset configured, starting with an empty store");
            Arc::new(MemoryStore::new())
        }
    };

    let geocoder = IntersectionGeocoder::new(
        Arc::clone(&store),
        config.detection.geocoder_radius_km,
        config.store.fetch_timeout(),
    );

    let state = Arc::new(AppState {
        store,
        directions: None,
        geocoder: Arc::new(geocoder),
        dispatcher: Arc::new(LogDispatcher),
        contacts: ContactBook::new(),
        detection: config.detection.clone(),
        fetch_timeout: config.store.fetch_timeout(),
    });

    let app = routes::router(state);

    info!("Starting server on {}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
