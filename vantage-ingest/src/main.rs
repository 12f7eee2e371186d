//! vantage-ingest - Twitch channel ingestion service
//!
//! Wires the chat feed, event dispatcher, chatter snapshot poller, and
//! drift-correction poller around one shared database and one in-memory
//! stream tracker, then runs until interrupted.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;
use vantage_common::Config;
use vantage_ingest::gateway::{Gateway, SqliteGateway};
use vantage_ingest::twitch::chat::ChatFeed;
use vantage_ingest::twitch::helix::HelixClient;
use vantage_ingest::twitch::Ingress;
use vantage_ingest::{
    ChatterPoller, DriftCorrectionPoller, EventDispatcher, StreamLifecycle, StreamStateTracker,
    ViewerAnalytics, ViewerSessionReconciler,
};

#[derive(Parser)]
#[command(name = "vantage-ingest", about = "Twitch channel ingestion service")]
struct Args {
    /// Configuration file path
    #[arg(long, env = "VANTAGE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting vantage-ingest v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    if config.channel.login.is_empty() {
        anyhow::bail!("channel.login must be configured");
    }

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());
    let pool = vantage_common::db::init_database(&db_path).await?;

    let gateway: Arc<dyn Gateway> = Arc::new(SqliteGateway::new(pool));
    let ingress: Arc<dyn Ingress> = Arc::new(HelixClient::new(&config.twitch, &config.channel)?);

    // Chatter polling wakes on Some(stream_id), sleeps on None
    let (gate_tx, gate_rx) = watch::channel(None);

    let reconciler = Arc::new(ViewerSessionReconciler::new(gateway.clone()));
    let tracker = Arc::new(StreamStateTracker::new(reconciler.clone(), gate_tx));
    let analytics = ViewerAnalytics::new(gateway.clone());
    let lifecycle = Arc::new(StreamLifecycle::new(
        gateway.clone(),
        tracker.clone(),
        analytics,
    ));

    let drift = Arc::new(DriftCorrectionPoller::new(
        ingress.clone(),
        gateway.clone(),
        tracker.clone(),
        lifecycle.clone(),
        Duration::from_secs(config.poll.drift_interval_secs),
    ));
    drift.start();

    ChatterPoller::new(
        ingress,
        reconciler.clone(),
        Duration::from_secs(config.poll.chatter_interval_secs),
    )
    .spawn(gate_rx);

    let (event_tx, event_rx) = mpsc::channel(256);
    ChatFeed::new(&config.channel.login, event_tx).spawn();

    let dispatcher = EventDispatcher::new(gateway, tracker, reconciler, lifecycle);
    tokio::spawn(dispatcher.run(event_rx));

    info!(channel = %config.channel.login, "ingestion running, Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    drift.stop();
    Ok(())
}
