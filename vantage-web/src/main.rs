//! vantage-web - Dashboard REST API
//!
//! Serves read-only analytics endpoints (leaderboards, stream history,
//! viewer profiles) over the database written by vantage-ingest.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use vantage_common::Config;
use vantage_web::{build_router, db, AppState};

#[derive(Parser, Debug)]
#[command(name = "vantage-web", about = "Vantage dashboard API server")]
struct Args {
    /// Path to config file (default: platform config dir)
    #[arg(short, long, env = "VANTAGE_CONFIG")]
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

    info!("Starting vantage-web v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match db::connect_readonly(&db_path).await {
        Ok(pool) => {
            info!("Connected to database (read-only)");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e);
        }
    };

    let state = AppState::new(pool);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.web.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
