use anyhow::Result;
use clap::Parser;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::net::SocketAddr;
use std::path::PathBuf;
use storewatch::{server, storage, Runner};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Store uptime/downtime monitoring server.
#[derive(Debug, Parser)]
#[command(name = "storewatch", version)]
struct Args {
    /// Path to the SQLite database holding observations, business hours,
    /// and timezones.
    #[arg(long, default_value = "store_monitoring.db")]
    database: PathBuf,

    /// Address to serve HTTP on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Directory finished CSV reports are published under.
    #[arg(long, default_value = "reports")]
    artifact_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let options = SqliteConnectOptions::new()
        .filename(&args.database)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    storage::setup_database(&pool).await?;

    let (service, _worker) = Runner::new(pool, args.artifact_dir).start();
    let app = server::router(service);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
