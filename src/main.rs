//! mergetrail - serves the merge report page and JSON API.

use anyhow::{Context, Result};
use clap::Parser;
use mergetrail::adapters::{Git2Client, JsonConfigStore};
use mergetrail::api::{create_router, AppState};
use mergetrail::session::RepoConnector;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mergetrail")]
#[command(about = "Report which branches have been merged into a target branch")]
#[command(version)]
struct Args {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:5000")]
    addr: SocketAddr,

    /// Data directory for the repository cache and configuration
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Configuration file (default: <data dir>/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("mergetrail"))
        .unwrap_or_else(|| PathBuf::from("mergetrail-data"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("mergetrail={},tower_http=info", args.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);
    let cache_root = data_dir.join("repos");
    std::fs::create_dir_all(&cache_root)
        .with_context(|| format!("Failed to create data directory {}", cache_root.display()))?;
    let config_path = args.config.unwrap_or_else(|| data_dir.join("config.json"));

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        data_dir = %data_dir.display(),
        config = %config_path.display(),
        "Starting mergetrail"
    );

    let client = Git2Client::init().context("git executable not found. Is git installed?")?;
    let connector = RepoConnector::new(Arc::new(client), cache_root);
    let store = Arc::new(JsonConfigStore::new(config_path));
    let app = create_router(AppState::new(connector, store));

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    tracing::info!(url = %format!("http://{}", args.addr), "Listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
