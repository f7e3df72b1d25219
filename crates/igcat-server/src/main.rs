//! igcat API server binary.
//!
//! Reads `igcat.toml` (or the path given with `--config`) layered under
//! `IGCAT_*` environment variables, opens the SQLite catalog, and serves the
//! JSON API over HTTP.
//!
//! ```
//! IGCAT_PORT=9000 IGCAT_INFERENCE__ENDPOINT=http://127.0.0.1:11434 \
//!   IGCAT_INFERENCE__MODEL=llama3.2 igcat-server
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use igcat_core::settings::Settings;
use igcat_router::{QueryRouter, RouterConfig, StoreExecutor};
use igcat_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "IG catalog API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "igcat.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings: Settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("IGCAT").separator("__"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise Settings")?;

  let database_path = expand_tilde(&settings.database_path);

  // Open SQLite store.
  let store = SqliteStore::open(&database_path)
    .await
    .with_context(|| format!("failed to open store at {database_path:?}"))?;
  let store = Arc::new(store);

  // Build the query router over the same store.
  let router = QueryRouter::from_config(
    RouterConfig::from(&settings),
    StoreExecutor::new(store.clone()),
  )
  .context("failed to build query router")?;
  if settings.inference.is_none() {
    tracing::info!("no inference endpoint configured; llm mode will fall back");
  }

  let app = igcat_api::api_router(store, Arc::new(router)).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", settings.host, settings.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
