//! poll-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store reconciled to the configured schema generation, and serves
//! the survey over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `admin_password_hash`:
//!
//! ```text
//! cargo run -p poll-server -- --hash-password
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use poll_server::{AppState, ServerConfig, auth};
use poll_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Housing survey server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password()?;
    println!("{}", auth::hash_password(&password)?);
    return Ok(());
  }

  let config = ServerConfig::load(&cli.config).with_context(|| {
    format!("failed to load configuration from {:?}", cli.config)
  })?;

  if config.locations.is_empty() {
    tracing::warn!("no locations configured; every submission will be rejected");
  }

  // Opening the store imports any first-deployment table and reconciles the
  // schema; a failed migration stops here. Legacy timestamps were written in
  // the same local time the exports use.
  let store_path = config.store_path();
  let local_offset = config
    .export_options()
    .context("invalid export_utc_offset_hours")?
    .offset;
  let store = SqliteStore::open_with_legacy_offset(
    &store_path,
    config.generation.shape(),
    local_offset,
  )
  .await
  .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::info!(
    generation = %config.generation,
    path = %store_path.display(),
    "store ready"
  );

  let state = AppState::new(store, &config).context("invalid server configuration")?;
  let app = poll_server::router(state);
  let address = config.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from one line of stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
