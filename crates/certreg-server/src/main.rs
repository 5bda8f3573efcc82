//! certreg server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite ledger, and serves the registry API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for an `[[accounts]]` entry:
//!
//! ```
//! cargo run -p certreg-server -- hash-password
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use certreg_core::{Fingerprint, RegistryEngine, SingleAuthority};
use certreg_ledger_sqlite::SqliteLedger;
use certreg_server::{AppState, ServerConfig};
use clap::{Parser, Subcommand};
use rand_core::OsRng;
use tokio::{net::TcpListener, sync::broadcast::error::RecvError};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Document certificate registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the registry API (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
  /// Print the fingerprint of a document and exit.
  Fingerprint {
    file: PathBuf,
  },
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

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(&cli.config).await,
    Command::HashPassword => hash_password(),
    Command::Fingerprint { file } => {
      let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("failed to read {file:?}"))?;
      println!("{}", Fingerprint::of_document(&bytes));
      Ok(())
    }
  }
}

async fn serve(config_path: &Path) -> anyhow::Result<()> {
  let settings = config::Config::builder()
    .add_source(config::File::from(config_path).required(false))
    .add_source(config::Environment::with_prefix("CERTREG"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if !server_cfg
    .accounts
    .iter()
    .any(|a| a.identity == server_cfg.authority)
  {
    tracing::warn!(
      authority = %server_cfg.authority,
      "no account configured for the authority; the registry is read-only"
    );
  }

  let ledger_path = expand_tilde(&server_cfg.ledger_path);
  if let Some(parent) = ledger_path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let ledger = SqliteLedger::open(
    &ledger_path,
    SingleAuthority::new(server_cfg.authority.clone()),
  )
  .await
  .with_context(|| format!("failed to open ledger at {ledger_path:?}"))?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(ledger, server_cfg);
  tokio::spawn(log_notifications(state.engine.clone()));

  let app = certreg_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Log every committed notification as it is finalised.
async fn log_notifications(engine: std::sync::Arc<RegistryEngine<SqliteLedger>>) {
  let mut rx = engine.subscribe();
  loop {
    match rx.recv().await {
      Ok(receipt) => tracing::info!(
        sequence = receipt.sequence,
        tx_id = %receipt.tx_id,
        event = receipt.notification.kind(),
        fingerprint = %receipt.notification.fingerprint().short(),
        "notification"
      ),
      Err(RecvError::Lagged(missed)) => {
        tracing::warn!(missed, "notification log lagged; replay via /notifications")
      }
      Err(RecvError::Closed) => break,
    }
  }
}

fn hash_password() -> anyhow::Result<()> {
  let password = read_password()?;
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
    .to_string();
  println!("{hash}");
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
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
