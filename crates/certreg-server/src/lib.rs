//! HTTP server for the certificate registry.
//!
//! Wires a [`RegistryEngine`] into the `certreg-api` router behind HTTP
//! Basic authentication and request tracing.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware};
use certreg_api::ApiSettings;
use certreg_core::{Ledger, RegistryEngine};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CERTREG_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  pub ledger_path:         PathBuf,
  /// The identity permitted to mutate the registry.
  pub authority:           String,
  #[serde(default)]
  pub accounts:            Vec<Account>,
  #[serde(default = "default_submit_timeout_secs")]
  pub submit_timeout_secs: u64,
}

/// A login accepted over HTTP Basic auth.
#[derive(Deserialize, Clone)]
pub struct Account {
  pub identity:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8645 }

fn default_submit_timeout_secs() -> u64 {
  certreg_api::DEFAULT_SUBMIT_TIMEOUT.as_secs()
}

impl ServerConfig {
  pub fn submit_timeout(&self) -> Duration {
    Duration::from_secs(self.submit_timeout_secs)
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the router needs.
#[derive(Clone)]
pub struct AppState<L> {
  pub engine: Arc<RegistryEngine<L>>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

impl<L: Ledger> AppState<L> {
  pub fn new(ledger: L, config: ServerConfig) -> Self {
    let auth = AuthConfig {
      accounts: config.accounts.clone(),
    };
    Self {
      engine: Arc::new(RegistryEngine::new(ledger)),
      config: Arc::new(config),
      auth:   Arc::new(auth),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete application router.
pub fn router<L>(state: AppState<L>) -> Router
where
  L: Ledger + 'static,
{
  let settings = ApiSettings {
    submit_timeout: state.config.submit_timeout(),
  };
  certreg_api::api_router(state.engine, settings)
    .layer(middleware::from_fn_with_state(state.auth, auth::authenticate))
    .layer(TraceLayer::new_for_http())
}
