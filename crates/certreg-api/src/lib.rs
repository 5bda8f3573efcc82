//! JSON REST API for the certificate registry.
//!
//! Exposes an axum [`Router`] backed by a [`RegistryEngine`] over any
//! [`Ledger`]. Authentication, TLS, and transport concerns are the caller's
//! responsibility: whatever establishes caller identity must insert an
//! [`Identity`](certreg_core::Identity) into the request extensions before
//! a mutating route runs (see [`caller::Caller`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", certreg_api::api_router(engine.clone(), ApiSettings::default()))
//! ```

pub mod caller;
pub mod certificates;
pub mod documents;
pub mod error;
pub mod extract;
pub mod notifications;
pub mod verify;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use certreg_core::{Ledger, RegistryEngine};

pub use caller::Caller;
pub use error::ApiError;

/// Default deadline for a submitted mutation to reach finality.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs for the API layer.
#[derive(Debug, Clone)]
pub struct ApiSettings {
  /// How long a mutating request waits for finality before answering
  /// `504` with an "outcome unknown" error.
  pub submit_timeout: Duration,
}

impl Default for ApiSettings {
  fn default() -> Self {
    Self {
      submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
    }
  }
}

/// State shared by every handler.
pub struct ApiState<L> {
  pub engine:   Arc<RegistryEngine<L>>,
  pub settings: ApiSettings,
}

impl<L> Clone for ApiState<L> {
  fn clone(&self) -> Self {
    Self {
      engine:   Arc::clone(&self.engine),
      settings: self.settings.clone(),
    }
  }
}

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<L>(engine: Arc<RegistryEngine<L>>, settings: ApiSettings) -> Router<()>
where
  L: Ledger + 'static,
{
  Router::new()
    // Certificates
    .route("/certificates", post(certificates::issue::<L>))
    .route("/certificates/{fingerprint}", get(certificates::lookup::<L>))
    .route(
      "/certificates/{fingerprint}/status",
      post(certificates::change_status::<L>),
    )
    .route("/certificates/{fingerprint}/valid", get(certificates::valid::<L>))
    .route(
      "/certificates/{fingerprint}/history",
      get(certificates::history::<L>),
    )
    .route(
      "/certificates/{fingerprint}/history/count",
      get(certificates::history_count::<L>),
    )
    // Verification
    .route("/verify/{fingerprint}", get(verify::handler::<L>))
    .route("/authority", get(verify::authority::<L>))
    // Observation
    .route("/notifications", get(notifications::list::<L>))
    // Helpers
    .route(
      "/fingerprint",
      post(documents::fingerprint)
        .layer(DefaultBodyLimit::max(documents::MAX_DOCUMENT_BYTES)),
    )
    .with_state(ApiState { engine, settings })
}

#[cfg(test)]
mod tests;
