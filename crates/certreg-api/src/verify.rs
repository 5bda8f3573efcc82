//! Handlers for `GET /verify/:fp` and `GET /authority`.

use axum::{Json, extract::State};
use certreg_core::{Identity, Ledger, Verification};
use serde::Serialize;

use crate::{ApiState, error::ApiError, extract::FingerprintPath};

/// `GET /verify/:fp`: record, validity and history in one response.
pub async fn handler<L>(
  State(state): State<ApiState<L>>,
  FingerprintPath(fingerprint): FingerprintPath,
) -> Result<Json<Verification>, ApiError>
where
  L: Ledger + 'static,
{
  Ok(Json(state.engine.verify(fingerprint).await?))
}

#[derive(Debug, Serialize)]
pub struct Authority {
  /// `null` when the configured policy does not name a single identity.
  pub authority: Option<Identity>,
}

/// `GET /authority`
pub async fn authority<L>(State(state): State<ApiState<L>>) -> Json<Authority>
where
  L: Ledger + 'static,
{
  Json(Authority {
    authority: state.engine.authority().cloned(),
  })
}
