//! Handler for `GET /notifications`: replay of the committed log.
//!
//! Observers that need a listing of certificates build it by replaying this
//! log from sequence 0; the registry itself has no enumeration operation.

use axum::{Json, extract::State};
use certreg_core::{Ledger, Receipt, ledger::DEFAULT_NOTIFICATION_PAGE};
use serde::Deserialize;

use crate::{ApiState, error::ApiError, extract::QueryParams};

/// Upper bound on `limit`.
pub const MAX_NOTIFICATION_PAGE: usize = 1000;

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  /// Return receipts with a sequence strictly greater than this. Default 0.
  #[serde(default)]
  pub after: u64,
  pub limit: Option<usize>,
}

/// `GET /notifications[?after=<seq>][&limit=<n>]`
pub async fn list<L>(
  State(state): State<ApiState<L>>,
  QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Vec<Receipt>>, ApiError>
where
  L: Ledger + 'static,
{
  let limit = params
    .limit
    .unwrap_or(DEFAULT_NOTIFICATION_PAGE)
    .min(MAX_NOTIFICATION_PAGE);
  let receipts = state.engine.notifications_since(params.after, limit).await?;
  Ok(Json(receipts))
}
