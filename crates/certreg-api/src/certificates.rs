//! Handlers for `/certificates` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/certificates` | Body: [`IssueBody`]; returns 201 + receipt |
//! | `GET`  | `/certificates/:fp` | Record; `exists: false` when never issued |
//! | `POST` | `/certificates/:fp/status` | Body: [`StatusBody`]; returns receipt |
//! | `GET`  | `/certificates/:fp/valid` | `{"fingerprint", "valid"}` |
//! | `GET`  | `/certificates/:fp/history` | Entries, oldest first |
//! | `GET`  | `/certificates/:fp/history/count` | `{"fingerprint", "count"}` |

use std::{future::Future, time::Duration};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use certreg_core::{
  CertificateRecord, Fingerprint, Ledger, Receipt, Status, StatusHistoryEntry,
};
use serde::{Deserialize, Serialize};

use crate::{
  ApiState,
  caller::Caller,
  error::ApiError,
  extract::{FingerprintPath, JsonBody},
};

/// Wait for `submission` up to `deadline`.
async fn within<T>(
  deadline: Duration,
  submission: impl Future<Output = certreg_core::Result<T>>,
) -> Result<T, ApiError> {
  match tokio::time::timeout(deadline, submission).await {
    Ok(result) => Ok(result?),
    Err(_) => {
      tracing::warn!(
        deadline_secs = deadline.as_secs(),
        "submission exceeded deadline; outcome unknown"
      );
      Err(ApiError::OutcomeUnknown(deadline))
    }
  }
}

// ─── Issue ────────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /certificates`.
#[derive(Debug, Deserialize)]
pub struct IssueBody {
  pub fingerprint: String,
  pub label:       String,
}

/// `POST /certificates`: returns 201 + the [`Receipt`].
pub async fn issue<L>(
  State(state): State<ApiState<L>>,
  Caller(caller): Caller,
  JsonBody(body): JsonBody<IssueBody>,
) -> Result<impl IntoResponse, ApiError>
where
  L: Ledger + 'static,
{
  let fingerprint: Fingerprint = body.fingerprint.parse()?;
  let receipt = within(
    state.settings.submit_timeout,
    state.engine.issue(fingerprint, &body.label, &caller),
  )
  .await?;
  Ok((StatusCode::CREATED, Json(receipt)))
}

// ─── Change status ────────────────────────────────────────────────────────────

/// A status given either by name (`"revoked"`) or numeric code (`1`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StatusInput {
  Code(u8),
  Name(String),
}

impl TryFrom<StatusInput> for Status {
  type Error = certreg_core::Error;

  fn try_from(input: StatusInput) -> Result<Self, Self::Error> {
    match input {
      StatusInput::Code(code) => Status::from_code(code),
      StatusInput::Name(name) => Status::parse(&name),
    }
  }
}

/// JSON body accepted by `POST /certificates/:fp/status`.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: StatusInput,
  #[serde(default)]
  pub reason: String,
}

/// `POST /certificates/:fp/status`, body: `{"status":"revoked","reason":"..."}`.
pub async fn change_status<L>(
  State(state): State<ApiState<L>>,
  FingerprintPath(fingerprint): FingerprintPath,
  Caller(caller): Caller,
  JsonBody(body): JsonBody<StatusBody>,
) -> Result<Json<Receipt>, ApiError>
where
  L: Ledger + 'static,
{
  let status = Status::try_from(body.status)?;
  let receipt = within(
    state.settings.submit_timeout,
    state
      .engine
      .change_status(fingerprint, status, body.reason, &caller),
  )
  .await?;
  Ok(Json(receipt))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /certificates/:fp`
pub async fn lookup<L>(
  State(state): State<ApiState<L>>,
  FingerprintPath(fingerprint): FingerprintPath,
) -> Result<Json<CertificateRecord>, ApiError>
where
  L: Ledger + 'static,
{
  Ok(Json(state.engine.lookup(fingerprint).await?))
}

#[derive(Debug, Serialize)]
pub struct Validity {
  pub fingerprint: Fingerprint,
  pub valid:       bool,
}

/// `GET /certificates/:fp/valid`
pub async fn valid<L>(
  State(state): State<ApiState<L>>,
  FingerprintPath(fingerprint): FingerprintPath,
) -> Result<Json<Validity>, ApiError>
where
  L: Ledger + 'static,
{
  let valid = state.engine.is_valid(fingerprint).await?;
  Ok(Json(Validity { fingerprint, valid }))
}

/// `GET /certificates/:fp/history`
pub async fn history<L>(
  State(state): State<ApiState<L>>,
  FingerprintPath(fingerprint): FingerprintPath,
) -> Result<Json<Vec<StatusHistoryEntry>>, ApiError>
where
  L: Ledger + 'static,
{
  Ok(Json(state.engine.history(fingerprint).await?))
}

#[derive(Debug, Serialize)]
pub struct HistoryCount {
  pub fingerprint: Fingerprint,
  pub count:       u64,
}

/// `GET /certificates/:fp/history/count`
pub async fn history_count<L>(
  State(state): State<ApiState<L>>,
  FingerprintPath(fingerprint): FingerprintPath,
) -> Result<Json<HistoryCount>, ApiError>
where
  L: Ledger + 'static,
{
  let count = state.engine.history_count(fingerprint).await?;
  Ok(Json(HistoryCount { fingerprint, count }))
}
