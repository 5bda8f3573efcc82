//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every registry error kind keeps its own status code and `kind` tag so
//! clients can tell "already registered" from "not found" from "no
//! permission".

use std::time::Duration;

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use certreg_core::{Error as RegistryError, ErrorKind};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Registry(#[from] RegistryError),

  /// A mutating request arrived without an authenticated caller.
  #[error("authentication required")]
  Unauthenticated,

  /// The request body, path or query string could not be decoded.
  #[error("bad request: {0}")]
  BadRequest(String),

  /// The ledger did not reach finality before the deadline. The transition
  /// may still commit.
  #[error(
    "no finality after {}s; outcome unknown, re-query before retrying",
    .0.as_secs()
  )]
  OutcomeUnknown(Duration),
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl ApiError {
  fn status_and_kind(&self) -> (StatusCode, &'static str) {
    match self {
      ApiError::Registry(e) => {
        let status = match e.kind() {
          ErrorKind::InvalidFingerprint
          | ErrorKind::MalformedFingerprint
          | ErrorKind::EmptyLabel
          | ErrorKind::LabelTooLong
          | ErrorKind::UnknownStatus => StatusCode::BAD_REQUEST,
          ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
          ErrorKind::NotFound => StatusCode::NOT_FOUND,
          ErrorKind::AlreadyExists | ErrorKind::StatusUnchanged => {
            StatusCode::CONFLICT
          }
          ErrorKind::TransitionRejected => StatusCode::BAD_GATEWAY,
          ErrorKind::LedgerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, e.kind().into())
      }
      ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
      ApiError::OutcomeUnknown(_) => {
        (StatusCode::GATEWAY_TIMEOUT, "outcome_unknown")
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind) = self.status_and_kind();
    if status.is_server_error() {
      tracing::error!(%status, kind, error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string(), "kind": kind })))
      .into_response()
  }
}
