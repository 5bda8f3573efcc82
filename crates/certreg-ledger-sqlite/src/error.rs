//! Error type for `certreg-ledger-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A registry rule rejected the transition.
  #[error(transparent)]
  Registry(#[from] certreg_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column could not be decoded back into a domain value.
  #[error("decode error: {0}")]
  Decode(String),
}

impl From<Error> for certreg_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Registry(inner) => inner,
      other => certreg_core::Error::LedgerUnavailable(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
