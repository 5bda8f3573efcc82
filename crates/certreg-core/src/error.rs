//! Error types for `certreg-core`.

use serde::Serialize;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

use crate::{
  certificate::{Identity, Status},
  fingerprint::Fingerprint,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("fingerprint must not be the zero value")]
  InvalidFingerprint,

  #[error("malformed fingerprint {0:?}: expected 32 bytes as 64 hex digits")]
  MalformedFingerprint(String),

  #[error("label must not be empty")]
  EmptyLabel,

  #[error("label is {len} characters long; the maximum is {max}")]
  LabelTooLong { len: usize, max: usize },

  #[error("certificate {0} already exists")]
  AlreadyExists(Fingerprint),

  #[error("certificate {0} not found")]
  NotFound(Fingerprint),

  #[error("certificate {fingerprint} is already {status}")]
  StatusUnchanged {
    fingerprint: Fingerprint,
    status:      Status,
  },

  #[error("{0} is not permitted to modify the registry")]
  Unauthorized(Identity),

  #[error("unknown certificate status: {0:?}")]
  UnknownStatus(String),

  /// The ledger refused or failed to apply a submitted transition for a
  /// reason unrelated to the registry rules.
  #[error("transition rejected by the ledger: {0}")]
  TransitionRejected(String),

  /// The ledger could not be reached or read.
  #[error("ledger unavailable: {0}")]
  LedgerUnavailable(String),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidFingerprint => ErrorKind::InvalidFingerprint,
      Self::MalformedFingerprint(_) => ErrorKind::MalformedFingerprint,
      Self::EmptyLabel => ErrorKind::EmptyLabel,
      Self::LabelTooLong { .. } => ErrorKind::LabelTooLong,
      Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::StatusUnchanged { .. } => ErrorKind::StatusUnchanged,
      Self::Unauthorized(_) => ErrorKind::Unauthorized,
      Self::UnknownStatus(_) => ErrorKind::UnknownStatus,
      Self::TransitionRejected(_) => ErrorKind::TransitionRejected,
      Self::LedgerUnavailable(_) => ErrorKind::LedgerUnavailable,
    }
  }
}

/// Payload-free discriminant of [`Error`], stable across the wire.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  InvalidFingerprint,
  MalformedFingerprint,
  EmptyLabel,
  LabelTooLong,
  AlreadyExists,
  NotFound,
  StatusUnchanged,
  Unauthorized,
  UnknownStatus,
  TransitionRejected,
  LedgerUnavailable,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
