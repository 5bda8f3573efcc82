//! Certificate records, status history, and the notifications and receipts
//! produced when the registry changes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, fingerprint::Fingerprint};

/// Maximum label length, counted in characters after trimming.
pub const MAX_LABEL_CHARS: usize = 256;

// ─── Identity ────────────────────────────────────────────────────────────────

/// The identity of a caller, established outside the registry (for example
/// by key-based signing or an authenticated session).
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Identity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for Identity {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for Identity {
  fn from(s: String) -> Self { Self(s) }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// The trust state of a certificate.
///
/// Every state may transition to either of the other two; there is no
/// terminal state.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Status {
  #[default]
  Active,
  Revoked,
  Updated,
}

impl Status {
  pub const ALL: [Status; 3] = [Status::Active, Status::Revoked, Status::Updated];

  /// Stable numeric code: 0 = active, 1 = revoked, 2 = updated.
  pub fn code(self) -> u8 {
    match self {
      Self::Active => 0,
      Self::Revoked => 1,
      Self::Updated => 2,
    }
  }

  pub fn from_code(code: u8) -> Result<Self> {
    match code {
      0 => Ok(Self::Active),
      1 => Ok(Self::Revoked),
      2 => Ok(Self::Updated),
      other => Err(Error::UnknownStatus(other.to_string())),
    }
  }

  /// Parse a status name (case-insensitive).
  pub fn parse(name: &str) -> Result<Self> {
    name
      .trim()
      .parse()
      .map_err(|_| Error::UnknownStatus(name.to_owned()))
  }

  pub fn is_active(self) -> bool { matches!(self, Self::Active) }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// One certificate, keyed by its fingerprint.
///
/// The [`Default`] value (`exists == false`, everything else zeroed) is the
/// negative lookup result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CertificateRecord {
  pub fingerprint: Fingerprint,
  pub exists:      bool,
  pub label:       String,
  pub issued_at:   DateTime<Utc>,
  pub issuer:      Identity,
  pub status:      Status,
}

impl CertificateRecord {
  /// A record is valid only while it exists and is [`Status::Active`].
  pub fn is_valid(&self) -> bool { self.exists && self.status.is_active() }
}

/// An immutable audit entry for one status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
  /// The status the record transitioned to.
  pub status:     Status,
  pub changed_at: DateTime<Utc>,
  pub changed_by: Identity,
  /// May be empty.
  pub reason:     String,
}

// ─── Notifications ───────────────────────────────────────────────────────────

/// Emitted once per committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
  CertificateIssued {
    fingerprint: Fingerprint,
    label:       String,
    issuer:      Identity,
    issued_at:   DateTime<Utc>,
  },
  StatusChanged {
    fingerprint: Fingerprint,
    status:      Status,
    previous:    Status,
    changed_by:  Identity,
    changed_at:  DateTime<Utc>,
    reason:      String,
  },
}

impl Notification {
  pub fn fingerprint(&self) -> Fingerprint {
    match self {
      Self::CertificateIssued { fingerprint, .. }
      | Self::StatusChanged { fingerprint, .. } => *fingerprint,
    }
  }

  /// Short name used for the ledger's `kind` column and log fields.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::CertificateIssued { .. } => "certificate_issued",
      Self::StatusChanged { .. } => "status_changed",
    }
  }
}

/// Proof that a transition reached finality on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
  pub tx_id:        Uuid,
  /// Ledger-wide position; strictly increasing from 1.
  pub sequence:     u64,
  pub finalized_at: DateTime<Utc>,
  pub notification: Notification,
}

// ─── Combined read model ─────────────────────────────────────────────────────

/// Everything a verifier needs about one fingerprint, read in one go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
  pub record:  CertificateRecord,
  pub valid:   bool,
  pub history: Vec<StatusHistoryEntry>,
}

impl Verification {
  /// Build from a record and its history as read from one ledger state.
  /// A missing record yields the default record, invalid, with no history.
  pub fn new(record: Option<CertificateRecord>, history: Vec<StatusHistoryEntry>) -> Self {
    match record {
      Some(record) => Self {
        valid: record.is_valid(),
        record,
        history,
      },
      None => Self {
        record:  CertificateRecord::default(),
        valid:   false,
        history: Vec::new(),
      },
    }
  }
}
