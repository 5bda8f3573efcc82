//! Encoding and decoding helpers between registry types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Fingerprints are stored as
//! `0x`-prefixed lowercase hex, statuses by their lowercase name, and
//! notifications as compact JSON.

use certreg_core::{
  CertificateRecord, Fingerprint, Identity, Notification, Receipt, Status,
  StatusHistoryEntry,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Fingerprint ─────────────────────────────────────────────────────────────

pub fn encode_fingerprint(fp: &Fingerprint) -> String { fp.to_string() }

pub fn decode_fingerprint(s: &str) -> Result<Fingerprint> {
  s.parse()
    .map_err(|_| Error::Decode(format!("bad fingerprint column: {s:?}")))
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn encode_status(status: Status) -> &'static str {
  match status {
    Status::Active => "active",
    Status::Revoked => "revoked",
    Status::Updated => "updated",
  }
}

pub fn decode_status(s: &str) -> Result<Status> {
  match s {
    "active" => Ok(Status::Active),
    "revoked" => Ok(Status::Revoked),
    "updated" => Ok(Status::Updated),
    other => Err(Error::Decode(format!("unknown status: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `records` row.
pub struct RawRecord {
  pub fingerprint: String,
  pub label:       String,
  pub issued_at:   String,
  pub issuer:      String,
  pub status:      String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fingerprint: row.get(0)?,
      label:       row.get(1)?,
      issued_at:   row.get(2)?,
      issuer:      row.get(3)?,
      status:      row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<CertificateRecord> {
    Ok(CertificateRecord {
      fingerprint: decode_fingerprint(&self.fingerprint)?,
      exists:      true,
      label:       self.label,
      issued_at:   decode_dt(&self.issued_at)?,
      issuer:      Identity::new(self.issuer),
      status:      decode_status(&self.status)?,
    })
  }
}

/// Raw strings read directly from a `status_history` row.
pub struct RawHistoryEntry {
  pub status:     String,
  pub changed_at: String,
  pub changed_by: String,
  pub reason:     String,
}

impl RawHistoryEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      status:     row.get(0)?,
      changed_at: row.get(1)?,
      changed_by: row.get(2)?,
      reason:     row.get(3)?,
    })
  }

  pub fn into_entry(self) -> Result<StatusHistoryEntry> {
    Ok(StatusHistoryEntry {
      status:     decode_status(&self.status)?,
      changed_at: decode_dt(&self.changed_at)?,
      changed_by: Identity::new(self.changed_by),
      reason:     self.reason,
    })
  }
}

/// Raw values read directly from a `transactions` row.
pub struct RawReceipt {
  pub sequence:     i64,
  pub tx_id:        String,
  pub committed_at: String,
  pub notification: String,
}

impl RawReceipt {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      sequence:     row.get(0)?,
      tx_id:        row.get(1)?,
      committed_at: row.get(2)?,
      notification: row.get(3)?,
    })
  }

  pub fn into_receipt(self) -> Result<Receipt> {
    let sequence = u64::try_from(self.sequence)
      .map_err(|_| Error::Decode(format!("negative sequence: {}", self.sequence)))?;
    let notification: Notification = serde_json::from_str(&self.notification)?;
    Ok(Receipt {
      tx_id: Uuid::parse_str(&self.tx_id)?,
      sequence,
      finalized_at: decode_dt(&self.committed_at)?,
      notification,
    })
  }
}
