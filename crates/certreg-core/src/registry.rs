//! The registry state machine.
//!
//! [`apply`] is a pure function from the current record (if any) and a
//! requested [`Transition`] to the [`Effect`] that committing it would have.
//! It never touches storage; ledgers call it inside their own atomic commit
//! and persist the effect only when it returns `Ok`.
//!
//! [`Registry`] is the in-memory form of the persisted state: one record per
//! fingerprint plus an append-only history vector per fingerprint.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  authority::AuthorizationPolicy,
  certificate::{
    CertificateRecord, Identity, MAX_LABEL_CHARS, Notification, Status,
    StatusHistoryEntry,
  },
  fingerprint::Fingerprint,
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A mutation request, as submitted to a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Transition {
  Issue {
    fingerprint: Fingerprint,
    label:       String,
  },
  ChangeStatus {
    fingerprint: Fingerprint,
    status:      Status,
    reason:      String,
  },
}

impl Transition {
  pub fn fingerprint(&self) -> Fingerprint {
    match self {
      Self::Issue { fingerprint, .. }
      | Self::ChangeStatus { fingerprint, .. } => *fingerprint,
    }
  }
}

/// Ledger-supplied facts about the commit in progress.
pub struct TransitionContext<'a> {
  pub caller: &'a Identity,
  /// Ledger time for this commit.
  pub now:    DateTime<Utc>,
  pub policy: &'a dyn AuthorizationPolicy,
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// What a successful transition changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
  /// The record as it must be stored after the commit.
  pub record:       CertificateRecord,
  /// The history entry to append, for status changes.
  pub appended:     Option<StatusHistoryEntry>,
  pub notification: Notification,
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Stateless checks on issuance input. Returns the label as it will be
/// stored (surrounding whitespace removed).
pub fn validate_issue(fingerprint: &Fingerprint, label: &str) -> Result<String> {
  if fingerprint.is_zero() {
    return Err(Error::InvalidFingerprint);
  }
  let label = label.trim();
  if label.is_empty() {
    return Err(Error::EmptyLabel);
  }
  let len = label.chars().count();
  if len > MAX_LABEL_CHARS {
    return Err(Error::LabelTooLong { len, max: MAX_LABEL_CHARS });
  }
  Ok(label.to_owned())
}

// ─── Transition function ─────────────────────────────────────────────────────

/// Decide the effect of `transition` against the `current` record.
///
/// Issue checks, in order: zero fingerprint, empty label, label length,
/// existing record, caller authority. Status changes check: missing record,
/// caller authority, self-transition.
pub fn apply(
  current: Option<&CertificateRecord>,
  transition: &Transition,
  ctx: &TransitionContext<'_>,
) -> Result<Effect> {
  match transition {
    Transition::Issue { fingerprint, label } => {
      let label = validate_issue(fingerprint, label)?;
      if current.is_some_and(|r| r.exists) {
        return Err(Error::AlreadyExists(*fingerprint));
      }
      authorize(ctx)?;

      let record = CertificateRecord {
        fingerprint: *fingerprint,
        exists:      true,
        label:       label.clone(),
        issued_at:   ctx.now,
        issuer:      ctx.caller.clone(),
        status:      Status::Active,
      };
      Ok(Effect {
        notification: Notification::CertificateIssued {
          fingerprint: *fingerprint,
          label,
          issuer: ctx.caller.clone(),
          issued_at: ctx.now,
        },
        record,
        appended: None,
      })
    }

    Transition::ChangeStatus {
      fingerprint,
      status,
      reason,
    } => {
      let current = current
        .filter(|r| r.exists)
        .ok_or(Error::NotFound(*fingerprint))?;
      authorize(ctx)?;
      if current.status == *status {
        return Err(Error::StatusUnchanged {
          fingerprint: *fingerprint,
          status:      *status,
        });
      }

      let entry = StatusHistoryEntry {
        status:     *status,
        changed_at: ctx.now,
        changed_by: ctx.caller.clone(),
        reason:     reason.clone(),
      };
      let record = CertificateRecord {
        status: *status,
        ..current.clone()
      };
      Ok(Effect {
        notification: Notification::StatusChanged {
          fingerprint: *fingerprint,
          status:      *status,
          previous:    current.status,
          changed_by:  ctx.caller.clone(),
          changed_at:  ctx.now,
          reason:      reason.clone(),
        },
        record,
        appended: Some(entry),
      })
    }
  }
}

fn authorize(ctx: &TransitionContext<'_>) -> Result<()> {
  if ctx.policy.permits(ctx.caller) {
    Ok(())
  } else {
    Err(Error::Unauthorized(ctx.caller.clone()))
  }
}

// ─── In-memory state ─────────────────────────────────────────────────────────

/// Records keyed by fingerprint, each with an append-only history.
#[derive(Debug, Clone, Default)]
pub struct Registry {
  records: HashMap<Fingerprint, CertificateRecord>,
  history: HashMap<Fingerprint, Vec<StatusHistoryEntry>>,
}

impl Registry {
  pub fn new() -> Self { Self::default() }

  /// Apply `transition` and store its effect. On error nothing changes.
  pub fn commit(
    &mut self,
    transition: &Transition,
    ctx: &TransitionContext<'_>,
  ) -> Result<Notification> {
    let fingerprint = transition.fingerprint();
    let effect = apply(self.records.get(&fingerprint), transition, ctx)?;

    if let Some(entry) = effect.appended {
      self.history.entry(fingerprint).or_default().push(entry);
    }
    self.records.insert(fingerprint, effect.record);
    Ok(effect.notification)
  }

  pub fn record(&self, fingerprint: &Fingerprint) -> Option<&CertificateRecord> {
    self.records.get(fingerprint)
  }

  /// Oldest first; empty for unknown fingerprints.
  pub fn history(&self, fingerprint: &Fingerprint) -> &[StatusHistoryEntry] {
    self.history.get(fingerprint).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn history_count(&self, fingerprint: &Fingerprint) -> usize {
    self.history(fingerprint).len()
  }
}
