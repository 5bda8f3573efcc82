//! [`RegistryEngine`]: the registry's public operations over any [`Ledger`].
//!
//! Mutations are validated and pre-checked with cheap reads before being
//! submitted, so obviously doomed transitions never cost a ledger write. The
//! ledger re-checks everything when it applies the transition; the
//! pre-checks only avoid wasted submissions.
//!
//! No operation is retried here. A caller that abandons a pending
//! submission must re-query before trying again; a duplicate issuance is
//! rejected with [`Error::AlreadyExists`] either way.

use tokio::sync::broadcast;

use crate::{
  Error, Result,
  certificate::{
    CertificateRecord, Identity, Receipt, Status, StatusHistoryEntry,
    Verification,
  },
  fingerprint::Fingerprint,
  ledger::Ledger,
  registry::{Transition, validate_issue},
};

/// The registry engine. Cheap to share behind an `Arc`.
#[derive(Clone)]
pub struct RegistryEngine<L> {
  ledger: L,
}

impl<L: Ledger> RegistryEngine<L> {
  pub fn new(ledger: L) -> Self { Self { ledger } }

  pub fn ledger(&self) -> &L { &self.ledger }

  // ── Mutations ─────────────────────────────────────────────────────────

  /// Register a new certificate for `fingerprint`.
  pub async fn issue(
    &self,
    fingerprint: Fingerprint,
    label: &str,
    caller: &Identity,
  ) -> Result<Receipt> {
    let label = validate_issue(&fingerprint, label).inspect_err(|e| {
      tracing::warn!(%fingerprint, error = %e, "issue rejected");
    })?;

    if self.find(fingerprint).await?.is_some() {
      tracing::warn!(%fingerprint, "issue rejected: already registered");
      return Err(Error::AlreadyExists(fingerprint));
    }

    let receipt = self
      .submit(caller, Transition::Issue { fingerprint, label })
      .await?;
    tracing::info!(
      fingerprint = %fingerprint.short(),
      issuer = %caller,
      sequence = receipt.sequence,
      tx_id = %receipt.tx_id,
      "certificate issued"
    );
    Ok(receipt)
  }

  /// Move an existing certificate to `status`, recording `reason`.
  pub async fn change_status(
    &self,
    fingerprint: Fingerprint,
    status: Status,
    reason: impl Into<String>,
    caller: &Identity,
  ) -> Result<Receipt> {
    if self.find(fingerprint).await?.is_none() {
      tracing::warn!(%fingerprint, "status change rejected: not found");
      return Err(Error::NotFound(fingerprint));
    }

    let transition = Transition::ChangeStatus {
      fingerprint,
      status,
      reason: reason.into(),
    };
    let receipt = self.submit(caller, transition).await?;
    tracing::info!(
      fingerprint = %fingerprint.short(),
      %status,
      changed_by = %caller,
      sequence = receipt.sequence,
      tx_id = %receipt.tx_id,
      "certificate status changed"
    );
    Ok(receipt)
  }

  async fn submit(&self, caller: &Identity, transition: Transition) -> Result<Receipt> {
    self
      .ledger
      .submit(caller.clone(), transition)
      .await
      .map_err(|e| match Into::<Error>::into(e) {
        Error::LedgerUnavailable(msg) => Error::TransitionRejected(msg),
        other => other,
      })
      .inspect_err(|e| {
        tracing::warn!(caller = %caller, kind = %e.kind(), error = %e, "transition rejected");
      })
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The record for `fingerprint`, or `None` if it was never issued.
  pub async fn find(&self, fingerprint: Fingerprint) -> Result<Option<CertificateRecord>> {
    self.ledger.record(fingerprint).await.map_err(Into::into)
  }

  /// Like [`Self::find`], but a missing record is returned as the default
  /// record with `exists == false` rather than `None`.
  pub async fn lookup(&self, fingerprint: Fingerprint) -> Result<CertificateRecord> {
    Ok(self.find(fingerprint).await?.unwrap_or_default())
  }

  /// True only if the record exists and is currently active.
  pub async fn is_valid(&self, fingerprint: Fingerprint) -> Result<bool> {
    Ok(self.lookup(fingerprint).await?.is_valid())
  }

  pub async fn history(&self, fingerprint: Fingerprint) -> Result<Vec<StatusHistoryEntry>> {
    self.ledger.history(fingerprint).await.map_err(Into::into)
  }

  pub async fn history_count(&self, fingerprint: Fingerprint) -> Result<u64> {
    self.ledger.history_count(fingerprint).await.map_err(Into::into)
  }

  /// Record, validity and history together, from one ledger state.
  pub async fn verify(&self, fingerprint: Fingerprint) -> Result<Verification> {
    self.ledger.verification(fingerprint).await.map_err(Into::into)
  }

  // ── Observation ───────────────────────────────────────────────────────

  pub async fn notifications_since(&self, after: u64, limit: usize) -> Result<Vec<Receipt>> {
    self
      .ledger
      .notifications_since(after, limit)
      .await
      .map_err(Into::into)
  }

  pub fn subscribe(&self) -> broadcast::Receiver<Receipt> { self.ledger.subscribe() }

  pub fn authority(&self) -> Option<&Identity> { self.ledger.policy().authority() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{authority::SingleAuthority, certificate::Notification, memory::MemoryLedger};

  fn engine() -> RegistryEngine<MemoryLedger> {
    RegistryEngine::new(MemoryLedger::new(SingleAuthority::new("admin")))
  }

  fn admin() -> Identity { Identity::new("admin") }

  fn doc(name: &str) -> Fingerprint { Fingerprint::of_document(name.as_bytes()) }

  #[tokio::test]
  async fn never_issued_fingerprint_reads_as_absent() {
    let e = engine();
    let f = doc("never");

    assert!(!e.lookup(f).await.unwrap().exists);
    assert!(e.find(f).await.unwrap().is_none());
    assert!(e.history(f).await.unwrap().is_empty());
    assert_eq!(e.history_count(f).await.unwrap(), 0);
    assert!(!e.is_valid(f).await.unwrap());
  }

  #[tokio::test]
  async fn issue_then_lookup() {
    let e = engine();
    let f = doc("diploma");

    let receipt = e.issue(f, "X", &admin()).await.unwrap();
    assert_eq!(receipt.sequence, 1);

    let record = e.lookup(f).await.unwrap();
    assert!(record.exists);
    assert_eq!(record.fingerprint, f);
    assert_eq!(record.label, "X");
    assert_eq!(record.issuer, admin());
    assert_eq!(record.status, Status::Active);
    assert_eq!(e.history_count(f).await.unwrap(), 0);
    assert!(e.is_valid(f).await.unwrap());
  }

  #[tokio::test]
  async fn duplicate_issue_keeps_original_record() {
    let e = engine();
    let f = doc("diploma");
    e.issue(f, "First", &admin()).await.unwrap();
    let before = e.lookup(f).await.unwrap();

    assert_eq!(
      e.issue(f, "Second", &admin()).await,
      Err(Error::AlreadyExists(f))
    );
    let after = e.lookup(f).await.unwrap();
    assert_eq!(after.label, "First");
    assert_eq!(after.issued_at, before.issued_at);
  }

  #[tokio::test]
  async fn zero_fingerprint_and_blank_label_are_rejected() {
    let e = engine();
    assert_eq!(
      e.issue(Fingerprint::ZERO, "Diploma", &admin()).await,
      Err(Error::InvalidFingerprint)
    );
    assert_eq!(
      e.issue(doc("a"), "   ", &admin()).await,
      Err(Error::EmptyLabel)
    );
    assert!(e.notifications_since(0, 10).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn self_transition_after_issue_is_rejected() {
    let e = engine();
    let f = doc("a");
    e.issue(f, "Diploma", &admin()).await.unwrap();

    assert_eq!(
      e.change_status(f, Status::Active, "", &admin()).await,
      Err(Error::StatusUnchanged {
        fingerprint: f,
        status:      Status::Active,
      })
    );
    assert_eq!(e.history_count(f).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn transitions_are_logged_in_order() {
    let e = engine();
    let f = doc("a");
    e.issue(f, "Diploma", &admin()).await.unwrap();

    e.change_status(f, Status::Revoked, "r1", &admin()).await.unwrap();
    assert!(!e.is_valid(f).await.unwrap());
    e.change_status(f, Status::Active, "r2", &admin()).await.unwrap();
    assert!(e.is_valid(f).await.unwrap());
    e.change_status(f, Status::Updated, "r3", &admin()).await.unwrap();
    assert!(!e.is_valid(f).await.unwrap());

    let history = e.history(f).await.unwrap();
    let summary: Vec<_> = history
      .iter()
      .map(|h| (h.status, h.reason.as_str()))
      .collect();
    assert_eq!(summary, vec![
      (Status::Revoked, "r1"),
      (Status::Active, "r2"),
      (Status::Updated, "r3"),
    ]);
    assert!(history.windows(2).all(|w| w[0].changed_at <= w[1].changed_at));
    assert!(history.iter().all(|h| h.changed_by == admin()));
    assert_eq!(e.history_count(f).await.unwrap(), 3);
    assert_eq!(e.lookup(f).await.unwrap().status, Status::Updated);

    // Reads are stable.
    assert_eq!(e.history(f).await.unwrap(), history);
  }

  #[tokio::test]
  async fn non_authority_changes_nothing() {
    let e = engine();
    let f = doc("a");
    let mallory = Identity::new("mallory");
    e.issue(f, "Diploma", &admin()).await.unwrap();
    e.change_status(f, Status::Revoked, "r1", &admin()).await.unwrap();

    let before = e.verify(f).await.unwrap();
    let log_before = e.notifications_since(0, 100).await.unwrap();

    assert_eq!(
      e.issue(doc("b"), "Other", &mallory).await,
      Err(Error::Unauthorized(mallory.clone()))
    );
    assert_eq!(
      e.change_status(f, Status::Active, "sneaky", &mallory).await,
      Err(Error::Unauthorized(mallory.clone()))
    );

    assert_eq!(e.verify(f).await.unwrap(), before);
    assert!(!e.lookup(doc("b")).await.unwrap().exists);
    assert_eq!(e.notifications_since(0, 100).await.unwrap(), log_before);
  }

  #[tokio::test]
  async fn change_status_on_unknown_fingerprint_creates_nothing() {
    let e = engine();
    let f = doc("ghost");
    assert_eq!(
      e.change_status(f, Status::Revoked, "", &admin()).await,
      Err(Error::NotFound(f))
    );
    assert!(!e.lookup(f).await.unwrap().exists);
    assert!(e.history(f).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn subscribers_receive_receipts_in_order() {
    let e = engine();
    let mut rx = e.subscribe();
    let f = doc("a");

    e.issue(f, "Diploma", &admin()).await.unwrap();
    e.change_status(f, Status::Revoked, "expired", &admin()).await.unwrap();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.sequence, 1);
    assert!(matches!(
      first.notification,
      Notification::CertificateIssued { fingerprint, .. } if fingerprint == f
    ));
    let second = rx.recv().await.unwrap();
    assert_eq!(second.sequence, 2);
    assert!(matches!(
      second.notification,
      Notification::StatusChanged { status: Status::Revoked, previous: Status::Active, ref reason, .. }
        if reason == "expired"
    ));
  }

  #[tokio::test]
  async fn notifications_can_be_replayed_from_a_sequence() {
    let e = engine();
    for name in ["a", "b", "c"] {
      e.issue(doc(name), name, &admin()).await.unwrap();
    }

    let all = e.notifications_since(0, 100).await.unwrap();
    assert_eq!(all.iter().map(|r| r.sequence).collect::<Vec<_>>(), vec![1, 2, 3]);

    let tail = e.notifications_since(1, 1).await.unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].sequence, 2);
    assert_eq!(tail[0].notification.fingerprint(), doc("b"));
  }

  #[tokio::test]
  async fn verify_combines_record_validity_and_history() {
    let e = engine();
    let f = doc("a");
    e.issue(f, "Diploma", &admin()).await.unwrap();
    e.change_status(f, Status::Updated, "reissued", &admin()).await.unwrap();

    let v = e.verify(f).await.unwrap();
    assert!(v.record.exists);
    assert!(!v.valid);
    assert_eq!(v.history.len(), 1);
    assert_eq!(e.authority(), Some(&admin()));
  }
}
