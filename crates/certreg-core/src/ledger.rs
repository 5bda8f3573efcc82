//! The `Ledger` trait: the narrow transactional interface the registry
//! engine is layered on.
//!
//! A ledger totally orders submitted transitions, applies each one
//! atomically through [`crate::registry::apply`], and makes committed state
//! publicly readable. Implementations: [`crate::memory::MemoryLedger`] and
//! `certreg-ledger-sqlite`.

use std::future::Future;

use tokio::sync::broadcast;

use crate::{
  authority::AuthorizationPolicy,
  certificate::{
    CertificateRecord, Identity, Receipt, StatusHistoryEntry, Verification,
  },
  fingerprint::Fingerprint,
  registry::Transition,
};

/// Default number of receipts returned by [`Ledger::notifications_since`].
pub const DEFAULT_NOTIFICATION_PAGE: usize = 100;

/// Capacity of the subscriber channel; slow subscribers observe `Lagged`.
pub const SUBSCRIBER_CAPACITY: usize = 1024;

/// Abstraction over the shared append-only ledger.
///
/// Mutations go through [`Ledger::submit`] only; there is no way to write a
/// record or history entry directly. All methods return `Send` futures so
/// the trait can be used in multi-threaded async runtimes.
pub trait Ledger: Send + Sync {
  /// Registry rule violations must convert back into the same
  /// [`crate::Error`] variant; infrastructure failures convert into
  /// [`crate::Error::LedgerUnavailable`].
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Submit a transition on behalf of `caller` and wait for finality.
  ///
  /// Either the transition commits completely (record written, history
  /// appended, receipt logged and broadcast) or it fails with no effect.
  fn submit(
    &self,
    caller: Identity,
    transition: Transition,
  ) -> impl Future<Output = Result<Receipt, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The committed record for `fingerprint`, or `None` if never issued.
  fn record(
    &self,
    fingerprint: Fingerprint,
  ) -> impl Future<Output = Result<Option<CertificateRecord>, Self::Error>> + Send + '_;

  /// Committed history, oldest first. Empty for unknown fingerprints.
  fn history(
    &self,
    fingerprint: Fingerprint,
  ) -> impl Future<Output = Result<Vec<StatusHistoryEntry>, Self::Error>> + Send + '_;

  /// Length of [`Ledger::history`] without materialising it.
  fn history_count(
    &self,
    fingerprint: Fingerprint,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Record and history for `fingerprint` read from a single committed
  /// state, so no transition lands between the two.
  fn verification(
    &self,
    fingerprint: Fingerprint,
  ) -> impl Future<Output = Result<Verification, Self::Error>> + Send + '_;

  /// Committed receipts with `sequence > after`, in ledger order, at most
  /// `limit` of them.
  fn notifications_since(
    &self,
    after: u64,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Receipt>, Self::Error>> + Send + '_;

  // ── Observation ───────────────────────────────────────────────────────

  /// Receive every receipt committed after this call.
  fn subscribe(&self) -> broadcast::Receiver<Receipt>;

  /// The policy this ledger enforces on mutations.
  fn policy(&self) -> &dyn AuthorizationPolicy;
}
