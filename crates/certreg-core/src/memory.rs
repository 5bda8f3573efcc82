//! [`MemoryLedger`]: a process-local [`Ledger`] over a [`Registry`].
//!
//! Every commit runs under one mutex, which gives the same total order a
//! shared ledger would. Useful for tests and for embedding the registry
//! without persistence.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  Error, Result,
  authority::AuthorizationPolicy,
  certificate::{
    CertificateRecord, Identity, Receipt, StatusHistoryEntry, Verification,
  },
  fingerprint::Fingerprint,
  ledger::{Ledger, SUBSCRIBER_CAPACITY},
  registry::{Registry, Transition, TransitionContext},
};

#[derive(Default)]
struct State {
  registry: Registry,
  log:      Vec<Receipt>,
}

/// An in-memory ledger. Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct MemoryLedger {
  state:  Arc<Mutex<State>>,
  policy: Arc<dyn AuthorizationPolicy>,
  events: broadcast::Sender<Receipt>,
}

impl MemoryLedger {
  pub fn new(policy: impl AuthorizationPolicy + 'static) -> Self {
    let (events, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
    Self {
      state: Arc::new(Mutex::new(State::default())),
      policy: Arc::new(policy),
      events,
    }
  }

  fn lock(&self) -> Result<MutexGuard<'_, State>> {
    self
      .state
      .lock()
      .map_err(|_| Error::LedgerUnavailable("ledger state poisoned".into()))
  }
}

impl Ledger for MemoryLedger {
  type Error = Error;

  async fn submit(&self, caller: Identity, transition: Transition) -> Result<Receipt> {
    let receipt = {
      let mut state = self.lock()?;
      let now = Utc::now();
      let ctx = TransitionContext {
        caller: &caller,
        now,
        policy: self.policy.as_ref(),
      };
      let notification = state.registry.commit(&transition, &ctx)?;
      let receipt = Receipt {
        tx_id: Uuid::new_v4(),
        sequence: state.log.len() as u64 + 1,
        finalized_at: now,
        notification,
      };
      state.log.push(receipt.clone());
      // Sent under the lock so subscribers see commit order. No
      // subscribers is not an error.
      let _ = self.events.send(receipt.clone());
      receipt
    };

    Ok(receipt)
  }

  async fn record(&self, fingerprint: Fingerprint) -> Result<Option<CertificateRecord>> {
    Ok(self.lock()?.registry.record(&fingerprint).cloned())
  }

  async fn history(&self, fingerprint: Fingerprint) -> Result<Vec<StatusHistoryEntry>> {
    Ok(self.lock()?.registry.history(&fingerprint).to_vec())
  }

  async fn history_count(&self, fingerprint: Fingerprint) -> Result<u64> {
    Ok(self.lock()?.registry.history_count(&fingerprint) as u64)
  }

  async fn verification(&self, fingerprint: Fingerprint) -> Result<Verification> {
    let state = self.lock()?;
    Ok(Verification::new(
      state.registry.record(&fingerprint).cloned(),
      state.registry.history(&fingerprint).to_vec(),
    ))
  }

  async fn notifications_since(&self, after: u64, limit: usize) -> Result<Vec<Receipt>> {
    let state = self.lock()?;
    Ok(
      state
        .log
        .iter()
        .filter(|r| r.sequence > after)
        .take(limit)
        .cloned()
        .collect(),
    )
  }

  fn subscribe(&self) -> broadcast::Receiver<Receipt> { self.events.subscribe() }

  fn policy(&self) -> &dyn AuthorizationPolicy { self.policy.as_ref() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::authority::SingleAuthority;

  fn ledger() -> MemoryLedger { MemoryLedger::new(SingleAuthority::new("admin")) }

  fn issue(name: &str) -> Transition {
    Transition::Issue {
      fingerprint: Fingerprint::of_document(name.as_bytes()),
      label:       name.to_string(),
    }
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn broadcast_follows_commit_order() {
    let l = ledger();
    let mut rx = l.subscribe();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..32 {
      let l = l.clone();
      tasks.spawn(async move { l.submit(Identity::new("admin"), issue(&format!("doc-{i}"))).await });
    }
    while let Some(res) = tasks.join_next().await {
      res.unwrap().unwrap();
    }

    for expected in 1..=32 {
      assert_eq!(rx.recv().await.unwrap().sequence, expected);
    }
  }

  #[tokio::test]
  async fn verification_of_unknown_fingerprint_is_empty() {
    let v = ledger()
      .verification(Fingerprint::of_document(b"never"))
      .await
      .unwrap();
    assert!(!v.record.exists);
    assert!(!v.valid);
    assert!(v.history.is_empty());
  }
}
