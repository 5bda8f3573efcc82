//! [`SqliteLedger`]: the SQLite implementation of [`Ledger`].

use std::{path::Path, sync::Arc};

use certreg_core::{
  AuthorizationPolicy, CertificateRecord, Fingerprint, Identity, Receipt,
  StatusHistoryEntry, Verification,
  ledger::{Ledger, SUBSCRIBER_CAPACITY},
  registry::{self, Transition, TransitionContext},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawHistoryEntry, RawReceipt, RawRecord, encode_dt, encode_fingerprint,
    encode_status,
  },
  schema::SCHEMA,
};

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// A registry ledger backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted, and clones
/// share one subscriber channel.
#[derive(Clone)]
pub struct SqliteLedger {
  conn:   tokio_rusqlite::Connection,
  policy: Arc<dyn AuthorizationPolicy>,
  events: broadcast::Sender<Receipt>,
}

impl SqliteLedger {
  /// Open (or create) a ledger at `path` and run schema initialisation.
  /// `policy` decides who may submit transitions.
  pub async fn open(
    path: impl AsRef<Path>,
    policy: impl AuthorizationPolicy + 'static,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, policy).await
  }

  /// Open an in-memory ledger, for tests.
  pub async fn open_in_memory(
    policy: impl AuthorizationPolicy + 'static,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, policy).await
  }

  async fn init(
    conn: tokio_rusqlite::Connection,
    policy: impl AuthorizationPolicy + 'static,
  ) -> Result<Self> {
    let (events, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
    let ledger = Self {
      conn,
      policy: Arc::new(policy),
      events,
    };
    ledger
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(ledger)
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }
}

fn select_record(
  conn: &rusqlite::Connection,
  fp_str: &str,
) -> rusqlite::Result<Option<RawRecord>> {
  conn
    .query_row(
      "SELECT fingerprint, label, issued_at, issuer, status
       FROM records WHERE fingerprint = ?1",
      rusqlite::params![fp_str],
      RawRecord::from_row,
    )
    .optional()
}

fn select_history(
  conn: &rusqlite::Connection,
  fp_str: &str,
) -> rusqlite::Result<Vec<RawHistoryEntry>> {
  let mut stmt = conn.prepare(
    "SELECT status, changed_at, changed_by, reason
     FROM status_history
     WHERE fingerprint = ?1
     ORDER BY position ASC",
  )?;
  stmt
    .query_map(rusqlite::params![fp_str], RawHistoryEntry::from_row)?
    .collect()
}

/// Apply one transition inside a single SQLite transaction.
///
/// Any error returned before `commit` drops the transaction, which rolls
/// back every write made so far.
fn commit_transition(
  conn: &mut rusqlite::Connection,
  caller: &Identity,
  transition: &Transition,
  policy: &dyn AuthorizationPolicy,
) -> Result<Receipt> {
  let tx = conn.transaction()?;

  let fingerprint = transition.fingerprint();
  let fp_str = encode_fingerprint(&fingerprint);

  let current = select_record(&tx, &fp_str)?
    .map(RawRecord::into_record)
    .transpose()?;

  let now = Utc::now();
  let ctx = TransitionContext { caller, now, policy };
  let effect = registry::apply(current.as_ref(), transition, &ctx)?;

  let status_str = encode_status(effect.record.status);
  if current.is_none() {
    tx.execute(
      "INSERT INTO records (fingerprint, label, issued_at, issuer, status)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      rusqlite::params![
        fp_str,
        effect.record.label,
        encode_dt(effect.record.issued_at),
        effect.record.issuer.as_str(),
        status_str,
      ],
    )?;
  } else {
    tx.execute(
      "UPDATE records SET status = ?2 WHERE fingerprint = ?1",
      rusqlite::params![fp_str, status_str],
    )?;
  }

  if let Some(entry) = &effect.appended {
    let position: i64 = tx.query_row(
      "SELECT COUNT(*) FROM status_history WHERE fingerprint = ?1",
      rusqlite::params![fp_str],
      |r| r.get(0),
    )?;
    tx.execute(
      "INSERT INTO status_history
         (fingerprint, position, status, changed_at, changed_by, reason)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      rusqlite::params![
        fp_str,
        position,
        encode_status(entry.status),
        encode_dt(entry.changed_at),
        entry.changed_by.as_str(),
        entry.reason,
      ],
    )?;
  }

  let tx_id = Uuid::new_v4();
  tx.execute(
    "INSERT INTO transactions
       (tx_id, kind, fingerprint, caller, committed_at, notification)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      tx_id.hyphenated().to_string(),
      effect.notification.kind(),
      fp_str,
      caller.as_str(),
      encode_dt(now),
      serde_json::to_string(&effect.notification)?,
    ],
  )?;
  let sequence = tx.last_insert_rowid();

  tx.commit()?;

  Ok(Receipt {
    tx_id,
    sequence: sequence as u64,
    finalized_at: now,
    notification: effect.notification,
  })
}

// ─── Ledger impl ─────────────────────────────────────────────────────────────

impl Ledger for SqliteLedger {
  type Error = Error;

  async fn submit(&self, caller: Identity, transition: Transition) -> Result<Receipt> {
    let policy = Arc::clone(&self.policy);
    let kind = match &transition {
      Transition::Issue { .. } => "issue",
      Transition::ChangeStatus { .. } => "change_status",
    };

    let events = self.events.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let outcome =
          commit_transition(conn, &caller, &transition, policy.as_ref());
        // Broadcast on the connection thread, in commit order, whether or
        // not the submitter is still waiting. No subscribers is not an error.
        if let Ok(receipt) = &outcome {
          let _ = events.send(receipt.clone());
        }
        Ok(outcome)
      })
      .await?;

    match outcome {
      Ok(receipt) => {
        tracing::debug!(
          sequence = receipt.sequence,
          tx_id = %receipt.tx_id,
          event = receipt.notification.kind(),
          "committed transition"
        );
        Ok(receipt)
      }
      Err(e) => {
        tracing::debug!(kind, error = %e, "transition rolled back");
        Err(e)
      }
    }
  }

  async fn record(&self, fingerprint: Fingerprint) -> Result<Option<CertificateRecord>> {
    let fp_str = encode_fingerprint(&fingerprint);

    let raw = self
      .conn
      .call(move |conn| Ok(select_record(conn, &fp_str)?))
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn history(&self, fingerprint: Fingerprint) -> Result<Vec<StatusHistoryEntry>> {
    let fp_str = encode_fingerprint(&fingerprint);

    let raws = self
      .conn
      .call(move |conn| Ok(select_history(conn, &fp_str)?))
      .await?;

    raws.into_iter().map(RawHistoryEntry::into_entry).collect()
  }

  async fn history_count(&self, fingerprint: Fingerprint) -> Result<u64> {
    let fp_str = encode_fingerprint(&fingerprint);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM status_history WHERE fingerprint = ?1",
          rusqlite::params![fp_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(count as u64)
  }

  async fn verification(&self, fingerprint: Fingerprint) -> Result<Verification> {
    let fp_str = encode_fingerprint(&fingerprint);

    let (raw, raws) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = select_record(&tx, &fp_str)?;
        let raws = select_history(&tx, &fp_str)?;
        tx.commit()?;
        Ok((raw, raws))
      })
      .await?;

    let record = raw.map(RawRecord::into_record).transpose()?;
    let history = raws
      .into_iter()
      .map(RawHistoryEntry::into_entry)
      .collect::<Result<Vec<_>>>()?;
    Ok(Verification::new(record, history))
  }

  async fn notifications_since(&self, after: u64, limit: usize) -> Result<Vec<Receipt>> {
    let after_val = i64::try_from(after).unwrap_or(i64::MAX);
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawReceipt> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT sequence, tx_id, committed_at, notification
           FROM transactions
           WHERE sequence > ?1
           ORDER BY sequence ASC
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![after_val, limit_val], RawReceipt::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReceipt::into_receipt).collect()
  }

  fn subscribe(&self) -> broadcast::Receiver<Receipt> { self.events.subscribe() }

  fn policy(&self) -> &dyn AuthorizationPolicy { self.policy.as_ref() }
}
