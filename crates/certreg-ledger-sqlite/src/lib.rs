//! SQLite-backed ledger for the certificate registry.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. That single connection thread
//! is also what serialises commits into one total order.

mod encode;
mod ledger;
mod schema;

pub mod error;

pub use error::{Error, Result};
pub use ledger::SqliteLedger;
