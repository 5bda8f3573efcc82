//! Certificate registry domain: fingerprints, records, the transition
//! function, the [`Ledger`] seam, and the [`RegistryEngine`] built on it.
//!
//! Nothing here knows about HTTP or SQL. [`MemoryLedger`] is the reference
//! ledger; durable ones live in their own crates.

// Ledger implementations write `async fn`; the trait spells out `Send`.
#![allow(async_fn_in_trait)]

pub mod authority;
pub mod certificate;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod ledger;
pub mod memory;
pub mod registry;

pub use authority::{AuthorizationPolicy, SingleAuthority};
pub use certificate::{
  CertificateRecord, Identity, Notification, Receipt, Status,
  StatusHistoryEntry, Verification,
};
pub use engine::RegistryEngine;
pub use error::{Error, ErrorKind, Result};
pub use fingerprint::Fingerprint;
pub use ledger::Ledger;
pub use memory::MemoryLedger;
