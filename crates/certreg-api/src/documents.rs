//! Handler for `POST /fingerprint`.
//!
//! Computes the fingerprint of an uploaded document so clients without a
//! local hasher can issue or verify it. The document is not stored.

use axum::{Json, body::Bytes};
use certreg_core::Fingerprint;
use serde::Serialize;

/// Largest document accepted by `POST /fingerprint`.
pub const MAX_DOCUMENT_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct DocumentFingerprint {
  pub fingerprint: Fingerprint,
  pub size:        usize,
}

/// `POST /fingerprint`; the body is the raw document.
pub async fn fingerprint(body: Bytes) -> Json<DocumentFingerprint> {
  Json(DocumentFingerprint {
    fingerprint: Fingerprint::of_document(&body),
    size:        body.len(),
  })
}
