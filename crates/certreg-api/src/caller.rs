//! The [`Caller`] extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use certreg_core::Identity;

use crate::error::ApiError;

/// The authenticated identity behind a request.
///
/// Extracted from the request extensions; rejects with `401` when no
/// upstream layer attached an [`Identity`].
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Identity>()
      .cloned()
      .map(Caller)
      .ok_or(ApiError::Unauthenticated)
  }
}
