//! Request extractors whose rejections use the API's JSON error shape.

use axum::{
  extract::{FromRequest, FromRequestParts, Path, Query},
  http::request::Parts,
};
use certreg_core::Fingerprint;

use crate::error::ApiError;

/// `axum::Json` with [`ApiError`] as its rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Query` with [`ApiError`] as its rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// The `{fingerprint}` path segment, parsed.
///
/// Text that is not `0x` plus 64 hex digits rejects with
/// `malformed_fingerprint`.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintPath(pub Fingerprint);

impl<S: Send + Sync> FromRequestParts<S> for FingerprintPath {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &S,
  ) -> Result<Self, Self::Rejection> {
    let Path(raw) = Path::<String>::from_request_parts(parts, state).await?;
    Ok(Self(raw.parse()?))
  }
}
