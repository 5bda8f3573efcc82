//! HTTP Basic authentication that establishes the caller's [`Identity`].
//!
//! Requests without an `Authorization` header pass through anonymously;
//! the API's `Caller` extractor turns that into `401` on mutating routes.
//! A header that is present but does not verify is rejected here.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use certreg_core::Identity;

use crate::{Account, error::Error};

/// Accounts accepted by this server instance.
#[derive(Clone, Default)]
pub struct AuthConfig {
  pub accounts: Vec<Account>,
}

impl AuthConfig {
  fn account(&self, identity: &str) -> Option<&Account> {
    self.accounts.iter().find(|a| a.identity == identity)
  }
}

/// Checked in place of a real hash when the identity is unknown, so a
/// miss costs one argon2 verification like a wrong password does. Uses the
/// `Argon2::default()` parameters; no password matches it.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$fA46OBpE6NQ3QL4lpk6AOA$taJTQTt6ZgWvlP9He0jCPri2DCY9GdZgHxpEg+x0QfY";

/// Verify Basic credentials from `headers`.
///
/// Returns `Ok(None)` when no `Authorization` header is present.
pub fn verify_basic(
  headers: &HeaderMap,
  config: &AuthConfig,
) -> Result<Option<Identity>, Error> {
  let Some(header_val) = headers.get(axum::http::header::AUTHORIZATION) else {
    return Ok(None);
  };
  let header_val = header_val.to_str().map_err(|_| Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (identity, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let account = config.account(identity);
  let hash = account.map_or(DUMMY_HASH, |a| a.password_hash.as_str());

  let parsed_hash = PasswordHash::new(hash).map_err(|_| Error::Unauthorized)?;

  let verified = Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .is_ok();

  match account {
    Some(_) if verified => Ok(Some(Identity::new(identity))),
    _ => Err(Error::Unauthorized),
  }
}

/// Middleware: attach the verified [`Identity`] to the request extensions.
pub async fn authenticate(
  State(config): State<Arc<AuthConfig>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  match verify_basic(req.headers(), &config) {
    Ok(Some(identity)) => {
      tracing::debug!(%identity, "authenticated");
      req.extensions_mut().insert(identity);
    }
    Ok(None) => {}
    Err(e) => {
      tracing::warn!(path = %req.uri().path(), "rejected credentials");
      return Err(e);
    }
  }
  Ok(next.run(req).await)
}
