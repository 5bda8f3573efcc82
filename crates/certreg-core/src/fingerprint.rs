//! Content fingerprints: the registry's primary key.
//!
//! A fingerprint is a 32-byte content hash computed outside the registry.
//! The registry trusts it as an opaque identifier and never sees the
//! document it was derived from.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use sha3::{Digest, Keccak256};

use crate::{Error, Result};

/// Number of bytes in a [`Fingerprint`].
pub const FINGERPRINT_LEN: usize = 32;

/// A fixed-length document fingerprint.
///
/// The all-zero value is reserved as "no fingerprint" and is rejected by
/// every mutating operation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
  /// The reserved "no fingerprint" value.
  pub const ZERO: Self = Self([0; FINGERPRINT_LEN]);

  /// Keccak-256 over the full document contents, the hash wallets and
  /// the issuing front end compute client-side.
  pub fn of_document(contents: &[u8]) -> Self {
    Self(Keccak256::digest(contents).into())
  }

  pub fn is_zero(&self) -> bool { self.0 == [0; FINGERPRINT_LEN] }

  /// Lowercase hex without the `0x` prefix.
  pub fn to_hex(&self) -> String { hex::encode(self.0) }

  /// Abbreviated form for log lines, e.g. `0xabcdef12...a1b2c3`.
  pub fn short(&self) -> String {
    let hex = self.to_hex();
    format!("0x{}...{}", &hex[..8], &hex[hex.len() - 6..])
  }
}

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "0x{}", self.to_hex())
  }
}

impl fmt::Debug for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Fingerprint({self})")
  }
}

impl FromStr for Fingerprint {
  type Err = Error;

  /// Accepts 64 hex digits, with or without a leading `0x`.
  fn from_str(s: &str) -> Result<Self> {
    let digits = s
      .strip_prefix("0x")
      .or_else(|| s.strip_prefix("0X"))
      .unwrap_or(s);

    if digits.len() != FINGERPRINT_LEN * 2 {
      return Err(Error::MalformedFingerprint(s.to_owned()));
    }

    let mut bytes = [0u8; FINGERPRINT_LEN];
    hex::decode_to_slice(digits, &mut bytes)
      .map_err(|_| Error::MalformedFingerprint(s.to_owned()))?;
    Ok(Self(bytes))
  }
}

impl Serialize for Fingerprint {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Fingerprint {
  fn deserialize<D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(de::Error::custom)
  }
}
