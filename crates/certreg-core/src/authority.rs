//! Authorization policy for mutating operations.

use crate::certificate::Identity;

/// Decides whether a caller may mutate the registry.
pub trait AuthorizationPolicy: Send + Sync {
  fn permits(&self, caller: &Identity) -> bool;

  /// The identity this policy grants authority to, if it names exactly one.
  fn authority(&self) -> Option<&Identity> { None }
}

/// Only one configured identity may mutate the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleAuthority(Identity);

impl SingleAuthority {
  pub fn new(authority: impl Into<Identity>) -> Self { Self(authority.into()) }
}

impl AuthorizationPolicy for SingleAuthority {
  fn permits(&self, caller: &Identity) -> bool { *caller == self.0 }

  fn authority(&self) -> Option<&Identity> { Some(&self.0) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn single_authority_permits_only_its_identity() {
    let policy = SingleAuthority::new("admin");
    assert!(policy.permits(&Identity::new("admin")));
    assert!(!policy.permits(&Identity::new("Admin")));
    assert!(!policy.permits(&Identity::new("")));
    assert_eq!(policy.authority(), Some(&Identity::new("admin")));
  }
}
