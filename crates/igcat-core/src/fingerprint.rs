//! Change detection over raw document bytes.
//!
//! The fingerprint is a SHA-256 over the file bytes, not the parsed JSON, so
//! a whitespace-only edit still triggers reprocessing. A change is never
//! missed; some reprocessing is spurious.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  hex::encode(hasher.finalize())
}

/// What to do with an incoming document given the stored fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  /// No row matched the natural key.
  Insert,
  Update,
  Skip,
}

pub fn decide(existing: Option<&str>, new: &str) -> Decision {
  match existing {
    None => Decision::Insert,
    Some(old) if old == new => Decision::Skip,
    Some(_) => Decision::Update,
  }
}
