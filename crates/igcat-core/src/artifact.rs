//! Packages (the unit of import) and the versioned profile artifacts they
//! contain.
//!
//! A package owns its artifacts; deleting a package removes its artifacts and
//! every fact extracted from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Package ─────────────────────────────────────────────────────────────────

/// One imported implementation-guide distribution at one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
  pub id:          i64,
  /// IG code, e.g. `ps-ca`.
  pub ig:          String,
  pub ig_version:  String,
  pub imported_at: DateTime<Utc>,
  /// Directory the most recent import read from.
  pub source_path: String,
}

/// Natural key plus the mutable attributes of a package, as supplied by an
/// import run.
#[derive(Debug, Clone)]
pub struct PackageScope {
  pub ig:          String,
  pub ig_version:  String,
  pub source_path: String,
}

// ─── Artifact ────────────────────────────────────────────────────────────────

/// One versioned profile definition within a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
  /// Insertion identity; the last tie-breaker when ranking versions.
  pub id:              i64,
  pub package_id:      i64,
  pub resource_type:   String,
  pub canonical_url:   String,
  pub version:         Option<String>,
  pub name:            Option<String>,
  pub title:           Option<String>,
  pub sd_type:         Option<String>,
  /// Parent profile. A soft reference: the parent may not be ingested yet.
  pub base_definition: Option<String>,
  pub file_path:       String,
  /// SHA-256 hex digest of the raw file bytes.
  pub sha256:          String,
  pub indexed_at:      DateTime<Utc>,
}

impl Artifact {
  /// The version string used for uniqueness: absent normalises to `""`.
  pub fn version_key(&self) -> &str { self.version.as_deref().unwrap_or("") }
}

/// Input to [`CatalogStore::import_artifacts`](crate::store::CatalogStore::import_artifacts).
/// `id`, `package_id` and `indexed_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArtifact {
  pub resource_type:   String,
  pub canonical_url:   String,
  pub version:         Option<String>,
  pub name:            Option<String>,
  pub title:           Option<String>,
  pub sd_type:         Option<String>,
  pub base_definition: Option<String>,
  pub file_path:       String,
  pub sha256:          String,
}

/// What a batched artifact import did to the store.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactImport {
  pub package:   Package,
  pub inserted:  usize,
  pub updated:   usize,
  /// Artifacts whose stored fingerprint already matched.
  pub unchanged: usize,
}
