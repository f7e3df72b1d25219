//! Canonical URL → artifact resolution.
//!
//! Version strings are not guaranteed to be semver-sortable, so the ranking
//! compares them as plain strings and falls back to recency and then to
//! insertion identity. The result is a pure function of stored rows.

use std::cmp::Ordering;

use crate::{Error, Result, artifact::Artifact, store::CatalogStore};

/// Best-first ordering of artifacts sharing one canonical URL:
///
/// 1. versioned before version-absent;
/// 2. version string, lexicographically descending;
/// 3. `indexed_at`, most recent first;
/// 4. `id`, highest first.
pub fn compare(a: &Artifact, b: &Artifact) -> Ordering {
  let by_version = match (a.version.as_deref(), b.version.as_deref()) {
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (Some(va), Some(vb)) => vb.cmp(va),
    (None, None) => Ordering::Equal,
  };
  by_version
    .then_with(|| b.indexed_at.cmp(&a.indexed_at))
    .then_with(|| b.id.cmp(&a.id))
}

/// Sort `candidates` best-first in place.
pub fn rank(candidates: &mut [Artifact]) { candidates.sort_by(compare); }

/// Choose the authoritative artifact among `candidates`.
///
/// With an explicit `version`, only exact matches qualify; there is no
/// "closest version" fallback.
pub fn pick(candidates: Vec<Artifact>, version: Option<&str>) -> Option<Artifact> {
  let mut eligible: Vec<Artifact> = match version {
    Some(v) => candidates
      .into_iter()
      .filter(|a| a.version.as_deref() == Some(v))
      .collect(),
    None => candidates,
  };
  rank(&mut eligible);
  eligible.into_iter().next()
}

/// Resolve `canonical` (and optionally `version`) against `store`.
pub async fn resolve<S: CatalogStore>(
  store: &S,
  canonical: &str,
  version: Option<&str>,
) -> Result<Artifact> {
  let candidates = store
    .artifacts_by_canonical(canonical)
    .await
    .map_err(Error::store)?;

  pick(candidates, version).ok_or_else(|| Error::ArtifactNotFound {
    canonical: canonical.to_owned(),
    version:   version.map(str::to_owned),
  })
}
