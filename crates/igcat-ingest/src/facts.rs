//! Fact loading: re-read every artifact of a package and upsert the element,
//! binding and constraint facts derived from it.

use igcat_core::{
  Error as CatalogError, STRUCTURE_DEFINITION,
  artifact::Artifact,
  extract::{ExtractedFacts, KindStats, extract},
  fact::{FactBatch, FactKind, UpsertCounts},
  store::CatalogStore,
};
use serde::Serialize;

use crate::{Result, source::SkipReason};

/// Outcome for one fact kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindSummary {
  pub inserted:  usize,
  pub updated:   usize,
  pub unchanged: usize,
  /// Entries without a path, or invariants without a key.
  pub skipped:   usize,
  /// Entries that repeated an earlier natural key within one artifact.
  pub collapsed: usize,
  /// Rows deleted before reloading; zero unless truncation was requested.
  pub truncated: usize,
}

impl KindSummary {
  fn absorb(&mut self, stats: KindStats) {
    self.skipped += stats.skipped;
    self.collapsed += stats.collapsed;
  }

  fn record(&mut self, counts: UpsertCounts) {
    self.inserted += counts.inserted;
    self.updated += counts.updated;
    self.unchanged += counts.unchanged;
  }
}

/// Counts reported by [`load_facts`]. Kinds that were not requested are
/// omitted.
#[derive(Debug, Clone, Serialize)]
pub struct FactLoadSummary {
  pub ig:                            String,
  pub ig_version:                    String,
  pub package_id:                    i64,
  pub truncate:                      bool,
  pub artifacts_processed:           usize,
  pub artifacts_skipped_no_elements: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub elements:                      Option<KindSummary>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub bindings:                      Option<KindSummary>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub constraints:                   Option<KindSummary>,
}

impl FactLoadSummary {
  pub fn kind(&self, kind: FactKind) -> Option<&KindSummary> {
    match kind {
      FactKind::Elements => self.elements.as_ref(),
      FactKind::Bindings => self.bindings.as_ref(),
      FactKind::Constraints => self.constraints.as_ref(),
    }
  }

  fn kind_mut(&mut self, kind: FactKind) -> Option<&mut KindSummary> {
    match kind {
      FactKind::Elements => self.elements.as_mut(),
      FactKind::Bindings => self.bindings.as_mut(),
      FactKind::Constraints => self.constraints.as_mut(),
    }
  }
}

/// Populate the requested fact kinds for package `(ig, ig_version)`.
///
/// With `truncate`, existing rows of each requested kind are deleted (and
/// committed) before the reload begins, which is the only way to drop facts
/// that vanished from the source documents.
pub async fn load_facts<S: CatalogStore>(
  store: &S,
  ig: &str,
  ig_version: &str,
  kinds: &[FactKind],
  truncate: bool,
) -> Result<FactLoadSummary> {
  let package = store
    .find_package(ig, ig_version)
    .await
    .map_err(CatalogError::store)?
    .ok_or_else(|| CatalogError::PackageNotFound {
      ig:         ig.to_owned(),
      ig_version: ig_version.to_owned(),
    })?;

  let artifacts = store
    .list_artifacts(package.id, STRUCTURE_DEFINITION)
    .await
    .map_err(CatalogError::store)?;

  let wants = |kind| kinds.contains(&kind);
  let mut summary = FactLoadSummary {
    ig: ig.to_owned(),
    ig_version: ig_version.to_owned(),
    package_id: package.id,
    truncate,
    artifacts_processed: 0,
    artifacts_skipped_no_elements: 0,
    elements: wants(FactKind::Elements).then(KindSummary::default),
    bindings: wants(FactKind::Bindings).then(KindSummary::default),
    constraints: wants(FactKind::Constraints).then(KindSummary::default),
  };

  if truncate && !artifacts.is_empty() {
    let ids: Vec<i64> = artifacts.iter().map(|a| a.id).collect();
    for &kind in FactKind::ALL.iter().filter(|k| wants(**k)) {
      let removed = store
        .truncate_facts(kind, ids.clone())
        .await
        .map_err(CatalogError::store)?;
      if let Some(k) = summary.kind_mut(kind) {
        k.truncated = removed;
      }
    }
  }

  let mut elements = Vec::new();
  let mut bindings = Vec::new();
  let mut constraints = Vec::new();

  for artifact in &artifacts {
    summary.artifacts_processed += 1;

    let facts = match read_facts(artifact).await {
      Ok(facts) if !facts.is_empty() => facts,
      Ok(_) => {
        tracing::debug!(artifact = artifact.id, "no element list");
        summary.artifacts_skipped_no_elements += 1;
        continue;
      }
      Err(reason) => {
        tracing::warn!(artifact = artifact.id, path = %artifact.file_path, %reason, "cannot re-read artifact");
        summary.artifacts_skipped_no_elements += 1;
        continue;
      }
    };

    if let Some(k) = summary.elements.as_mut() {
      k.absorb(facts.stats.elements);
      elements.push(FactBatch { artifact_id: artifact.id, facts: facts.elements });
    }
    if let Some(k) = summary.bindings.as_mut() {
      k.absorb(facts.stats.bindings);
      bindings.push(FactBatch { artifact_id: artifact.id, facts: facts.bindings });
    }
    if let Some(k) = summary.constraints.as_mut() {
      k.absorb(facts.stats.constraints);
      constraints.push(FactBatch { artifact_id: artifact.id, facts: facts.constraints });
    }
  }

  if let Some(k) = summary.elements.as_mut() {
    k.record(store.upsert_elements(elements).await.map_err(CatalogError::store)?);
  }
  if let Some(k) = summary.bindings.as_mut() {
    k.record(store.upsert_bindings(bindings).await.map_err(CatalogError::store)?);
  }
  if let Some(k) = summary.constraints.as_mut() {
    k.record(store.upsert_constraints(constraints).await.map_err(CatalogError::store)?);
  }

  tracing::info!(
    ig,
    ig_version,
    processed = summary.artifacts_processed,
    skipped_no_elements = summary.artifacts_skipped_no_elements,
    "fact load finished"
  );
  Ok(summary)
}

async fn read_facts(artifact: &Artifact) -> Result<ExtractedFacts, SkipReason> {
  let bytes = tokio::fs::read(&artifact.file_path)
    .await
    .map_err(|e| SkipReason::Unreadable(e.to_string()))?;
  let doc = serde_json::from_slice(&bytes).map_err(|e| SkipReason::MalformedJson(e.to_string()))?;
  Ok(extract(&doc))
}
