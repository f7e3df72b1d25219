//! Artifact import: one directory of documents into one package.

use std::{collections::HashMap, path::Path};

use igcat_core::{
  artifact::{NewArtifact, PackageScope},
  store::CatalogStore,
};
use serde::Serialize;

use crate::{
  Result,
  source::{list_json_files, load_document},
};

/// Counts reported by [`import_structure_definitions`].
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
  pub ig:                    String,
  pub ig_version:            String,
  pub package_id:            i64,
  /// `*.json` files found in the directory.
  pub scanned:               usize,
  pub structure_definitions: usize,
  pub inserted:              usize,
  pub updated:               usize,
  /// Unchanged artifacts plus documents that could not be used.
  pub skipped:               usize,
  /// Documents replaced by a later file with the same canonical URL and
  /// version.
  pub collapsed:             usize,
}

/// Import every StructureDefinition in `dir` into package
/// `(ig, ig_version)`, creating the package if needed.
///
/// All artifact changes of one call commit together.
pub async fn import_structure_definitions<S: CatalogStore>(
  store: &S,
  ig: &str,
  ig_version: &str,
  dir: &Path,
) -> Result<ImportSummary> {
  let dir = tokio::fs::canonicalize(dir)
    .await
    .map_err(|source| crate::Error::SourceDir { path: dir.to_owned(), source })?;
  let files = list_json_files(&dir).await?;

  let mut batch: Vec<NewArtifact> = Vec::with_capacity(files.len());
  let mut positions: HashMap<(String, String), usize> = HashMap::new();
  let mut structure_definitions = 0;
  let mut rejected = 0;
  let mut collapsed = 0;

  for path in &files {
    let doc = match load_document(path).await {
      Ok(doc) => doc,
      Err(reason) => {
        tracing::warn!(path = %path.display(), %reason, "skipping document");
        rejected += 1;
        continue;
      }
    };
    if doc.is_structure_definition() {
      structure_definitions += 1;
    }
    match doc.to_artifact() {
      Ok(artifact) => {
        tracing::debug!(
          path = %path.display(),
          canonical = %artifact.canonical_url,
          version = ?artifact.version,
          "queued artifact"
        );
        // One row per natural key; the last file in name order wins.
        let key = (artifact.canonical_url.clone(), artifact.version.clone().unwrap_or_default());
        match positions.get(&key) {
          Some(&i) => {
            tracing::warn!(
              path = %path.display(),
              replaced = %batch[i].file_path,
              canonical = %artifact.canonical_url,
              version = ?artifact.version,
              "duplicate canonical and version; later file wins"
            );
            batch[i] = artifact;
            collapsed += 1;
          }
          None => {
            positions.insert(key, batch.len());
            batch.push(artifact);
          }
        }
      }
      Err(reason) => {
        tracing::warn!(path = %path.display(), %reason, "skipping document");
        rejected += 1;
      }
    }
  }

  let scope = PackageScope {
    ig:          ig.to_owned(),
    ig_version:  ig_version.to_owned(),
    source_path: dir.to_string_lossy().into_owned(),
  };
  let outcome = store
    .import_artifacts(scope, batch)
    .await
    .map_err(igcat_core::Error::store)?;

  let summary = ImportSummary {
    ig: ig.to_owned(),
    ig_version: ig_version.to_owned(),
    package_id: outcome.package.id,
    scanned: files.len(),
    structure_definitions,
    inserted: outcome.inserted,
    updated: outcome.updated,
    skipped: outcome.unchanged + rejected,
    collapsed,
  };
  tracing::info!(
    ig,
    ig_version,
    scanned = summary.scanned,
    inserted = summary.inserted,
    updated = summary.updated,
    skipped = summary.skipped,
    collapsed = summary.collapsed,
    "import finished"
  );
  Ok(summary)
}
