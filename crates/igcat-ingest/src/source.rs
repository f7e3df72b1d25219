//! Reading source documents from an IG package directory.
//!
//! A document that cannot be used is reported as a [`SkipReason`], never as
//! an error: one bad file must not stop an import.

use std::{
  fmt,
  path::{Path, PathBuf},
};

use igcat_core::{STRUCTURE_DEFINITION, artifact::NewArtifact, fingerprint::fingerprint};
use serde_json::Value;

use crate::{Error, Result};

/// Why a document was left out of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
  Unreadable(String),
  MalformedJson(String),
  /// Carries the document's `resourceType`, if it had one.
  WrongResourceType(Option<String>),
  MissingCanonical,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Unreadable(e) => write!(f, "unreadable: {e}"),
      Self::MalformedJson(e) => write!(f, "malformed JSON: {e}"),
      Self::WrongResourceType(Some(t)) => write!(f, "resourceType is {t}"),
      Self::WrongResourceType(None) => f.write_str("no resourceType"),
      Self::MissingCanonical => f.write_str("no canonical url"),
    }
  }
}

/// One parsed document and the fingerprint of its raw bytes.
#[derive(Debug, Clone)]
pub struct SourceDocument {
  pub path:   PathBuf,
  pub sha256: String,
  pub json:   Value,
}

impl SourceDocument {
  pub fn resource_type(&self) -> Option<&str> {
    self.json.get("resourceType").and_then(Value::as_str)
  }

  pub fn is_structure_definition(&self) -> bool {
    self.resource_type() == Some(STRUCTURE_DEFINITION)
  }

  /// Artifact metadata for a StructureDefinition with a canonical URL.
  pub fn to_artifact(&self) -> Result<NewArtifact, SkipReason> {
    if !self.is_structure_definition() {
      return Err(SkipReason::WrongResourceType(self.resource_type().map(str::to_owned)));
    }
    let field = |key: &str| self.json.get(key).and_then(Value::as_str).map(str::to_owned);
    let canonical_url = field("url")
      .filter(|u| !u.is_empty())
      .ok_or(SkipReason::MissingCanonical)?;

    Ok(NewArtifact {
      resource_type: STRUCTURE_DEFINITION.to_owned(),
      canonical_url,
      version: field("version"),
      name: field("name"),
      title: field("title"),
      sd_type: field("type"),
      base_definition: field("baseDefinition"),
      file_path: self.path.to_string_lossy().into_owned(),
      sha256: self.sha256.clone(),
    })
  }
}

/// The `*.json` files directly inside `dir`, sorted by file name.
pub async fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
  let source_err = |source| Error::SourceDir { path: dir.to_owned(), source };

  let mut entries = tokio::fs::read_dir(dir).await.map_err(source_err)?;
  let mut files = Vec::new();
  while let Some(entry) = entries.next_entry().await.map_err(source_err)? {
    let path = entry.path();
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    if is_json && entry.file_type().await.map_err(source_err)?.is_file() {
      files.push(path);
    }
  }

  files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
  Ok(files)
}

/// Read, fingerprint and parse one document.
pub async fn load_document(path: &Path) -> Result<SourceDocument, SkipReason> {
  let bytes = tokio::fs::read(path)
    .await
    .map_err(|e| SkipReason::Unreadable(e.to_string()))?;
  let json = serde_json::from_slice(&bytes).map_err(|e| SkipReason::MalformedJson(e.to_string()))?;

  Ok(SourceDocument { path: path.to_owned(), sha256: fingerprint(&bytes), json })
}
