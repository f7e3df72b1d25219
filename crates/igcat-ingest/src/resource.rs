//! Resolution that also returns the stored resource body.

use std::path::Path;

use igcat_core::{artifact::Artifact, resolve::resolve, store::CatalogStore};
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result, source::load_document};

/// Artifact metadata plus the JSON document it was imported from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedResource {
  #[serde(flatten)]
  pub artifact: Artifact,
  pub resource: Value,
}

/// Resolve `canonical` and re-read the file recorded for the winning
/// artifact.
pub async fn resolve_resource<S: CatalogStore>(
  store: &S,
  canonical: &str,
  version: Option<&str>,
) -> Result<ResolvedResource> {
  let artifact = resolve(store, canonical, version).await?;
  let path = Path::new(&artifact.file_path);
  let doc = load_document(path)
    .await
    .map_err(|reason| Error::Resource { path: path.to_owned(), reason })?;

  Ok(ResolvedResource { artifact, resource: doc.json })
}
