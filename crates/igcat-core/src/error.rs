//! Error types for `igcat-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("artifact not found for canonical {canonical:?} (version {version:?})")]
  ArtifactNotFound {
    canonical: String,
    version:   Option<String>,
  },

  #[error("package not found for ig={ig}, ig_version={ig_version}")]
  PackageNotFound { ig: String, ig_version: String },

  /// Only one of `ig` and `ig_version` was given.
  #[error("package scope needs both ig and ig_version")]
  IncompleteScope,

  /// The artifact resolved but the query produced no rows.
  #[error("{0}")]
  NoMatches(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Box a backend error. Used by code that is generic over
  /// [`CatalogStore`](crate::store::CatalogStore).
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// `true` for the terminal "nothing matched this request" family.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::ArtifactNotFound { .. } | Self::PackageNotFound { .. } | Self::NoMatches(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
