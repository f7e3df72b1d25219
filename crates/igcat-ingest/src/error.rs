//! Error type for `igcat-ingest`.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::SkipReason;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot scan source directory {path}: {source}")]
  SourceDir {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("cannot read stored resource {path}: {reason}")]
  Resource { path: PathBuf, reason: SkipReason },

  #[error(transparent)]
  Catalog(#[from] igcat_core::Error),
}

impl Error {
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Catalog(e) if e.is_not_found())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
