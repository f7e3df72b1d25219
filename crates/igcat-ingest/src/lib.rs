//! Ingestion pipelines for the IG catalog.
//!
//! [`import_structure_definitions`] records which profiles a package
//! contains; [`load_facts`] re-reads those profiles and indexes their
//! elements, bindings and constraints. Both are idempotent: re-running them
//! over unchanged files changes nothing.

mod facts;
mod import;
mod resource;

pub mod error;
pub mod source;

pub use error::{Error, Result};
pub use facts::{FactLoadSummary, KindSummary, load_facts};
pub use import::{ImportSummary, import_structure_definitions};
pub use resource::{ResolvedResource, resolve_resource};
