//! Core types and trait definitions for the IG catalog.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! holds the domain model, the [`store::CatalogStore`] abstraction, and the
//! pure pieces of the pipeline: fingerprinting, fact extraction, version
//! ranking, and the structured queries built on top of them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod artifact;
pub mod error;
pub mod extract;
pub mod fact;
pub mod fingerprint;
pub mod query;
pub mod resolve;
pub mod settings;
pub mod store;

pub use error::{Error, Result};

/// The only resource type the catalog ingests.
pub const STRUCTURE_DEFINITION: &str = "StructureDefinition";
