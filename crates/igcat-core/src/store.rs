//! The `CatalogStore` trait.
//!
//! Implemented by storage backends (e.g. `igcat-store-sqlite`). The ingestion
//! pipeline, the structured queries and the HTTP layer depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  artifact::{Artifact, ArtifactImport, NewArtifact, Package, PackageScope},
  fact::{
    BindingFact, BindingUsage, ConstraintFact, ElementFact, FactBatch, FactKind, UpsertCounts,
  },
};

/// Abstraction over a catalog backend.
///
/// Writes are keyed by natural key: `(ig, ig_version)` for packages,
/// `(package, canonical, version)` for artifacts, and the per-kind keys
/// documented in [`crate::fact`] for facts. Batch writes are atomic: either
/// the whole batch commits or none of it does.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Packages ──────────────────────────────────────────────────────────

  fn find_package<'a>(
    &'a self,
    ig: &'a str,
    ig_version: &'a str,
  ) -> impl Future<Output = Result<Option<Package>, Self::Error>> + Send + 'a;

  fn get_package(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Package>, Self::Error>> + Send + '_;

  fn list_packages(&self) -> impl Future<Output = Result<Vec<Package>, Self::Error>> + Send + '_;

  /// Delete a package together with its artifacts and their facts.
  /// Returns `false` if no such package existed.
  fn delete_package(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Artifacts ─────────────────────────────────────────────────────────

  /// Get-or-create the package for `scope`, then reconcile every artifact in
  /// `batch` against it in a single transaction.
  ///
  /// An artifact matches only on the exact `(canonical, version)` pair, an
  /// absent version matching only an absent version. A match with the same
  /// fingerprint is left alone; a match with a different fingerprint has its
  /// metadata, fingerprint and `indexed_at` overwritten.
  fn import_artifacts(
    &self,
    scope: PackageScope,
    batch: Vec<NewArtifact>,
  ) -> impl Future<Output = Result<ArtifactImport, Self::Error>> + Send + '_;

  /// Artifacts of one package with the given resource type, ordered by id.
  fn list_artifacts<'a>(
    &'a self,
    package_id: i64,
    resource_type: &'a str,
  ) -> impl Future<Output = Result<Vec<Artifact>, Self::Error>> + Send + 'a;

  /// Every artifact, across packages, sharing `canonical`. Unordered; see
  /// [`crate::resolve`] for ranking.
  fn artifacts_by_canonical<'a>(
    &'a self,
    canonical: &'a str,
  ) -> impl Future<Output = Result<Vec<Artifact>, Self::Error>> + Send + 'a;

  // ── Facts — writes ────────────────────────────────────────────────────

  /// Delete all facts of `kind` belonging to `artifact_ids`. Commits on its
  /// own, before any reload. Returns the number of rows removed.
  fn truncate_facts(
    &self,
    kind: FactKind,
    artifact_ids: Vec<i64>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Insert or update-in-place on `(artifact, path)`.
  fn upsert_elements(
    &self,
    batch: Vec<FactBatch<ElementFact>>,
  ) -> impl Future<Output = Result<UpsertCounts, Self::Error>> + Send + '_;

  /// Insert or update-in-place on `(artifact, path, value_set)`.
  fn upsert_bindings(
    &self,
    batch: Vec<FactBatch<BindingFact>>,
  ) -> impl Future<Output = Result<UpsertCounts, Self::Error>> + Send + '_;

  /// Insert or update-in-place on `(artifact, path, key)`.
  fn upsert_constraints(
    &self,
    batch: Vec<FactBatch<ConstraintFact>>,
  ) -> impl Future<Output = Result<UpsertCounts, Self::Error>> + Send + '_;

  // ── Facts — reads ─────────────────────────────────────────────────────

  /// Element facts of an artifact ordered by path, optionally restricted to
  /// one path and/or to `mustSupport = true`.
  fn element_facts<'a>(
    &'a self,
    artifact_id: i64,
    path: Option<&'a str>,
    must_support_only: bool,
  ) -> impl Future<Output = Result<Vec<ElementFact>, Self::Error>> + Send + 'a;

  /// Binding facts of an artifact ordered by `(path, value_set)`.
  fn binding_facts<'a>(
    &'a self,
    artifact_id: i64,
    path: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<BindingFact>, Self::Error>> + Send + 'a;

  /// Constraint facts of an artifact ordered by `(path, key)`.
  fn constraint_facts<'a>(
    &'a self,
    artifact_id: i64,
    path: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<ConstraintFact>, Self::Error>> + Send + 'a;

  /// Bindings that reference `value_set`, joined with their artifact,
  /// optionally restricted to one package. Ordered by
  /// `(sd_type, canonical_url, path)`.
  fn binding_usages<'a>(
    &'a self,
    value_set: &'a str,
    package_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<BindingUsage>, Self::Error>> + Send + 'a;
}
