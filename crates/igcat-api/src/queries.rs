//! Handlers for the structured query routes.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/health` | Always `{"status":"ok"}` |
//! | `GET`  | `/gq/must-support` | `?canonical=…[&version=…]` |
//! | `GET`  | `/gq/bindings` | `?canonical=…&path=…[&version=…]` |
//! | `GET`  | `/gq/constraints` | `?canonical=…[&version=…][&path=…]` |
//! | `GET`  | `/gq/value-set/where-used` | `?value_set=…[&ig=…&ig_version=…]` |
//! | `GET`  | `/gq/profile-summary` | `?canonical=…[&version=…][&include_all=true]` |
//! | `GET`  | `/gq/element-details` | `?canonical=…&path=…[&version=…]` |
//! | `GET`  | `/artifacts/resolve` | `?canonical=…[&version=…]`, includes the stored resource |
//!
//! Every route answers 404 when nothing matches.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use igcat_core::{
  query::{
    self, BindingsReport, ConstraintsReport, ElementDetailsReport, MustSupportReport,
    ProfileParams, ProfileSummaryReport, WhereUsedParams, WhereUsedReport,
  },
  store::CatalogStore,
};
use igcat_ingest::ResolvedResource;
use serde_json::{Value, json};

use crate::error::ApiError;

fn required_path(params: &ProfileParams) -> Result<&str, ApiError> {
  params
    .path
    .as_deref()
    .filter(|p| !p.is_empty())
    .ok_or_else(|| ApiError::BadRequest("missing query parameter `path`".into()))
}

/// `GET /health`
pub async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

/// `GET /gq/must-support`
pub async fn must_support<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ProfileParams>,
) -> Result<Json<MustSupportReport>, ApiError> {
  let report =
    query::must_support(store.as_ref(), &params.canonical, params.version.as_deref()).await?;
  Ok(Json(report))
}

/// `GET /gq/bindings`
pub async fn bindings<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ProfileParams>,
) -> Result<Json<BindingsReport>, ApiError> {
  let path = required_path(&params)?;
  let report = query::bindings(
    store.as_ref(),
    &params.canonical,
    path,
    params.version.as_deref(),
  )
  .await?;
  Ok(Json(report))
}

/// `GET /gq/constraints`
pub async fn constraints<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ProfileParams>,
) -> Result<Json<ConstraintsReport>, ApiError> {
  let report = query::constraints(
    store.as_ref(),
    &params.canonical,
    params.version.as_deref(),
    params.path.as_deref(),
  )
  .await?;
  Ok(Json(report))
}

/// `GET /gq/value-set/where-used`
pub async fn where_used<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<WhereUsedParams>,
) -> Result<Json<WhereUsedReport>, ApiError> {
  let report = query::where_used_value_set(
    store.as_ref(),
    &params.value_set,
    params.ig.as_deref(),
    params.ig_version.as_deref(),
  )
  .await?;
  Ok(Json(report))
}

/// `GET /gq/profile-summary`
pub async fn profile_summary<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ProfileParams>,
) -> Result<Json<ProfileSummaryReport>, ApiError> {
  let report = query::profile_summary(
    store.as_ref(),
    &params.canonical,
    params.version.as_deref(),
    params.include_all,
  )
  .await?;
  Ok(Json(report))
}

/// `GET /gq/element-details`
pub async fn element_details<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ProfileParams>,
) -> Result<Json<ElementDetailsReport>, ApiError> {
  let path = required_path(&params)?;
  let report = query::element_details(
    store.as_ref(),
    &params.canonical,
    path,
    params.version.as_deref(),
  )
  .await?;
  Ok(Json(report))
}

/// `GET /artifacts/resolve`
pub async fn resolve<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ProfileParams>,
) -> Result<Json<ResolvedResource>, ApiError> {
  let resolved = igcat_ingest::resolve_resource(
    store.as_ref(),
    &params.canonical,
    params.version.as_deref(),
  )
  .await?;
  Ok(Json(resolved))
}
