//! JSON REST API for the IG catalog.
//!
//! Exposes an axum [`Router`] backed by any
//! [`igcat_core::store::CatalogStore`] for the structured queries, plus the
//! natural-language `/ask` route backed by a [`QueryRouter`]. Auth, TLS and
//! transport concerns are the caller's responsibility.

pub mod ask;
pub mod error;
pub mod queries;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use igcat_core::store::CatalogStore;
use igcat_router::{InferenceClient, QueryRouter, ToolExecutor};

pub use error::ApiError;

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C, E>(store: Arc<S>, router: Arc<QueryRouter<C, E>>) -> Router<()>
where
  S: CatalogStore + 'static,
  C: InferenceClient + 'static,
  E: ToolExecutor + 'static,
{
  let queries = Router::new()
    .route("/health", get(queries::health))
    .route("/gq/must-support", get(queries::must_support::<S>))
    .route("/gq/bindings", get(queries::bindings::<S>))
    .route("/gq/constraints", get(queries::constraints::<S>))
    .route("/gq/value-set/where-used", get(queries::where_used::<S>))
    .route("/gq/profile-summary", get(queries::profile_summary::<S>))
    .route("/gq/element-details", get(queries::element_details::<S>))
    .route("/artifacts/resolve", get(queries::resolve::<S>))
    .with_state(store);

  let ask = Router::new()
    .route("/ask", post(ask::handler::<C, E>))
    .with_state(router);

  queries.merge(ask)
}

#[cfg(test)]
mod tests;
