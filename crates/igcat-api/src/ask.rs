//! Handler for `POST /ask`.
//!
//! Body: `{"question": "...", "mode": "deterministic"|"llm", "hints": {...}}`.
//! `mode` and `hints` are optional.

use std::sync::Arc;

use axum::{Json, extract::State};
use igcat_router::{AskRequest, InferenceClient, QueryRouter, RouterResponse, ToolExecutor};

use crate::error::ApiError;

/// `POST /ask`
pub async fn handler<C, E>(
  State(router): State<Arc<QueryRouter<C, E>>>,
  Json(request): Json<AskRequest>,
) -> Result<Json<RouterResponse>, ApiError>
where
  C: InferenceClient,
  E: ToolExecutor,
{
  if request.question.trim().is_empty() {
    return Err(ApiError::BadRequest("question must not be empty".into()));
  }
  Ok(Json(router.route(request).await))
}
