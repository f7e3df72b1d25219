//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<igcat_core::Error> for ApiError {
  fn from(e: igcat_core::Error) -> Self {
    if matches!(e, igcat_core::Error::IncompleteScope) {
      Self::BadRequest(e.to_string())
    } else if e.is_not_found() {
      Self::NotFound(e.to_string())
    } else {
      Self::Internal(Box::new(e))
    }
  }
}

impl From<igcat_ingest::Error> for ApiError {
  fn from(e: igcat_ingest::Error) -> Self {
    if e.is_not_found() {
      Self::NotFound(e.to_string())
    } else {
      Self::Internal(Box::new(e))
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
