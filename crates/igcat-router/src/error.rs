//! Error types for `igcat-router`.
//!
//! Neither [`AssistError`] nor [`ToolError`] ever escapes
//! [`QueryRouter::route`](crate::QueryRouter::route): the first becomes a
//! fallback reason, the second a per-call error record.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot build HTTP client: {0}")]
  Client(#[from] reqwest::Error),
}

/// Why an assisted classification was rejected.
#[derive(Debug, Error)]
pub enum AssistError {
  #[error("no inference endpoint configured")]
  NotConfigured,

  #[error("inference request timed out")]
  Timeout,

  #[error("inference request failed: {0}")]
  Transport(#[source] reqwest::Error),

  #[error("inference endpoint returned HTTP {0}")]
  Status(u16),

  #[error("inference reply carried no text payload")]
  EmptyReply,

  #[error("payload is not JSON: {0}")]
  NotJson(#[source] serde_json::Error),

  #[error("payload is not a JSON object")]
  NotObject,

  #[error("intent {0:?} is not in the closed intent set")]
  InvalidIntent(Option<String>),

  #[error("confidence missing or outside [0, 1]")]
  InvalidConfidence,
}

impl From<reqwest::Error> for AssistError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() { Self::Timeout } else { Self::Transport(e) }
  }
}

/// Failure of one planned call.
#[derive(Debug, Error)]
pub enum ToolError {
  #[error("missing argument {0:?}")]
  MissingArgument(&'static str),

  #[error(transparent)]
  Query(#[from] igcat_core::Error),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("HTTP {status}: {detail}")]
  Status { status: u16, detail: Value },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
