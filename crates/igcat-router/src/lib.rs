//! Natural-language query router for the IG catalog.
//!
//! A question goes through slot extraction, classification (deterministic,
//! or assisted with a deterministic fallback), plan construction and plan
//! execution. The response records every step so a caller can audit how the
//! answer was produced. No state is kept between requests.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod assist;
pub mod classify;
pub mod config;
pub mod error;
pub mod execute;
pub mod intent;
pub mod plan;
pub mod slots;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use assist::{InferenceClient, OllamaClient};
pub use config::RouterConfig;
pub use error::{AssistError, Error, Result, ToolError};
pub use execute::{CallRecord, HttpExecutor, StoreExecutor, ToolExecutor};
pub use intent::{Intent, Mode};
pub use plan::{PlannedCall, Tool};
pub use slots::Slots;

/// A question as submitted by a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskRequest {
  pub question: String,
  #[serde(default)]
  pub mode:     Mode,
  #[serde(default)]
  pub hints:    Slots,
}

/// Full provenance of one routed question.
#[derive(Debug, Clone, Serialize)]
pub struct RouterResponse {
  pub request_id:      Uuid,
  pub question:        String,
  pub mode_requested:  Mode,
  pub mode_used:       Mode,
  pub fallback_used:   bool,
  pub fallback_reason: Option<String>,
  /// Reported by the inference endpoint; `None` for deterministic routing.
  pub confidence:      Option<f64>,
  pub slots:           Slots,
  pub intent:          Intent,
  pub plan:            Vec<PlannedCall>,
  pub results:         Vec<CallRecord>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub struct QueryRouter<C, E> {
  config:    RouterConfig,
  inference: Option<C>,
  executor:  E,
}

impl<E: ToolExecutor> QueryRouter<OllamaClient, E> {
  /// Build a router whose inference client comes from `config`.
  pub fn from_config(config: RouterConfig, executor: E) -> Result<Self> {
    let inference = config.inference.as_ref().map(OllamaClient::new).transpose()?;
    Ok(Self::new(config, inference, executor))
  }
}

impl<C: InferenceClient, E: ToolExecutor> QueryRouter<C, E> {
  pub fn new(config: RouterConfig, inference: Option<C>, executor: E) -> Self {
    Self { config, inference, executor }
  }

  pub async fn route(&self, request: AskRequest) -> RouterResponse {
    let AskRequest { question, mode, hints } = request;
    let mut slots = slots::extract_slots(&question, &hints);

    let mut mode_used = Mode::Deterministic;
    let mut fallback_reason = None;
    let mut confidence = None;

    let assessed = match mode {
      Mode::Deterministic => None,
      Mode::Llm => match self.assist(&question, &slots).await {
        Ok(a) => Some(a),
        Err(e) => {
          tracing::warn!(error = %e, "assisted classification rejected; falling back");
          fallback_reason = Some(e.to_string());
          None
        }
      },
    };

    let intent = match assessed {
      Some(a) => {
        mode_used = Mode::Llm;
        confidence = Some(a.confidence);
        slots.fill_from(a.slots);
        a.intent
      }
      None => classify::classify(&question, &slots),
    };

    let plan = plan::build_plan(intent, &slots, self.config.default_scope.as_ref());
    tracing::debug!(%intent, %mode_used, calls = plan.len(), "plan built");
    let results = execute::run_plan(&self.executor, &plan).await;

    RouterResponse {
      request_id: Uuid::new_v4(),
      question,
      mode_requested: mode,
      mode_used,
      fallback_used: fallback_reason.is_some(),
      fallback_reason,
      confidence,
      slots,
      intent,
      plan,
      results,
    }
  }

  async fn assist(&self, question: &str, slots: &Slots) -> Result<assist::Assessment, AssistError> {
    let client = self.inference.as_ref().ok_or(AssistError::NotConfigured)?;
    assist::assess(client, question, slots).await
  }
}

#[cfg(test)]
mod tests;
