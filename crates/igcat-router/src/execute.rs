//! Plan execution. Each call succeeds or fails on its own.

use std::{future::Future, sync::Arc, time::Duration};

use igcat_core::{query, store::CatalogStore};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::{
  Result,
  error::ToolError,
  plan::{PlannedCall, Tool},
};

/// Runs one planned call and returns its JSON report.
pub trait ToolExecutor: Send + Sync {
  fn execute<'a>(
    &'a self,
    call: &'a PlannedCall,
  ) -> impl Future<Output = Result<Value, ToolError>> + Send + 'a;
}

/// What became of one call: its report, or the error that replaced it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
  Result(Value),
  Error(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
  #[serde(flatten)]
  pub call:    PlannedCall,
  #[serde(flatten)]
  pub outcome: CallOutcome,
}

impl CallRecord {
  pub fn is_ok(&self) -> bool { matches!(self.outcome, CallOutcome::Result(_)) }
}

/// Run `plan` in order. A failed call is recorded and the next one still
/// runs.
pub async fn run_plan<E: ToolExecutor>(executor: &E, plan: &[PlannedCall]) -> Vec<CallRecord> {
  let mut records = Vec::with_capacity(plan.len());
  for call in plan {
    let outcome = match executor.execute(call).await {
      Ok(report) => CallOutcome::Result(report),
      Err(e) => {
        tracing::debug!(tool = %call.tool, error = %e, "planned call failed");
        CallOutcome::Error(e.to_string())
      }
    };
    records.push(CallRecord { call: call.clone(), outcome });
  }
  records
}

fn required<'a>(call: &'a PlannedCall, name: &'static str) -> Result<&'a str, ToolError> {
  call.argument(name).ok_or(ToolError::MissingArgument(name))
}

// ─── In-process ──────────────────────────────────────────────────────────────

/// Calls the structured queries directly against a store.
pub struct StoreExecutor<S> {
  store: Arc<S>,
}

impl<S> StoreExecutor<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }
}

impl<S: CatalogStore> ToolExecutor for StoreExecutor<S> {
  async fn execute<'a>(&'a self, call: &'a PlannedCall) -> Result<Value, ToolError> {
    let store = self.store.as_ref();
    let version = call.argument("version");

    let report = match call.tool {
      Tool::MustSupport => {
        serde_json::to_value(query::must_support(store, required(call, "canonical")?, version).await?)?
      }
      Tool::Bindings => serde_json::to_value(
        query::bindings(store, required(call, "canonical")?, required(call, "path")?, version)
          .await?,
      )?,
      Tool::Constraints => serde_json::to_value(
        query::constraints(store, required(call, "canonical")?, version, call.argument("path"))
          .await?,
      )?,
      Tool::WhereUsedValueSet => serde_json::to_value(
        query::where_used_value_set(
          store,
          required(call, "value_set")?,
          call.argument("ig"),
          call.argument("ig_version"),
        )
        .await?,
      )?,
      Tool::ProfileSummary => {
        let include_all = call.argument("include_all") == Some("true");
        serde_json::to_value(
          query::profile_summary(store, required(call, "canonical")?, version, include_all).await?,
        )?
      }
      Tool::ElementDetails => serde_json::to_value(
        query::element_details(
          store,
          required(call, "canonical")?,
          required(call, "path")?,
          version,
        )
        .await?,
      )?,
    };
    Ok(report)
  }
}

// ─── Over HTTP ───────────────────────────────────────────────────────────────

/// Calls the `/gq/*` routes of a running API server.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpExecutor {
  client:   Client,
  base_url: String,
}

impl HttpExecutor {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned() })
  }
}

impl ToolExecutor for HttpExecutor {
  async fn execute<'a>(&'a self, call: &'a PlannedCall) -> Result<Value, ToolError> {
    let resp = self
      .client
      .get(format!("{}{}", self.base_url, call.tool.route()))
      .query(&call.arguments)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let detail = resp.json::<Value>().await.unwrap_or(Value::Null);
      return Err(ToolError::Status { status: status.as_u16(), detail });
    }
    Ok(resp.json().await?)
  }
}
