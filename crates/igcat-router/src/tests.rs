//! Router tests: canned inference replies, stub and store-backed executors,
//! and throwaway HTTP servers standing in for external endpoints.

use std::{sync::Arc, time::Duration};

use axum::{Json, Router, http::StatusCode, routing::{get, post}};
use igcat_core::{fact::FactKind, settings::InferenceSettings};
use igcat_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::{
  AskRequest, AssistError, InferenceClient, Intent, Mode, OllamaClient, QueryRouter,
  RouterConfig, Slots, StoreExecutor, ToolError, ToolExecutor,
  execute::{HttpExecutor, run_plan},
  plan::{PlannedCall, Tool},
};

const PATIENT: &str = "http://example.org/StructureDefinition/ca-patient";

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// Replies with the same text to every prompt.
struct Canned(&'static str);

impl InferenceClient for Canned {
  async fn generate<'a>(&'a self, _prompt: &'a str) -> Result<String, AssistError> {
    Ok(self.0.to_owned())
  }
}

/// Fails every request the way an unreachable endpoint would.
struct Unreachable;

impl InferenceClient for Unreachable {
  async fn generate<'a>(&'a self, _prompt: &'a str) -> Result<String, AssistError> {
    Err(AssistError::Timeout)
  }
}

/// Echoes each call back instead of running it.
struct Echo;

impl ToolExecutor for Echo {
  async fn execute<'a>(&'a self, call: &'a PlannedCall) -> Result<Value, ToolError> {
    Ok(json!({ "tool": call.tool, "arguments": call.arguments }))
  }
}

fn router<C: InferenceClient>(inference: Option<C>) -> QueryRouter<C, Echo> {
  QueryRouter::new(RouterConfig::default(), inference, Echo)
}

fn ask(question: &str, mode: Mode, hints: Slots) -> AskRequest {
  AskRequest { question: question.into(), mode, hints }
}

fn canonical_hint() -> Slots { Slots { canonical: Some(PATIENT.into()), ..Default::default() } }

async fn serve(app: Router) -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  format!("http://{addr}")
}

// ─── Deterministic routing ───────────────────────────────────────────────────

#[tokio::test]
async fn dotted_path_routes_to_element_details() {
  let resp = router::<Canned>(None)
    .route(ask("What binding applies to Patient.gender?", Mode::Deterministic, Slots::default()))
    .await;

  assert_eq!(resp.intent, Intent::ElementDetails);
  assert_eq!(resp.slots.path.as_deref(), Some("Patient.gender"));
  assert_eq!(resp.mode_used, Mode::Deterministic);
  assert!(!resp.fallback_used);
  assert!(resp.confidence.is_none());
  // No canonical: nothing to call.
  assert!(resp.plan.is_empty());
  assert!(resp.results.is_empty());
}

#[tokio::test]
async fn hinted_canonical_completes_the_plan() {
  let resp = router::<Canned>(None)
    .route(ask("What binding applies to Patient.gender?", Mode::Deterministic, canonical_hint()))
    .await;

  assert_eq!(resp.plan.len(), 1);
  assert_eq!(resp.plan[0].tool, Tool::ElementDetails);
  assert_eq!(resp.plan[0].argument("canonical"), Some(PATIENT));
  assert_eq!(resp.plan[0].argument("path"), Some("Patient.gender"));
  assert!(resp.results[0].is_ok());
}

// ─── Assisted routing ────────────────────────────────────────────────────────

#[tokio::test]
async fn accepted_assessment_is_used() {
  let llm = Canned(r#"{"intent": "must_support", "confidence": 0.75}"#);
  let resp = router(Some(llm))
    .route(ask("which elements matter", Mode::Llm, canonical_hint()))
    .await;

  assert_eq!(resp.mode_requested, Mode::Llm);
  assert_eq!(resp.mode_used, Mode::Llm);
  assert!(!resp.fallback_used);
  assert_eq!(resp.confidence, Some(0.75));
  assert_eq!(resp.intent, Intent::MustSupport);
  assert_eq!(resp.plan[0].tool, Tool::MustSupport);
}

#[tokio::test]
async fn invalid_replies_fall_back_to_deterministic() {
  for reply in [
    "I think this is about bindings",
    r#"{"intent": "drop_tables", "confidence": 0.9}"#,
    r#"{"intent": "bindings", "confidence": 7}"#,
    r#"{"intent": "bindings"}"#,
    r#"["bindings", 0.9]"#,
  ] {
    let resp = router(Some(Canned(reply)))
      .route(ask("give me an overview", Mode::Llm, canonical_hint()))
      .await;

    assert_eq!(resp.mode_used, Mode::Deterministic, "{reply}");
    assert!(resp.fallback_used, "{reply}");
    assert!(resp.fallback_reason.is_some(), "{reply}");
    assert!(resp.confidence.is_none(), "{reply}");
    assert_eq!(resp.intent, Intent::ProfileSummary, "{reply}");
  }
}

#[tokio::test]
async fn transport_failure_and_missing_endpoint_fall_back() {
  let resp = router(Some(Unreachable))
    .route(ask("list every invariant", Mode::Llm, Slots::default()))
    .await;
  assert!(resp.fallback_used);
  assert_eq!(resp.intent, Intent::Constraints);

  let resp = router::<Canned>(None)
    .route(ask("list every invariant", Mode::Llm, Slots::default()))
    .await;
  assert!(resp.fallback_used);
  assert_eq!(resp.fallback_reason.as_deref(), Some("no inference endpoint configured"));
}

#[tokio::test]
async fn hints_beat_assessed_slots() {
  let llm = Canned(
    r#"{"intent": "bindings", "confidence": 0.6,
        "slots": {"path": "Patient.gender", "canonical": "http://example.org/StructureDefinition/other"}}"#,
  );
  let hints = Slots { path: Some("Patient.maritalStatus".into()), ..Default::default() };
  let resp = router(Some(llm))
    .route(ask("what terminology applies here", Mode::Llm, hints))
    .await;

  assert_eq!(resp.mode_used, Mode::Llm);
  assert_eq!(resp.slots.path.as_deref(), Some("Patient.maritalStatus"));
  // Empty slots are filled from the assessment.
  assert_eq!(
    resp.slots.canonical.as_deref(),
    Some("http://example.org/StructureDefinition/other")
  );
  assert_eq!(resp.plan[0].argument("path"), Some("Patient.maritalStatus"));
}

#[tokio::test]
async fn response_serialises_with_provenance_fields() {
  let resp = router::<Canned>(None)
    .route(ask("summarize", Mode::Llm, canonical_hint()))
    .await;
  let v = serde_json::to_value(&resp).unwrap();

  for field in [
    "request_id", "question", "mode_requested", "mode_used", "fallback_used",
    "fallback_reason", "confidence", "slots", "intent", "plan", "results",
  ] {
    assert!(v.get(field).is_some(), "missing {field}");
  }
  assert_eq!(v["mode_requested"], "llm");
  assert_eq!(v["mode_used"], "deterministic");
  assert_eq!(v["intent"], "profile_summary");
  assert_eq!(v["results"][0]["tool"], "profile_summary");
  assert!(v["results"][0].get("result").is_some());
}

// ─── Execution against a real catalog ────────────────────────────────────────

async fn catalog() -> (Arc<SqliteStore>, TempDir) {
  let dir = TempDir::new().unwrap();
  let doc = json!({
    "resourceType": "StructureDefinition",
    "url": PATIENT,
    "version": "1.0.0",
    "type": "Patient",
    "differential": { "element": [
      { "path": "Patient" },
      { "path": "Patient.identifier", "mustSupport": true }
    ]}
  });
  std::fs::write(dir.path().join("patient.json"), doc.to_string()).unwrap();

  let store = SqliteStore::open_in_memory().await.unwrap();
  igcat_ingest::import_structure_definitions(&store, "ps-ca", "1.0.0", dir.path())
    .await
    .unwrap();
  igcat_ingest::load_facts(&store, "ps-ca", "1.0.0", &FactKind::ALL, false)
    .await
    .unwrap();
  (Arc::new(store), dir)
}

fn call(tool: Tool, args: &[(&str, &str)]) -> PlannedCall {
  PlannedCall {
    tool,
    arguments: args.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect(),
  }
}

#[tokio::test]
async fn failed_calls_do_not_stop_the_plan() {
  let (store, _dir) = catalog().await;
  let executor = StoreExecutor::new(store);
  let plan = vec![
    call(Tool::MustSupport, &[("canonical", "http://example.org/StructureDefinition/nope")]),
    call(Tool::MustSupport, &[("canonical", PATIENT)]),
    call(Tool::Bindings, &[("canonical", PATIENT)]),
  ];

  let records = run_plan(&executor, &plan).await;
  let ok: Vec<bool> = records.iter().map(|r| r.is_ok()).collect();
  assert_eq!(ok, vec![false, true, false]);

  let v = serde_json::to_value(&records).unwrap();
  assert!(v[0]["error"].as_str().unwrap().contains("artifact not found"));
  assert_eq!(v[1]["result"]["must_support_paths"][0]["path"], "Patient.identifier");
  assert!(v[2]["error"].as_str().unwrap().contains("path"));
}

#[tokio::test]
async fn store_backed_router_answers_must_support() {
  let (store, _dir) = catalog().await;
  let router: QueryRouter<Canned, _> =
    QueryRouter::new(RouterConfig::default(), None, StoreExecutor::new(store));

  let resp = router
    .route(ask("Which elements are must support", Mode::Deterministic, canonical_hint()))
    .await;
  assert_eq!(resp.intent, Intent::MustSupport);
  let v = serde_json::to_value(&resp.results).unwrap();
  assert_eq!(v[0]["result"]["query_id"], "GQ-MS-01");
}

// ─── HTTP clients ────────────────────────────────────────────────────────────

fn inference(endpoint: String, timeout_ms: u64) -> InferenceSettings {
  InferenceSettings { endpoint, model: "llama3.2".into(), timeout_ms }
}

#[tokio::test]
async fn ollama_client_round_trip() {
  let app = Router::new().route(
    "/api/generate",
    post(|Json(body): Json<Value>| async move {
      let well_formed = body["format"] == "json" && body["stream"] == false && body["model"] == "llama3.2";
      let response = if well_formed {
        r#"{"intent": "constraints", "confidence": 0.9}"#
      } else {
        "bad request shape"
      };
      Json(json!({ "model": "llama3.2", "response": response, "done": true }))
    }),
  );
  let base = serve(app).await;

  let client = OllamaClient::new(&inference(base, 2_000)).unwrap();
  let a = crate::assist::assess(&client, "any invariants?", &Slots::default())
    .await
    .unwrap();
  assert_eq!(a.intent, Intent::Constraints);
}

#[tokio::test]
async fn ollama_errors_map_to_assist_errors() {
  let app = Router::new()
    .route("/broken/api/generate", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
    .route(
      "/slow/api/generate",
      post(|| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Json(json!({ "response": "{}" }))
      }),
    );
  let base = serve(app).await;

  let broken = OllamaClient::new(&inference(format!("{base}/broken"), 2_000)).unwrap();
  assert!(matches!(broken.generate("q").await, Err(AssistError::Status(500))));

  let slow = OllamaClient::new(&inference(format!("{base}/slow/"), 50)).unwrap();
  assert!(matches!(slow.generate("q").await, Err(AssistError::Timeout)));
}

#[tokio::test]
async fn http_executor_reports_status_detail() {
  let app = Router::new()
    .route(
      "/gq/must-support",
      get(|| async { Json(json!({ "query_id": "GQ-MS-01" })) }),
    )
    .route(
      "/gq/bindings",
      get(|| async {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "no bindings found for this path" })))
      }),
    );
  let base = serve(app).await;
  let executor = HttpExecutor::new(&base, Duration::from_secs(2)).unwrap();

  let ok = executor
    .execute(&call(Tool::MustSupport, &[("canonical", PATIENT)]))
    .await
    .unwrap();
  assert_eq!(ok["query_id"], "GQ-MS-01");

  let err = executor
    .execute(&call(Tool::Bindings, &[("canonical", PATIENT), ("path", "Patient.gender")]))
    .await
    .unwrap_err();
  match err {
    ToolError::Status { status, detail } => {
      assert_eq!(status, 404);
      assert_eq!(detail["error"], "no bindings found for this path");
    }
    other => panic!("unexpected error: {other}"),
  }
}
