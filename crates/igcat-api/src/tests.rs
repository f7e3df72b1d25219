//! Route tests over an ingested in-memory catalog.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use igcat_core::fact::FactKind;
use igcat_router::{OllamaClient, QueryRouter, RouterConfig, StoreExecutor};
use igcat_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::api_router;

const PATIENT: &str = "http://example.org/StructureDefinition/ca-patient";
const GENDER_VS: &str = "http://hl7.org/fhir/ValueSet/administrative-gender";

async fn app() -> (Router, TempDir) {
  let dir = TempDir::new().unwrap();
  let doc = json!({
    "resourceType": "StructureDefinition",
    "url": PATIENT,
    "version": "1.0.0",
    "name": "CAPatient",
    "type": "Patient",
    "differential": { "element": [
      { "path": "Patient" },
      { "path": "Patient.identifier", "mustSupport": true, "min": 1, "max": "*" },
      { "path": "Patient.gender", "binding": { "strength": "required", "valueSet": GENDER_VS } }
    ]}
  });
  std::fs::write(dir.path().join("patient.json"), doc.to_string()).unwrap();

  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  igcat_ingest::import_structure_definitions(store.as_ref(), "ps-ca", "1.0.0", dir.path())
    .await
    .unwrap();
  igcat_ingest::load_facts(store.as_ref(), "ps-ca", "1.0.0", &FactKind::ALL, false)
    .await
    .unwrap();

  let router: QueryRouter<OllamaClient, _> =
    QueryRouter::new(RouterConfig::default(), None, StoreExecutor::new(store.clone()));
  (api_router(store, Arc::new(router)), dir)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
  let resp = app.oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
  send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
  let req = Request::post(uri)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_string()))
    .unwrap();
  send(app, req).await
}

fn q(value: &str) -> String {
  value.replace(':', "%3A").replace('/', "%2F").replace('|', "%7C")
}

// ── Structured queries ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_ok() {
  let (app, _dir) = app().await;
  let (status, body) = get(app, "/health").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn must_support_lists_paths() {
  let (app, _dir) = app().await;
  let (status, body) = get(app, &format!("/gq/must-support?canonical={}", q(PATIENT))).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["query_id"], "GQ-MS-01");
  assert_eq!(body["scope"]["ig"], "ps-ca");
  assert_eq!(body["must_support_paths"][0]["path"], "Patient.identifier");
  assert_eq!(body["must_support_paths"][0]["min"], 1);
}

#[tokio::test]
async fn unknown_canonical_is_404() {
  let (app, _dir) = app().await;
  let uri = format!("/gq/must-support?canonical={}", q("http://example.org/StructureDefinition/nope"));
  let (status, body) = get(app, &uri).await;

  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("artifact not found"));
}

#[tokio::test]
async fn missing_parameters_are_400() {
  let (app, _dir) = app().await;
  let (status, body) = get(app.clone(), &format!("/gq/bindings?canonical={}", q(PATIENT))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("path"));

  let (status, _) = get(app, "/gq/must-support").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bindings_and_element_details_at_a_path() {
  let (app, _dir) = app().await;
  let (status, body) = get(
    app.clone(),
    &format!("/gq/bindings?canonical={}&path=Patient.gender", q(PATIENT)),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["bindings"][0]["value_set"], GENDER_VS);

  let (status, body) = get(
    app,
    &format!("/gq/element-details?canonical={}&path=Patient.gender&version=1.0.0", q(PATIENT)),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["bindings"][0]["strength"], "required");
}

#[tokio::test]
async fn where_used_respects_package_scope() {
  let (app, _dir) = app().await;
  let (status, body) =
    get(app.clone(), &format!("/gq/value-set/where-used?value_set={}", q(GENDER_VS))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["usages"][0]["path"], "Patient.gender");

  let uri = format!("/gq/value-set/where-used?value_set={}&ig=ps-ca&ig_version=9.9.9", q(GENDER_VS));
  let (status, body) = get(app.clone(), &uri).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("package not found"));

  let uri = format!("/gq/value-set/where-used?value_set={}&ig=ps-ca", q(GENDER_VS));
  let (status, body) = get(app, &uri).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("ig_version"));
}

#[tokio::test]
async fn resolve_includes_the_resource() {
  let (app, _dir) = app().await;
  let (status, body) = get(app, &format!("/artifacts/resolve?canonical={}", q(PATIENT))).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["version"], "1.0.0");
  assert_eq!(body["resource"]["name"], "CAPatient");
}

// ── Ask ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ask_routes_and_executes() {
  let (app, _dir) = app().await;
  let (status, body) = post_json(
    app,
    "/ask",
    json!({ "question": "Which elements are must support", "hints": { "canonical": PATIENT } }),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["intent"], "must_support");
  assert_eq!(body["mode_used"], "deterministic");
  assert_eq!(body["fallback_used"], false);
  assert_eq!(body["results"][0]["result"]["query_id"], "GQ-MS-01");
}

#[tokio::test]
async fn ask_in_llm_mode_without_endpoint_falls_back() {
  let (app, _dir) = app().await;
  let (status, body) = post_json(
    app,
    "/ask",
    json!({ "question": "list every invariant", "mode": "llm" }),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["mode_requested"], "llm");
  assert_eq!(body["fallback_used"], true);
  assert_eq!(body["intent"], "constraints");
  // No canonical slot: empty plan.
  assert_eq!(body["plan"], json!([]));
}

#[tokio::test]
async fn blank_question_is_400() {
  let (app, _dir) = app().await;
  let (status, _) = post_json(app, "/ask", json!({ "question": "  " })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}
