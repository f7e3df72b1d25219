//! Integration tests for `SqliteStore` against an in-memory database.

use igcat_core::{
  STRUCTURE_DEFINITION,
  artifact::{NewArtifact, PackageScope},
  fact::{BindingFact, ConstraintFact, ElementFact, FactBatch, FactKind, SourceChoice},
  resolve,
  store::CatalogStore,
};
use serde_json::json;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn scope(ig: &str, ig_version: &str) -> PackageScope {
  PackageScope {
    ig:          ig.into(),
    ig_version:  ig_version.into(),
    source_path: format!("/igs/{ig}/{ig_version}"),
  }
}

fn artifact(canonical: &str, version: Option<&str>, sha: &str) -> NewArtifact {
  NewArtifact {
    resource_type:   STRUCTURE_DEFINITION.into(),
    canonical_url:   canonical.into(),
    version:         version.map(Into::into),
    name:            Some("Profile".into()),
    title:           None,
    sd_type:         Some("Patient".into()),
    base_definition: None,
    file_path:       "profile.json".into(),
    sha256:          sha.into(),
  }
}

fn element(path: &str, must_support: Option<bool>) -> ElementFact {
  ElementFact {
    element_id:    Some(path.into()),
    path:          path.into(),
    min:           Some(0),
    max:           Some("1".into()),
    must_support,
    is_modifier:   None,
    is_summary:    None,
    types:         Some(json!([{ "code": "string" }])),
    slicing:       None,
    raw:           json!({ "id": path, "path": path, "mustSupport": must_support }),
    source_choice: SourceChoice::Differential,
  }
}

fn binding(path: &str, value_set: &str) -> BindingFact {
  BindingFact {
    path:          path.into(),
    strength:      Some("required".into()),
    value_set:     value_set.into(),
    raw:           json!({ "strength": "required", "valueSet": value_set }),
    source_choice: SourceChoice::Differential,
  }
}

fn constraint(path: &str, key: &str) -> ConstraintFact {
  ConstraintFact {
    path:          path.into(),
    key:           key.into(),
    severity:      Some("error".into()),
    human:         Some("must have a value".into()),
    expression:    Some("value.exists()".into()),
    xpath:         None,
    raw:           json!({ "key": key, "severity": "error" }),
    source_choice: SourceChoice::Snapshot,
  }
}

const PATIENT: &str = "http://example.org/StructureDefinition/patient";

// ─── Packages & artifacts ────────────────────────────────────────────────────

#[tokio::test]
async fn import_inserts_then_skips_then_updates() {
  let s = store().await;

  let first = s
    .import_artifacts(scope("ps-ca", "1.0.0"), vec![artifact(PATIENT, Some("1.0.0"), "aa")])
    .await
    .unwrap();
  assert_eq!((first.inserted, first.updated, first.unchanged), (1, 0, 0));

  let again = s
    .import_artifacts(scope("ps-ca", "1.0.0"), vec![artifact(PATIENT, Some("1.0.0"), "aa")])
    .await
    .unwrap();
  assert_eq!((again.inserted, again.updated, again.unchanged), (0, 0, 1));
  assert_eq!(again.package.id, first.package.id);

  let changed = s
    .import_artifacts(scope("ps-ca", "1.0.0"), vec![artifact(PATIENT, Some("1.0.0"), "bb")])
    .await
    .unwrap();
  assert_eq!((changed.inserted, changed.updated, changed.unchanged), (0, 1, 0));

  let rows = s.artifacts_by_canonical(PATIENT).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].sha256, "bb");
}

#[tokio::test]
async fn absent_version_is_its_own_key() {
  let s = store().await;
  let out = s
    .import_artifacts(
      scope("ps-ca", "1.0.0"),
      vec![artifact(PATIENT, None, "aa"), artifact(PATIENT, Some("1.0.0"), "bb")],
    )
    .await
    .unwrap();
  assert_eq!(out.inserted, 2);

  let out = s
    .import_artifacts(scope("ps-ca", "1.0.0"), vec![artifact(PATIENT, None, "aa")])
    .await
    .unwrap();
  assert_eq!(out.unchanged, 1);
  assert_eq!(s.artifacts_by_canonical(PATIENT).await.unwrap().len(), 2);
}

#[tokio::test]
async fn packages_are_keyed_by_ig_and_version() {
  let s = store().await;
  s.import_artifacts(scope("ps-ca", "1.0.0"), vec![]).await.unwrap();
  s.import_artifacts(scope("ps-ca", "2.0.0"), vec![]).await.unwrap();
  s.import_artifacts(scope("ps-ca", "1.0.0"), vec![]).await.unwrap();

  let all = s.list_packages().await.unwrap();
  assert_eq!(all.len(), 2);

  let found = s.find_package("ps-ca", "2.0.0").await.unwrap().unwrap();
  assert_eq!(s.get_package(found.id).await.unwrap(), Some(found));
  assert!(s.find_package("ps-ca", "3.0.0").await.unwrap().is_none());
}

#[tokio::test]
async fn resolver_sees_every_package() {
  let s = store().await;
  s.import_artifacts(scope("ps-ca", "1.0.0"), vec![artifact(PATIENT, Some("1.0.0"), "aa")])
    .await
    .unwrap();
  s.import_artifacts(scope("ps-ca", "2.0.0"), vec![artifact(PATIENT, Some("2.0.0"), "bb")])
    .await
    .unwrap();

  let best = resolve::resolve(&s, PATIENT, None).await.unwrap();
  assert_eq!(best.version.as_deref(), Some("2.0.0"));

  let pinned = resolve::resolve(&s, PATIENT, Some("1.0.0")).await.unwrap();
  assert_eq!(pinned.sha256, "aa");

  let err = resolve::resolve(&s, PATIENT, Some("9.9.9")).await.unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn deleting_a_package_cascades_to_facts() {
  let s = store().await;
  let out = s
    .import_artifacts(scope("ps-ca", "1.0.0"), vec![artifact(PATIENT, Some("1.0.0"), "aa")])
    .await
    .unwrap();
  let art = s.list_artifacts(out.package.id, STRUCTURE_DEFINITION).await.unwrap().remove(0);
  s.upsert_elements(vec![FactBatch {
    artifact_id: art.id,
    facts:       vec![element("Patient.name", Some(true))],
  }])
  .await
  .unwrap();

  assert!(s.delete_package(out.package.id).await.unwrap());
  assert!(!s.delete_package(out.package.id).await.unwrap());
  assert!(s.artifacts_by_canonical(PATIENT).await.unwrap().is_empty());
  assert!(s.element_facts(art.id, None, false).await.unwrap().is_empty());
}

// ─── Facts ───────────────────────────────────────────────────────────────────

async fn seeded() -> (SqliteStore, i64) {
  let s = store().await;
  let out = s
    .import_artifacts(scope("ps-ca", "1.0.0"), vec![artifact(PATIENT, Some("1.0.0"), "aa")])
    .await
    .unwrap();
  let id = s.list_artifacts(out.package.id, STRUCTURE_DEFINITION).await.unwrap()[0].id;
  (s, id)
}

#[tokio::test]
async fn element_upsert_is_idempotent() {
  let (s, id) = seeded().await;
  let batch = || {
    vec![FactBatch {
      artifact_id: id,
      facts:       vec![element("Patient.name", Some(true)), element("Patient.gender", None)],
    }]
  };

  let first = s.upsert_elements(batch()).await.unwrap();
  assert_eq!((first.inserted, first.updated, first.unchanged), (2, 0, 0));

  let before = s.element_facts(id, None, false).await.unwrap();
  let second = s.upsert_elements(batch()).await.unwrap();
  assert_eq!((second.inserted, second.updated, second.unchanged), (0, 0, 2));
  assert_eq!(s.element_facts(id, None, false).await.unwrap(), before);

  let changed = s
    .upsert_elements(vec![FactBatch {
      artifact_id: id,
      facts:       vec![element("Patient.gender", Some(true))],
    }])
    .await
    .unwrap();
  assert_eq!((changed.inserted, changed.updated, changed.unchanged), (0, 1, 0));
}

async fn load_one_of_each(s: &SqliteStore, id: i64) {
  let gender_vs = "http://hl7.org/fhir/ValueSet/administrative-gender";
  s.upsert_elements(vec![FactBatch { artifact_id: id, facts: vec![element("Patient.name", Some(true))] }])
    .await
    .unwrap();
  s.upsert_bindings(vec![FactBatch { artifact_id: id, facts: vec![binding("Patient.gender", gender_vs)] }])
    .await
    .unwrap();
  s.upsert_constraints(vec![FactBatch { artifact_id: id, facts: vec![constraint("Patient", "pat-1")] }])
    .await
    .unwrap();
}

#[tokio::test]
async fn unchanged_upserts_keep_loaded_at() {
  let (s, id) = seeded().await;
  load_one_of_each(&s, id).await;

  let mut before = Vec::new();
  for kind in FactKind::ALL {
    before.push(s.loaded_at(kind).await.unwrap());
  }

  tokio::time::sleep(std::time::Duration::from_millis(10)).await;
  load_one_of_each(&s, id).await;

  for (kind, stamps) in FactKind::ALL.into_iter().zip(before) {
    assert_eq!(stamps.len(), 1, "{kind}");
    assert_eq!(s.loaded_at(kind).await.unwrap(), stamps, "{kind}");
  }
}

#[tokio::test]
async fn element_reads_filter_by_path_and_must_support() {
  let (s, id) = seeded().await;
  s.upsert_elements(vec![FactBatch {
    artifact_id: id,
    facts:       vec![
      element("Patient.name", Some(true)),
      element("Patient.gender", Some(false)),
      element("Patient.birthDate", None),
    ],
  }])
  .await
  .unwrap();

  let all = s.element_facts(id, None, false).await.unwrap();
  let paths: Vec<&str> = all.iter().map(|e| e.path.as_str()).collect();
  assert_eq!(paths, vec!["Patient.birthDate", "Patient.gender", "Patient.name"]);

  let ms = s.element_facts(id, None, true).await.unwrap();
  assert_eq!(ms.len(), 1);
  assert_eq!(ms[0].must_support, Some(true));
  assert_eq!(ms[0].types, Some(json!([{ "code": "string" }])));

  let one = s.element_facts(id, Some("Patient.gender"), false).await.unwrap();
  assert_eq!(one.len(), 1);
  assert_eq!(one[0].must_support, Some(false));
}

#[tokio::test]
async fn bindings_key_on_value_set_and_report_usages() {
  let (s, id) = seeded().await;
  let vs = "http://example.org/ValueSet/gender";
  let counts = s
    .upsert_bindings(vec![FactBatch {
      artifact_id: id,
      facts:       vec![binding("Patient.gender", vs), binding("Patient.gender", "")],
    }])
    .await
    .unwrap();
  assert_eq!(counts.inserted, 2);

  let at_path = s.binding_facts(id, Some("Patient.gender")).await.unwrap();
  assert_eq!(at_path.len(), 2);
  assert_eq!(at_path[0].value_set, "");

  let usages = s.binding_usages(vs, None).await.unwrap();
  assert_eq!(usages.len(), 1);
  assert_eq!(usages[0].artifact.canonical_url, PATIENT);
  assert_eq!(usages[0].binding.strength.as_deref(), Some("required"));

  let package_id = usages[0].artifact.package_id;
  assert_eq!(s.binding_usages(vs, Some(package_id)).await.unwrap().len(), 1);
  assert!(s.binding_usages(vs, Some(package_id + 1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn truncate_removes_only_one_kind() {
  let (s, id) = seeded().await;
  s.upsert_elements(vec![FactBatch { artifact_id: id, facts: vec![element("Patient", None)] }])
    .await
    .unwrap();
  s.upsert_constraints(vec![FactBatch {
    artifact_id: id,
    facts:       vec![constraint("Patient", "pat-1"), constraint("Patient", "pat-2")],
  }])
  .await
  .unwrap();

  let removed = s.truncate_facts(FactKind::Constraints, vec![id]).await.unwrap();
  assert_eq!(removed, 2);
  assert!(s.constraint_facts(id, None).await.unwrap().is_empty());
  assert_eq!(s.element_facts(id, None, false).await.unwrap().len(), 1);

  let reloaded = s
    .upsert_constraints(vec![FactBatch { artifact_id: id, facts: vec![constraint("Patient", "pat-1")] }])
    .await
    .unwrap();
  assert_eq!(reloaded.inserted, 1);
  let stored = s.constraint_facts(id, Some("Patient")).await.unwrap();
  assert_eq!(stored[0].source_choice, SourceChoice::Snapshot);
}
