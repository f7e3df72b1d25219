//! Structured queries over the catalog.
//!
//! Every query resolves its profile through [`crate::resolve`] first, so all
//! read paths agree on which artifact a canonical URL means. Results are
//! plain serialisable reports; an empty result is a
//! [`Error::NoMatches`], not an empty list.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  artifact::{Artifact, Package},
  fact::{BindingFact, ConstraintFact, ElementFact, SourceChoice},
  resolve::resolve,
  store::CatalogStore,
};

/// Rows shown per section by [`profile_summary`] unless `include_all` is set.
pub const SUMMARY_LIMIT: usize = 10;

/// Longest base-definition chain [`profile_summary`] will follow.
const MAX_LINEAGE: usize = 16;

// ─── Parameters ──────────────────────────────────────────────────────────────

/// Query-string parameters shared by the per-profile queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileParams {
  pub canonical:   String,
  pub version:     Option<String>,
  pub path:        Option<String>,
  #[serde(default)]
  pub include_all: bool,
}

/// Query-string parameters for [`where_used_value_set`]. Without `ig` and
/// `ig_version` every package is searched; giving only one is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhereUsedParams {
  pub value_set:  String,
  pub ig:         Option<String>,
  pub ig_version: Option<String>,
}

// ─── Report building blocks ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Scope {
  pub ig:         String,
  pub ig_version: String,
}

impl From<&Package> for Scope {
  fn from(p: &Package) -> Self {
    Self { ig: p.ig.clone(), ig_version: p.ig_version.clone() }
  }
}

/// The identifying metadata of a resolved profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileRef {
  pub canonical_url:   String,
  pub version:         Option<String>,
  pub name:            Option<String>,
  pub title:           Option<String>,
  pub sd_type:         Option<String>,
  pub base_definition: Option<String>,
  pub file_path:       String,
}

impl From<&Artifact> for ProfileRef {
  fn from(a: &Artifact) -> Self {
    Self {
      canonical_url:   a.canonical_url.clone(),
      version:         a.version.clone(),
      name:            a.name.clone(),
      title:           a.title.clone(),
      sd_type:         a.sd_type.clone(),
      base_definition: a.base_definition.clone(),
      file_path:       a.file_path.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct MustSupportPath {
  pub path: String,
  pub min:  Option<i64>,
  pub max:  Option<String>,
}

impl From<ElementFact> for MustSupportPath {
  fn from(e: ElementFact) -> Self { Self { path: e.path, min: e.min, max: e.max } }
}

#[derive(Debug, Clone, Serialize)]
pub struct BindingRow {
  pub path:      String,
  pub strength:  Option<String>,
  pub value_set: String,
  pub source:    SourceChoice,
}

impl From<BindingFact> for BindingRow {
  fn from(b: BindingFact) -> Self {
    Self {
      path:      b.path,
      strength:  b.strength,
      value_set: b.value_set,
      source:    b.source_choice,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConstraintRow {
  pub path:       String,
  pub key:        String,
  pub severity:   Option<String>,
  pub human:      Option<String>,
  pub expression: Option<String>,
  pub source:     SourceChoice,
}

impl From<ConstraintFact> for ConstraintRow {
  fn from(c: ConstraintFact) -> Self {
    Self {
      path:       c.path,
      key:        c.key,
      severity:   c.severity,
      human:      c.human,
      expression: c.expression,
      source:     c.source_choice,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ElementRow {
  pub element_id:   Option<String>,
  pub path:         String,
  pub min:          Option<i64>,
  pub max:          Option<String>,
  pub must_support: Option<bool>,
  pub is_modifier:  Option<bool>,
  pub is_summary:   Option<bool>,
  pub types:        Option<Value>,
  pub slicing:      Option<Value>,
  pub source:       SourceChoice,
}

impl From<ElementFact> for ElementRow {
  fn from(e: ElementFact) -> Self {
    Self {
      element_id:   e.element_id,
      path:         e.path,
      min:          e.min,
      max:          e.max,
      must_support: e.must_support,
      is_modifier:  e.is_modifier,
      is_summary:   e.is_summary,
      types:        e.types,
      slicing:      e.slicing,
      source:       e.source_choice,
    }
  }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MustSupportReport {
  pub query_id:           &'static str,
  pub question:           &'static str,
  pub scope:              Scope,
  pub profile:            ProfileRef,
  pub must_support_paths: Vec<MustSupportPath>,
  pub generated_at:       DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BindingsReport {
  pub query_id:     &'static str,
  pub question:     &'static str,
  pub scope:        Scope,
  pub profile:      ProfileRef,
  pub path:         String,
  pub bindings:     Vec<BindingRow>,
  pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConstraintsReport {
  pub query_id:     &'static str,
  pub question:     &'static str,
  pub scope:        Scope,
  pub profile:      ProfileRef,
  pub path:         Option<String>,
  pub constraints:  Vec<ConstraintRow>,
  pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValueSetUsage {
  pub profile:  ProfileRef,
  pub path:     String,
  pub strength: Option<String>,
  pub source:   SourceChoice,
}

#[derive(Debug, Clone, Serialize)]
pub struct WhereUsedReport {
  pub query_id:     &'static str,
  pub question:     &'static str,
  /// `None` when every package was searched.
  pub scope:        Option<Scope>,
  pub value_set:    String,
  pub usages:       Vec<ValueSetUsage>,
  pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SummaryCounts {
  pub must_support: usize,
  pub bindings:     usize,
  pub constraints:  usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummaryReport {
  pub query_id:           &'static str,
  pub question:           &'static str,
  pub scope:              Scope,
  pub profile:            ProfileRef,
  /// This profile's canonical followed by its base definitions, nearest
  /// first. Stops at the first base that is not in the catalog.
  pub lineage:            Vec<String>,
  pub counts:             SummaryCounts,
  /// `true` when some section was cut to [`SUMMARY_LIMIT`] rows.
  pub truncated:          bool,
  pub must_support_paths: Vec<MustSupportPath>,
  pub bindings:           Vec<BindingRow>,
  pub constraints:        Vec<ConstraintRow>,
  pub generated_at:       DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ElementDetailsReport {
  pub query_id:     &'static str,
  pub question:     &'static str,
  pub scope:        Scope,
  pub profile:      ProfileRef,
  pub path:         String,
  pub element:      Option<ElementRow>,
  pub bindings:     Vec<BindingRow>,
  pub constraints:  Vec<ConstraintRow>,
  pub generated_at: DateTime<Utc>,
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Resolve a profile together with the package that owns it.
pub async fn resolve_profile<S: CatalogStore>(
  store: &S,
  canonical: &str,
  version: Option<&str>,
) -> Result<(Artifact, Package)> {
  let artifact = resolve(store, canonical, version).await?;
  let package = store
    .get_package(artifact.package_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| {
      Error::NoMatches(format!(
        "package {} of artifact {} not found",
        artifact.package_id, artifact.id
      ))
    })?;
  Ok((artifact, package))
}

/// List must-support paths of a profile.
pub async fn must_support<S: CatalogStore>(
  store: &S,
  canonical: &str,
  version: Option<&str>,
) -> Result<MustSupportReport> {
  let (artifact, package) = resolve_profile(store, canonical, version).await?;
  let rows = store
    .element_facts(artifact.id, None, true)
    .await
    .map_err(Error::store)?;
  if rows.is_empty() {
    return Err(Error::NoMatches("no mustSupport elements found for this profile".into()));
  }

  Ok(MustSupportReport {
    query_id:           "GQ-MS-01",
    question:           "List mustSupport paths",
    scope:              Scope::from(&package),
    profile:            ProfileRef::from(&artifact),
    must_support_paths: rows.into_iter().map(MustSupportPath::from).collect(),
    generated_at:       Utc::now(),
  })
}

/// List bindings on one element path of a profile.
pub async fn bindings<S: CatalogStore>(
  store: &S,
  canonical: &str,
  path: &str,
  version: Option<&str>,
) -> Result<BindingsReport> {
  let (artifact, package) = resolve_profile(store, canonical, version).await?;
  let rows = store
    .binding_facts(artifact.id, Some(path))
    .await
    .map_err(Error::store)?;
  if rows.is_empty() {
    return Err(Error::NoMatches("no bindings found for this path".into()));
  }

  Ok(BindingsReport {
    query_id:     "GQ-BIND-01",
    question:     "List bindings for path",
    scope:        Scope::from(&package),
    profile:      ProfileRef::from(&artifact),
    path:         path.to_owned(),
    bindings:     rows.into_iter().map(BindingRow::from).collect(),
    generated_at: Utc::now(),
  })
}

/// List constraints of a profile, optionally on one path only.
pub async fn constraints<S: CatalogStore>(
  store: &S,
  canonical: &str,
  version: Option<&str>,
  path: Option<&str>,
) -> Result<ConstraintsReport> {
  let (artifact, package) = resolve_profile(store, canonical, version).await?;
  let rows = store
    .constraint_facts(artifact.id, path)
    .await
    .map_err(Error::store)?;
  if rows.is_empty() {
    return Err(Error::NoMatches("no constraints found for this profile/path".into()));
  }

  Ok(ConstraintsReport {
    query_id:     "GQ-CONSTR-01",
    question:     if path.is_some() {
      "List constraints for path"
    } else {
      "List constraints for profile"
    },
    scope:        Scope::from(&package),
    profile:      ProfileRef::from(&artifact),
    path:         path.map(str::to_owned),
    constraints:  rows.into_iter().map(ConstraintRow::from).collect(),
    generated_at: Utc::now(),
  })
}

/// Find every profile element bound to `value_set`.
pub async fn where_used_value_set<S: CatalogStore>(
  store: &S,
  value_set: &str,
  ig: Option<&str>,
  ig_version: Option<&str>,
) -> Result<WhereUsedReport> {
  let package = match (ig, ig_version) {
    (Some(ig), Some(ig_version)) => Some(
      store
        .find_package(ig, ig_version)
        .await
        .map_err(Error::store)?
        .ok_or_else(|| Error::PackageNotFound {
          ig:         ig.to_owned(),
          ig_version: ig_version.to_owned(),
        })?,
    ),
    (None, None) => None,
    _ => return Err(Error::IncompleteScope),
  };

  let rows = store
    .binding_usages(value_set, package.as_ref().map(|p| p.id))
    .await
    .map_err(Error::store)?;
  if rows.is_empty() {
    return Err(Error::NoMatches("value set not used in this scope".into()));
  }

  Ok(WhereUsedReport {
    query_id:     "GQ-VS-WHEREUSED-01",
    question:     "Where is this ValueSet used?",
    scope:        package.as_ref().map(Scope::from),
    value_set:    value_set.to_owned(),
    usages:       rows
      .into_iter()
      .map(|u| ValueSetUsage {
        profile:  ProfileRef::from(&u.artifact),
        path:     u.binding.path,
        strength: u.binding.strength,
        source:   u.binding.source_choice,
      })
      .collect(),
    generated_at: Utc::now(),
  })
}

/// Summarise must-support elements, bindings and constraints of a profile.
pub async fn profile_summary<S: CatalogStore>(
  store: &S,
  canonical: &str,
  version: Option<&str>,
  include_all: bool,
) -> Result<ProfileSummaryReport> {
  let (artifact, package) = resolve_profile(store, canonical, version).await?;

  let must_support = store
    .element_facts(artifact.id, None, true)
    .await
    .map_err(Error::store)?;
  let bindings = store
    .binding_facts(artifact.id, None)
    .await
    .map_err(Error::store)?;
  let constraints = store
    .constraint_facts(artifact.id, None)
    .await
    .map_err(Error::store)?;

  let counts = SummaryCounts {
    must_support: must_support.len(),
    bindings:     bindings.len(),
    constraints:  constraints.len(),
  };
  let limit = if include_all { usize::MAX } else { SUMMARY_LIMIT };
  let truncated =
    !include_all && [counts.must_support, counts.bindings, counts.constraints]
      .iter()
      .any(|&n| n > SUMMARY_LIMIT);

  let lineage = lineage(store, &artifact).await?;

  Ok(ProfileSummaryReport {
    query_id: "GQ-SUMMARY-01",
    question: "Summarize profile",
    scope: Scope::from(&package),
    profile: ProfileRef::from(&artifact),
    lineage,
    counts,
    truncated,
    must_support_paths: must_support.into_iter().take(limit).map(Into::into).collect(),
    bindings: bindings.into_iter().take(limit).map(Into::into).collect(),
    constraints: constraints.into_iter().take(limit).map(Into::into).collect(),
    generated_at: Utc::now(),
  })
}

/// Everything recorded about one element path of a profile.
pub async fn element_details<S: CatalogStore>(
  store: &S,
  canonical: &str,
  path: &str,
  version: Option<&str>,
) -> Result<ElementDetailsReport> {
  let (artifact, package) = resolve_profile(store, canonical, version).await?;

  let element = store
    .element_facts(artifact.id, Some(path), false)
    .await
    .map_err(Error::store)?
    .into_iter()
    .next();
  let bindings = store
    .binding_facts(artifact.id, Some(path))
    .await
    .map_err(Error::store)?;
  let constraints = store
    .constraint_facts(artifact.id, Some(path))
    .await
    .map_err(Error::store)?;

  if element.is_none() && bindings.is_empty() && constraints.is_empty() {
    return Err(Error::NoMatches(format!("no element recorded at path {path}")));
  }

  Ok(ElementDetailsReport {
    query_id:     "GQ-ELEMENT-01",
    question:     "Describe element",
    scope:        Scope::from(&package),
    profile:      ProfileRef::from(&artifact),
    path:         path.to_owned(),
    element:      element.map(ElementRow::from),
    bindings:     bindings.into_iter().map(BindingRow::from).collect(),
    constraints:  constraints.into_iter().map(ConstraintRow::from).collect(),
    generated_at: Utc::now(),
  })
}

/// Follow `base_definition` links through the catalog.
async fn lineage<S: CatalogStore>(store: &S, artifact: &Artifact) -> Result<Vec<String>> {
  let mut chain = vec![artifact.canonical_url.clone()];
  let mut seen: HashSet<String> = chain.iter().cloned().collect();
  let mut next = artifact.base_definition.clone();

  while let Some(base) = next.take() {
    if chain.len() >= MAX_LINEAGE || !seen.insert(base.clone()) {
      break;
    }
    chain.push(base.clone());

    // A base may pin a version as `canonical|version`.
    let (canonical, version) = match base.split_once('|') {
      Some((c, v)) => (c, Some(v)),
      None => (base.as_str(), None),
    };
    let candidates = store
      .artifacts_by_canonical(canonical)
      .await
      .map_err(Error::store)?;
    next = crate::resolve::pick(candidates, version).and_then(|parent| parent.base_definition);
  }

  Ok(chain)
}
