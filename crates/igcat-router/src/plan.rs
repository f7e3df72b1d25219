//! Plan construction: intent + slots → structured query calls.

use std::{collections::BTreeMap, fmt};

use igcat_core::settings::ScopeSettings;
use serde::{Deserialize, Serialize};

use crate::{intent::Intent, slots::Slots};

/// A structured query the router can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
  MustSupport,
  Bindings,
  Constraints,
  WhereUsedValueSet,
  ProfileSummary,
  ElementDetails,
}

impl Tool {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::MustSupport => "must_support",
      Self::Bindings => "bindings",
      Self::Constraints => "constraints",
      Self::WhereUsedValueSet => "where_used_value_set",
      Self::ProfileSummary => "profile_summary",
      Self::ElementDetails => "element_details",
    }
  }

  /// HTTP route serving this query.
  pub fn route(self) -> &'static str {
    match self {
      Self::MustSupport => "/gq/must-support",
      Self::Bindings => "/gq/bindings",
      Self::Constraints => "/gq/constraints",
      Self::WhereUsedValueSet => "/gq/value-set/where-used",
      Self::ProfileSummary => "/gq/profile-summary",
      Self::ElementDetails => "/gq/element-details",
    }
  }
}

impl fmt::Display for Tool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// One call of a plan. `arguments` use the query-string parameter names of
/// the matching HTTP route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedCall {
  pub tool:      Tool,
  pub arguments: BTreeMap<String, String>,
}

impl PlannedCall {
  pub fn argument(&self, name: &str) -> Option<&str> {
    self.arguments.get(name).map(String::as_str)
  }
}

/// Build the plan for `intent`. An intent whose required slots are missing
/// gets an empty plan.
pub fn build_plan(
  intent: Intent,
  slots: &Slots,
  default_scope: Option<&ScopeSettings>,
) -> Vec<PlannedCall> {
  let canonical = slots.canonical.as_deref();
  let path = slots.path.as_deref();

  let call = match intent {
    Intent::ElementDetails => canonical.zip(path).map(|(c, p)| {
      with_version(Tool::ElementDetails, slots, [("canonical", c), ("path", p)])
    }),
    Intent::ProfileSummary => {
      canonical.map(|c| with_version(Tool::ProfileSummary, slots, [("canonical", c)]))
    }
    Intent::MustSupport => {
      canonical.map(|c| with_version(Tool::MustSupport, slots, [("canonical", c)]))
    }
    Intent::Bindings => canonical
      .zip(path)
      .map(|(c, p)| with_version(Tool::Bindings, slots, [("canonical", c), ("path", p)])),
    Intent::Constraints => canonical.map(|c| {
      let mut call = with_version(Tool::Constraints, slots, [("canonical", c)]);
      if let Some(p) = path {
        call.arguments.insert("path".into(), p.into());
      }
      call
    }),
    Intent::WhereUsedValueSet => slots.value_set.as_deref().map(|vs| {
      let mut call = planned(Tool::WhereUsedValueSet, [("value_set", vs)]);
      if let Some(scope) = default_scope {
        call.arguments.insert("ig".into(), scope.ig.clone());
        call.arguments.insert("ig_version".into(), scope.ig_version.clone());
      }
      call
    }),
    Intent::Unknown => None,
  };

  call.into_iter().collect()
}

fn planned<const N: usize>(tool: Tool, args: [(&str, &str); N]) -> PlannedCall {
  PlannedCall {
    tool,
    arguments: args.into_iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect(),
  }
}

fn with_version<const N: usize>(tool: Tool, slots: &Slots, args: [(&str, &str); N]) -> PlannedCall {
  let mut call = planned(tool, args);
  if let Some(v) = &slots.version {
    call.arguments.insert("version".into(), v.clone());
  }
  call
}

#[cfg(test)]
mod tests {
  use super::*;

  fn slots(canonical: Option<&str>, path: Option<&str>) -> Slots {
    Slots {
      canonical: canonical.map(Into::into),
      path: path.map(Into::into),
      ..Default::default()
    }
  }

  #[test]
  fn missing_required_slots_give_empty_plan() {
    let only_canonical = slots(Some("http://x/StructureDefinition/p"), None);
    assert!(build_plan(Intent::Bindings, &only_canonical, None).is_empty());
    assert!(build_plan(Intent::ElementDetails, &only_canonical, None).is_empty());
    assert!(build_plan(Intent::MustSupport, &slots(None, None), None).is_empty());
    assert!(build_plan(Intent::WhereUsedValueSet, &only_canonical, None).is_empty());
    assert!(build_plan(Intent::Unknown, &only_canonical, None).is_empty());
  }

  #[test]
  fn constraints_path_is_optional() {
    let s = slots(Some("http://x/StructureDefinition/p"), None);
    let plan = build_plan(Intent::Constraints, &s, None);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].argument("path"), None);

    let s = slots(Some("http://x/StructureDefinition/p"), Some("Patient.name"));
    let plan = build_plan(Intent::Constraints, &s, None);
    assert_eq!(plan[0].argument("path"), Some("Patient.name"));
  }

  #[test]
  fn version_and_scope_are_forwarded() {
    let mut s = slots(Some("http://x/StructureDefinition/p"), Some("Patient.name"));
    s.version = Some("2.1.1".into());
    let plan = build_plan(Intent::ElementDetails, &s, None);
    assert_eq!(plan[0].tool, Tool::ElementDetails);
    assert_eq!(plan[0].argument("version"), Some("2.1.1"));

    let vs = Slots { value_set: Some("http://x/ValueSet/v".into()), ..Default::default() };
    let scope = ScopeSettings { ig: "ps-ca".into(), ig_version: "2.1.1".into() };
    let plan = build_plan(Intent::WhereUsedValueSet, &vs, Some(&scope));
    assert_eq!(plan[0].argument("ig"), Some("ps-ca"));
    assert_eq!(plan[0].argument("ig_version"), Some("2.1.1"));
    assert_eq!(plan[0].tool.route(), "/gq/value-set/where-used");
  }
}
