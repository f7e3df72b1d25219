//! Fact extraction from a StructureDefinition document.
//!
//! The differential element list is authoritative when it is a non-empty
//! array; the snapshot is the fallback. The choice is made once per document
//! and stamped onto every fact derived from it.

use std::{collections::HashMap, hash::Hash};

use serde::Serialize;
use serde_json::Value;

use crate::fact::{BindingFact, ConstraintFact, ElementFact, SourceChoice};

// ─── Selection ───────────────────────────────────────────────────────────────

/// The element list chosen for extraction.
#[derive(Debug, Clone, Copy)]
pub struct ElementSelection<'a> {
  pub elements: &'a [Value],
  /// `None` when neither representation has elements.
  pub source:   Option<SourceChoice>,
}

pub fn select_elements(doc: &Value) -> ElementSelection<'_> {
  let non_empty = |section: &str| {
    doc
      .get(section)
      .and_then(|s| s.get("element"))
      .and_then(Value::as_array)
      .filter(|elements| !elements.is_empty())
  };

  if let Some(elements) = non_empty("differential") {
    return ElementSelection { elements, source: Some(SourceChoice::Differential) };
  }
  if let Some(elements) = non_empty("snapshot") {
    return ElementSelection { elements, source: Some(SourceChoice::Snapshot) };
  }
  ElementSelection { elements: &[], source: None }
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// Per-kind bookkeeping for one extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
  /// Entries dropped for lacking a required key (`path`, invariant `key`).
  pub skipped:   usize,
  /// Entries that repeated an earlier natural key; the later one won.
  pub collapsed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
  pub elements:    KindStats,
  pub bindings:    KindStats,
  pub constraints: KindStats,
}

/// All facts derived from one document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFacts {
  pub source:      Option<SourceChoice>,
  pub elements:    Vec<ElementFact>,
  pub bindings:    Vec<BindingFact>,
  pub constraints: Vec<ConstraintFact>,
  pub stats:       ExtractStats,
}

impl ExtractedFacts {
  pub fn is_empty(&self) -> bool { self.source.is_none() }
}

// ─── Extraction ──────────────────────────────────────────────────────────────

/// Derive element, binding and constraint facts from `doc`.
pub fn extract(doc: &Value) -> ExtractedFacts {
  let selection = select_elements(doc);
  let Some(source) = selection.source else {
    return ExtractedFacts::default();
  };

  let mut out = ExtractedFacts { source: Some(source), ..Default::default() };
  let mut element_keys: KeyIndex<String> = KeyIndex::default();
  let mut binding_keys: KeyIndex<(String, String)> = KeyIndex::default();
  let mut constraint_keys: KeyIndex<(String, String)> = KeyIndex::default();

  for element in selection.elements {
    let Some(path) = non_empty_str(element, "path") else {
      out.stats.elements.skipped += 1;
      out.stats.bindings.skipped += 1;
      out.stats.constraints.skipped += 1;
      continue;
    };

    let fact = element_fact(element, path, source);
    if element_keys.put(&mut out.elements, path.to_owned(), fact) {
      out.stats.elements.collapsed += 1;
    }

    if let Some(fact) = binding_fact(element, path, source) {
      let key = (fact.path.clone(), fact.value_set.clone());
      if binding_keys.put(&mut out.bindings, key, fact) {
        out.stats.bindings.collapsed += 1;
      }
    }

    let constraints = element.get("constraint").and_then(Value::as_array);
    for invariant in constraints.into_iter().flatten() {
      let Some(key) = non_empty_str(invariant, "key") else {
        out.stats.constraints.skipped += 1;
        continue;
      };
      let fact = constraint_fact(invariant, path, key, source);
      if constraint_keys.put(&mut out.constraints, (path.to_owned(), key.to_owned()), fact) {
        out.stats.constraints.collapsed += 1;
      }
    }
  }

  out
}

fn element_fact(element: &Value, path: &str, source: SourceChoice) -> ElementFact {
  ElementFact {
    element_id:    string_field(element, "id"),
    path:          path.to_owned(),
    min:           element.get("min").and_then(Value::as_i64),
    max:           string_field(element, "max"),
    must_support:  element.get("mustSupport").and_then(Value::as_bool),
    is_modifier:   element.get("isModifier").and_then(Value::as_bool),
    is_summary:    element.get("isSummary").and_then(Value::as_bool),
    types:         element.get("type").cloned(),
    slicing:       element.get("slicing").cloned(),
    raw:           element.clone(),
    source_choice: source,
  }
}

/// `None` unless the element has a binding object naming a strength or a
/// value set. An empty binding object is not an error.
fn binding_fact(element: &Value, path: &str, source: SourceChoice) -> Option<BindingFact> {
  let binding = element.get("binding").filter(|b| b.is_object())?;
  let strength = string_field(binding, "strength");
  let value_set = non_empty_str(binding, "valueSet").unwrap_or_default().to_owned();

  let has_strength = strength.as_deref().is_some_and(|s| !s.is_empty());
  if !has_strength && value_set.is_empty() {
    return None;
  }

  Some(BindingFact {
    path: path.to_owned(),
    strength,
    value_set,
    raw: binding.clone(),
    source_choice: source,
  })
}

fn constraint_fact(
  invariant: &Value,
  path: &str,
  key: &str,
  source: SourceChoice,
) -> ConstraintFact {
  ConstraintFact {
    path:          path.to_owned(),
    key:           key.to_owned(),
    severity:      string_field(invariant, "severity"),
    human:         string_field(invariant, "human"),
    expression:    string_field(invariant, "expression"),
    xpath:         string_field(invariant, "xpath"),
    raw:           invariant.clone(),
    source_choice: source,
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn string_field(v: &Value, key: &str) -> Option<String> {
  v.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn non_empty_str<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
  v.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Remembers where each natural key landed so a repeat overwrites in place.
struct KeyIndex<K> {
  positions: HashMap<K, usize>,
}

impl<K> Default for KeyIndex<K> {
  fn default() -> Self { Self { positions: HashMap::new() } }
}

impl<K: Eq + Hash> KeyIndex<K> {
  /// Returns `true` if `key` was already present.
  fn put<F>(&mut self, rows: &mut Vec<F>, key: K, fact: F) -> bool {
    if let Some(&i) = self.positions.get(&key) {
      rows[i] = fact;
      return true;
    }
    self.positions.insert(key, rows.len());
    rows.push(fact);
    false
  }
}
