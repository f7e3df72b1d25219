//! Structural facts extracted from a profile's element list.
//!
//! Each fact kind has a natural key within its artifact:
//!
//! | Kind | Key |
//! |------|-----|
//! | [`ElementFact`] | `(artifact, path)` |
//! | [`BindingFact`] | `(artifact, path, value_set)` |
//! | [`ConstraintFact`] | `(artifact, path, key)` |
//!
//! Facts are owned by their artifact and never created on their own.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::artifact::Artifact;

// ─── Source choice ───────────────────────────────────────────────────────────

/// Which element list of the profile a fact was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceChoice {
  Differential,
  Snapshot,
}

impl SourceChoice {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Differential => "differential",
      Self::Snapshot => "snapshot",
    }
  }
}

impl fmt::Display for SourceChoice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SourceChoice {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "differential" => Ok(Self::Differential),
      "snapshot" => Ok(Self::Snapshot),
      other => Err(format!("unknown source choice: {other:?}")),
    }
  }
}

// ─── Fact kinds ──────────────────────────────────────────────────────────────

/// The three fact streams derived from one element list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactKind {
  Elements,
  Bindings,
  Constraints,
}

impl FactKind {
  pub const ALL: [FactKind; 3] = [Self::Elements, Self::Bindings, Self::Constraints];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Elements => "elements",
      Self::Bindings => "bindings",
      Self::Constraints => "constraints",
    }
  }
}

impl fmt::Display for FactKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FactKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|k| k.as_str() == s)
      .ok_or_else(|| format!("unknown fact kind: {s:?} (expected elements, bindings or constraints)"))
  }
}

// ─── Facts ───────────────────────────────────────────────────────────────────

/// Cardinality and flags of one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementFact {
  pub element_id:    Option<String>,
  pub path:          String,
  pub min:           Option<i64>,
  pub max:           Option<String>,
  pub must_support:  Option<bool>,
  pub is_modifier:   Option<bool>,
  pub is_summary:    Option<bool>,
  /// The element's `type` array, kept opaque.
  pub types:         Option<Value>,
  /// The element's `slicing` object, kept opaque.
  pub slicing:       Option<Value>,
  pub raw:           Value,
  pub source_choice: SourceChoice,
}

/// A terminology binding on one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingFact {
  pub path:          String,
  pub strength:      Option<String>,
  /// Value set canonical; `""` when the binding names none.
  pub value_set:     String,
  pub raw:           Value,
  pub source_choice: SourceChoice,
}

/// One invariant declared on an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintFact {
  pub path:          String,
  pub key:           String,
  pub severity:      Option<String>,
  pub human:         Option<String>,
  pub expression:    Option<String>,
  pub xpath:         Option<String>,
  pub raw:           Value,
  pub source_choice: SourceChoice,
}

/// A binding joined with the artifact that declares it.
#[derive(Debug, Clone, Serialize)]
pub struct BindingUsage {
  pub artifact: Artifact,
  pub binding:  BindingFact,
}

// ─── Write batches ───────────────────────────────────────────────────────────

/// Facts of one kind destined for one artifact.
#[derive(Debug, Clone)]
pub struct FactBatch<F> {
  pub artifact_id: i64,
  pub facts:       Vec<F>,
}

/// Outcome of an upsert batch for one fact kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
  pub inserted:  usize,
  pub updated:   usize,
  /// Rows whose stored content already matched; left untouched.
  pub unchanged: usize,
}

impl UpsertCounts {
  pub fn add(&mut self, other: UpsertCounts) {
    self.inserted += other.inserted;
    self.updated += other.updated;
    self.unchanged += other.unchanged;
  }
}
