//! The closed intent set and the classification modes.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
  ElementDetails,
  ProfileSummary,
  MustSupport,
  Bindings,
  Constraints,
  WhereUsedValueSet,
  Unknown,
}

impl Intent {
  pub const ALL: [Intent; 7] = [
    Self::ElementDetails,
    Self::ProfileSummary,
    Self::MustSupport,
    Self::Bindings,
    Self::Constraints,
    Self::WhereUsedValueSet,
    Self::Unknown,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::ElementDetails => "element_details",
      Self::ProfileSummary => "profile_summary",
      Self::MustSupport => "must_support",
      Self::Bindings => "bindings",
      Self::Constraints => "constraints",
      Self::WhereUsedValueSet => "where_used_value_set",
      Self::Unknown => "unknown",
    }
  }
}

impl fmt::Display for Intent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Intent {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|i| i.as_str() == s)
      .ok_or_else(|| format!("unknown intent: {s}"))
  }
}

/// How a question is classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  #[default]
  Deterministic,
  /// Ask the inference endpoint first; fall back to deterministic rules.
  Llm,
}

impl Mode {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Deterministic => "deterministic",
      Self::Llm => "llm",
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Mode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "deterministic" => Ok(Self::Deterministic),
      "llm" => Ok(Self::Llm),
      other => Err(format!("unknown mode: {other}")),
    }
  }
}
