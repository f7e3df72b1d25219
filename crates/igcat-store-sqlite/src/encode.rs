//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Opaque JSON payloads are stored
//! as compact JSON text. Booleans are stored as 0/1 integers, NULL when the
//! source document did not say.

use chrono::{DateTime, Utc};
use igcat_core::{
  artifact::{Artifact, Package},
  fact::{BindingFact, ConstraintFact, ElementFact, SourceChoice},
};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── SourceChoice ────────────────────────────────────────────────────────────

pub fn decode_source_choice(s: &str) -> Result<SourceChoice> { s.parse().map_err(Error::Decode) }

// ─── JSON columns ────────────────────────────────────────────────────────────

fn encode_json(v: &Value) -> Result<String> { Ok(serde_json::to_string(v)?) }

fn decode_json(s: &str) -> Result<Value> { Ok(serde_json::from_str(s)?) }

fn decode_opt_json(s: Option<String>) -> Result<Option<Value>> {
  s.as_deref().map(decode_json).transpose()
}

// ─── Bound parameters ────────────────────────────────────────────────────────

fn text(s: &str) -> SqlValue { SqlValue::Text(s.to_owned()) }

fn opt_text(s: Option<&str>) -> SqlValue { s.map_or(SqlValue::Null, text) }

fn opt_int(n: Option<i64>) -> SqlValue { n.map_or(SqlValue::Null, SqlValue::Integer) }

fn opt_bool(b: Option<bool>) -> SqlValue {
  b.map_or(SqlValue::Null, |b| SqlValue::Integer(i64::from(b)))
}

fn opt_json(v: Option<&Value>) -> Result<SqlValue> {
  Ok(match v {
    Some(v) => SqlValue::Text(encode_json(v)?),
    None => SqlValue::Null,
  })
}

/// One fact row, ready to bind: `key` feeds the existence check, `values`
/// the upsert statement.
pub struct EncodedRow {
  pub key:    Vec<SqlValue>,
  pub values: Vec<SqlValue>,
}

pub fn encode_element(artifact_id: i64, e: &ElementFact, loaded_at: &str) -> Result<EncodedRow> {
  Ok(EncodedRow {
    key:    vec![SqlValue::Integer(artifact_id), text(&e.path)],
    values: vec![
      SqlValue::Integer(artifact_id),
      text(&e.path),
      opt_text(e.element_id.as_deref()),
      opt_int(e.min),
      opt_text(e.max.as_deref()),
      opt_bool(e.must_support),
      opt_bool(e.is_modifier),
      opt_bool(e.is_summary),
      opt_json(e.types.as_ref())?,
      opt_json(e.slicing.as_ref())?,
      SqlValue::Text(encode_json(&e.raw)?),
      text(e.source_choice.as_str()),
      text(loaded_at),
    ],
  })
}

pub fn encode_binding(artifact_id: i64, b: &BindingFact, loaded_at: &str) -> Result<EncodedRow> {
  Ok(EncodedRow {
    key:    vec![SqlValue::Integer(artifact_id), text(&b.path), text(&b.value_set)],
    values: vec![
      SqlValue::Integer(artifact_id),
      text(&b.path),
      text(&b.value_set),
      opt_text(b.strength.as_deref()),
      SqlValue::Text(encode_json(&b.raw)?),
      text(b.source_choice.as_str()),
      text(loaded_at),
    ],
  })
}

pub fn encode_constraint(
  artifact_id: i64,
  c: &ConstraintFact,
  loaded_at: &str,
) -> Result<EncodedRow> {
  Ok(EncodedRow {
    key:    vec![SqlValue::Integer(artifact_id), text(&c.path), text(&c.key)],
    values: vec![
      SqlValue::Integer(artifact_id),
      text(&c.path),
      text(&c.key),
      opt_text(c.severity.as_deref()),
      opt_text(c.human.as_deref()),
      opt_text(c.expression.as_deref()),
      opt_text(c.xpath.as_deref()),
      SqlValue::Text(encode_json(&c.raw)?),
      text(c.source_choice.as_str()),
      text(loaded_at),
    ],
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PACKAGE_COLUMNS: &str = "id, ig, ig_version, imported_at, source_path";

/// Raw values read directly from a `packages` row.
pub struct RawPackage {
  pub id:          i64,
  pub ig:          String,
  pub ig_version:  String,
  pub imported_at: String,
  pub source_path: String,
}

impl RawPackage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      ig:          row.get(1)?,
      ig_version:  row.get(2)?,
      imported_at: row.get(3)?,
      source_path: row.get(4)?,
    })
  }

  pub fn into_package(self) -> Result<Package> {
    Ok(Package {
      id:          self.id,
      ig:          self.ig,
      ig_version:  self.ig_version,
      imported_at: decode_dt(&self.imported_at)?,
      source_path: self.source_path,
    })
  }
}

/// Artifact columns, qualified with the `a` alias used by every query.
pub const ARTIFACT_COLUMNS: &str = "a.id, a.package_id, a.resource_type, a.canonical_url, \
   a.version, a.name, a.title, a.sd_type, a.base_definition, a.file_path, a.sha256, \
   a.indexed_at";

/// Number of columns in [`ARTIFACT_COLUMNS`]; the offset of any joined
/// columns that follow.
pub const ARTIFACT_WIDTH: usize = 12;

/// Raw values read directly from an `artifacts` row.
pub struct RawArtifact {
  pub id:              i64,
  pub package_id:      i64,
  pub resource_type:   String,
  pub canonical_url:   String,
  pub version:         Option<String>,
  pub name:            Option<String>,
  pub title:           Option<String>,
  pub sd_type:         Option<String>,
  pub base_definition: Option<String>,
  pub file_path:       String,
  pub sha256:          String,
  pub indexed_at:      String,
}

impl RawArtifact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      package_id:      row.get(1)?,
      resource_type:   row.get(2)?,
      canonical_url:   row.get(3)?,
      version:         row.get(4)?,
      name:            row.get(5)?,
      title:           row.get(6)?,
      sd_type:         row.get(7)?,
      base_definition: row.get(8)?,
      file_path:       row.get(9)?,
      sha256:          row.get(10)?,
      indexed_at:      row.get(11)?,
    })
  }

  pub fn into_artifact(self) -> Result<Artifact> {
    Ok(Artifact {
      id:              self.id,
      package_id:      self.package_id,
      resource_type:   self.resource_type,
      canonical_url:   self.canonical_url,
      version:         self.version,
      name:            self.name,
      title:           self.title,
      sd_type:         self.sd_type,
      base_definition: self.base_definition,
      file_path:       self.file_path,
      sha256:          self.sha256,
      indexed_at:      decode_dt(&self.indexed_at)?,
    })
  }
}

pub const ELEMENT_COLUMNS: &str = "element_id, path, min, max, must_support, is_modifier, \
   is_summary, types_json, slicing_json, raw_json, source_choice";

pub struct RawElement {
  pub element_id:    Option<String>,
  pub path:          String,
  pub min:           Option<i64>,
  pub max:           Option<String>,
  pub must_support:  Option<bool>,
  pub is_modifier:   Option<bool>,
  pub is_summary:    Option<bool>,
  pub types_json:    Option<String>,
  pub slicing_json:  Option<String>,
  pub raw_json:      String,
  pub source_choice: String,
}

impl RawElement {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      element_id:    row.get(0)?,
      path:          row.get(1)?,
      min:           row.get(2)?,
      max:           row.get(3)?,
      must_support:  row.get(4)?,
      is_modifier:   row.get(5)?,
      is_summary:    row.get(6)?,
      types_json:    row.get(7)?,
      slicing_json:  row.get(8)?,
      raw_json:      row.get(9)?,
      source_choice: row.get(10)?,
    })
  }

  pub fn into_fact(self) -> Result<ElementFact> {
    Ok(ElementFact {
      element_id:    self.element_id,
      path:          self.path,
      min:           self.min,
      max:           self.max,
      must_support:  self.must_support,
      is_modifier:   self.is_modifier,
      is_summary:    self.is_summary,
      types:         decode_opt_json(self.types_json)?,
      slicing:       decode_opt_json(self.slicing_json)?,
      raw:           decode_json(&self.raw_json)?,
      source_choice: decode_source_choice(&self.source_choice)?,
    })
  }
}

pub const BINDING_COLUMNS: &str = "path, strength, value_set, binding_json, source_choice";

pub struct RawBinding {
  pub path:          String,
  pub strength:      Option<String>,
  pub value_set:     String,
  pub binding_json:  String,
  pub source_choice: String,
}

impl RawBinding {
  /// `offset` skips any columns selected ahead of the binding's own.
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      path:          row.get(offset)?,
      strength:      row.get(offset + 1)?,
      value_set:     row.get(offset + 2)?,
      binding_json:  row.get(offset + 3)?,
      source_choice: row.get(offset + 4)?,
    })
  }

  pub fn into_fact(self) -> Result<BindingFact> {
    Ok(BindingFact {
      path:          self.path,
      strength:      self.strength,
      value_set:     self.value_set,
      raw:           decode_json(&self.binding_json)?,
      source_choice: decode_source_choice(&self.source_choice)?,
    })
  }
}

pub const CONSTRAINT_COLUMNS: &str =
  "path, key, severity, human, expression, xpath, constraint_json, source_choice";

pub struct RawConstraint {
  pub path:            String,
  pub key:             String,
  pub severity:        Option<String>,
  pub human:           Option<String>,
  pub expression:      Option<String>,
  pub xpath:           Option<String>,
  pub constraint_json: String,
  pub source_choice:   String,
}

impl RawConstraint {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      path:            row.get(0)?,
      key:             row.get(1)?,
      severity:        row.get(2)?,
      human:           row.get(3)?,
      expression:      row.get(4)?,
      xpath:           row.get(5)?,
      constraint_json: row.get(6)?,
      source_choice:   row.get(7)?,
    })
  }

  pub fn into_fact(self) -> Result<ConstraintFact> {
    Ok(ConstraintFact {
      path:          self.path,
      key:           self.key,
      severity:      self.severity,
      human:         self.human,
      expression:    self.expression,
      xpath:         self.xpath,
      raw:           decode_json(&self.constraint_json)?,
      source_choice: decode_source_choice(&self.source_choice)?,
    })
  }
}
