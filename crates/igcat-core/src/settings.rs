//! Runtime settings shared by the server and CLI binaries.
//!
//! Deserialised by the binaries from an optional TOML file layered under
//! `IGCAT_*` environment variables (see the `config` crate).

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_database_path")]
  pub database_path: PathBuf,
  #[serde(default = "default_host")]
  pub host:          String,
  #[serde(default = "default_port")]
  pub port:          u16,
  /// Assisted classification is unavailable when this is absent.
  #[serde(default)]
  pub inference:     Option<InferenceSettings>,
  /// Package searched by where-used questions that name no IG.
  #[serde(default)]
  pub default_scope: Option<ScopeSettings>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      database_path: default_database_path(),
      host:          default_host(),
      port:          default_port(),
      inference:     None,
      default_scope: None,
    }
  }
}

/// An Ollama-compatible text generation endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceSettings {
  /// Base URL, e.g. `http://127.0.0.1:11434`.
  pub endpoint:   String,
  pub model:      String,
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScopeSettings {
  pub ig:         String,
  pub ig_version: String,
}

fn default_database_path() -> PathBuf { PathBuf::from("igcat.sqlite3") }

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8000 }

fn default_timeout_ms() -> u64 { 8000 }
