//! Router configuration, passed in at construction.

use igcat_core::settings::{InferenceSettings, ScopeSettings, Settings};

#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
  /// Inference endpoint for `llm` mode. Without one, `llm` requests always
  /// fall back.
  pub inference:     Option<InferenceSettings>,
  /// Package scope for where-used plans.
  pub default_scope: Option<ScopeSettings>,
}

impl From<&Settings> for RouterConfig {
  fn from(s: &Settings) -> Self {
    Self {
      inference:     s.inference.clone(),
      default_scope: s.default_scope.clone(),
    }
  }
}
