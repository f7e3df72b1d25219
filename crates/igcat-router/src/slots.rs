//! Slot extraction: the arguments a question carries.
//!
//! The scanners are first-match pattern tests over whitespace tokens, not a
//! grammar. Caller-supplied hints always take precedence.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

static URL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>()\[\]{}]+"#).expect("valid URL regex"));

/// Arguments for a structured query. Also the shape of caller hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slots {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub canonical: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value_set: Option<String>,
}

impl Slots {
  /// Fill every empty slot from `other`; occupied slots are kept.
  pub fn fill_from(&mut self, other: Slots) {
    fill(&mut self.canonical, other.canonical);
    fill(&mut self.version, other.version);
    fill(&mut self.path, other.path);
    fill(&mut self.value_set, other.value_set);
  }

  /// Drop blank strings so that `Some("")` never counts as a value.
  fn normalised(self) -> Self {
    let keep = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
    Self {
      canonical: keep(self.canonical),
      version:   keep(self.version),
      path:      keep(self.path),
      value_set: keep(self.value_set),
    }
  }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
  if slot.is_none() {
    *slot = value;
  }
}

/// Hints first, then whatever the question itself reveals.
pub fn extract_slots(question: &str, hints: &Slots) -> Slots {
  let mut slots = hints.clone().normalised();
  slots.fill_from(scan(question));
  slots
}

/// Slots found in the question text alone.
pub fn scan(question: &str) -> Slots {
  let mut found = Slots::default();

  for url in URL.find_iter(question).map(|m| trim_url(m.as_str())) {
    if found.canonical.is_none() && url.contains("/StructureDefinition/") {
      let (canonical, version) = split_version(url);
      found.canonical = Some(canonical.to_owned());
      found.version = version.map(str::to_owned);
    } else if found.value_set.is_none() && url.contains("/ValueSet/") {
      let (value_set, _) = split_version(url);
      found.value_set = Some(value_set.to_owned());
    }
  }

  found.path = question
    .split_whitespace()
    .map(|token| token.trim_matches(is_surrounding_punctuation))
    .find(|token| is_element_path(token))
    .map(str::to_owned);

  found
}

fn trim_url(url: &str) -> &str { url.trim_end_matches(['.', ',', ';', ':', '!', '?']) }

/// `canonical|version` → (`canonical`, `Some(version)`).
fn split_version(url: &str) -> (&str, Option<&str>) {
  match url.split_once('|') {
    Some((base, version)) if !version.is_empty() => (base, Some(version)),
    Some((base, _)) => (base, None),
    None => (url, None),
  }
}

fn is_surrounding_punctuation(c: char) -> bool {
  matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '"' | '\'' | '`' | '(' | ')')
}

fn is_element_path(token: &str) -> bool {
  token.contains('.') && token.chars().next().is_some_and(char::is_uppercase)
}
