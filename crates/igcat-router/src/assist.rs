//! Assisted classification through an external inference endpoint.
//!
//! The endpoint's reply is untrusted text. [`validate`] accepts it only when
//! it is one JSON object with an intent from the closed set and a confidence
//! in `[0, 1]`.

use std::{future::Future, time::Duration};

use igcat_core::settings::InferenceSettings;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  Result,
  error::AssistError,
  intent::Intent,
  slots::Slots,
};

// ─── Client ──────────────────────────────────────────────────────────────────

/// A text-generation backend asked for one JSON object per prompt.
pub trait InferenceClient: Send + Sync {
  fn generate<'a>(
    &'a self,
    prompt: &'a str,
  ) -> impl Future<Output = Result<String, AssistError>> + Send + 'a;
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct OllamaClient {
  client:   Client,
  endpoint: String,
  model:    String,
}

impl OllamaClient {
  pub fn new(settings: &InferenceSettings) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_millis(settings.timeout_ms))
      .build()?;
    Ok(Self {
      client,
      endpoint: settings.endpoint.trim_end_matches('/').to_owned(),
      model: settings.model.clone(),
    })
  }
}

#[derive(Deserialize)]
struct GenerateReply {
  #[serde(default)]
  response: Option<String>,
}

impl InferenceClient for OllamaClient {
  async fn generate<'a>(&'a self, prompt: &'a str) -> Result<String, AssistError> {
    let body = json!({
      "model": self.model,
      "prompt": prompt,
      "format": "json",
      "stream": false,
      "options": { "temperature": 0 },
    });

    let resp = self
      .client
      .post(format!("{}/api/generate", self.endpoint))
      .json(&body)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(AssistError::Status(resp.status().as_u16()));
    }
    let reply: GenerateReply = resp.json().await?;
    reply
      .response
      .filter(|r| !r.trim().is_empty())
      .ok_or(AssistError::EmptyReply)
  }
}

// ─── Prompt ──────────────────────────────────────────────────────────────────

/// Instruction sent with every question.
pub fn build_prompt(question: &str, slots: &Slots) -> String {
  let intents: Vec<&str> = Intent::ALL.iter().map(|i| i.as_str()).collect();
  let known = serde_json::to_string(slots).unwrap_or_else(|_| "{}".to_owned());

  format!(
    "You route questions about FHIR implementation guide profiles.\n\
     Reply with exactly one JSON object and nothing else, shaped as\n\
     {{\"intent\": string, \"confidence\": number, \"slots\": {{\"canonical\": string|null, \
     \"version\": string|null, \"path\": string|null, \"value_set\": string|null}}}}.\n\
     intent must be one of: {}.\n\
     confidence is your certainty between 0 and 1.\n\
     Slots already known: {known}\n\
     Question: {question}",
    intents.join(", "),
  )
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// A validated assisted classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
  pub intent:     Intent,
  pub confidence: f64,
  pub slots:      Slots,
}

/// Accept `text` only if it is a JSON object with a known `intent` and a
/// numeric `confidence` in `[0, 1]`. Slot fields that are not strings are
/// ignored.
pub fn validate(text: &str) -> Result<Assessment, AssistError> {
  let value: Value = serde_json::from_str(text.trim()).map_err(AssistError::NotJson)?;
  let obj = value.as_object().ok_or(AssistError::NotObject)?;

  let raw_intent = obj.get("intent").and_then(Value::as_str);
  let intent = raw_intent
    .and_then(|s| s.parse::<Intent>().ok())
    .ok_or_else(|| AssistError::InvalidIntent(raw_intent.map(str::to_owned)))?;

  let confidence = obj
    .get("confidence")
    .and_then(Value::as_f64)
    .filter(|c| (0.0..=1.0).contains(c))
    .ok_or(AssistError::InvalidConfidence)?;

  let slot = |key: &str| {
    obj
      .get("slots")
      .and_then(|s| s.get(key))
      .and_then(Value::as_str)
      .filter(|s| !s.trim().is_empty())
      .map(str::to_owned)
  };

  Ok(Assessment {
    intent,
    confidence,
    slots: Slots {
      canonical: slot("canonical"),
      version:   slot("version"),
      path:      slot("path"),
      value_set: slot("value_set"),
    },
  })
}

/// One round trip: prompt, generate, validate.
pub async fn assess<C: InferenceClient>(
  client: &C,
  question: &str,
  slots: &Slots,
) -> Result<Assessment, AssistError> {
  let prompt = build_prompt(question, slots);
  let text = client.generate(&prompt).await?;
  validate(&text)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_well_formed_reply() {
    let a = validate(
      r#" {"intent": "bindings", "confidence": 0.8,
           "slots": {"path": "Patient.gender", "version": null}} "#,
    )
    .unwrap();
    assert_eq!(a.intent, Intent::Bindings);
    assert_eq!(a.confidence, 0.8);
    assert_eq!(a.slots.path.as_deref(), Some("Patient.gender"));
    assert!(a.slots.version.is_none());
  }

  #[test]
  fn rejects_non_json_and_non_objects() {
    assert!(matches!(validate("sure! here you go"), Err(AssistError::NotJson(_))));
    assert!(matches!(validate("```json\n{}\n```"), Err(AssistError::NotJson(_))));
    assert!(matches!(validate("[1, 2]"), Err(AssistError::NotObject)));
  }

  #[test]
  fn rejects_intent_outside_closed_set() {
    let err = validate(r#"{"intent": "delete_everything", "confidence": 0.9}"#).unwrap_err();
    assert!(matches!(err, AssistError::InvalidIntent(Some(ref s)) if s == "delete_everything"));
    assert!(matches!(
      validate(r#"{"confidence": 0.9}"#),
      Err(AssistError::InvalidIntent(None))
    ));
  }

  #[test]
  fn rejects_bad_confidence() {
    for reply in [
      r#"{"intent": "bindings"}"#,
      r#"{"intent": "bindings", "confidence": 1.5}"#,
      r#"{"intent": "bindings", "confidence": -0.1}"#,
      r#"{"intent": "bindings", "confidence": "high"}"#,
    ] {
      assert!(matches!(validate(reply), Err(AssistError::InvalidConfidence)), "{reply}");
    }
    assert!(validate(r#"{"intent": "unknown", "confidence": 0}"#).is_ok());
    assert!(validate(r#"{"intent": "unknown", "confidence": 1}"#).is_ok());
  }

  #[test]
  fn prompt_lists_every_intent() {
    let prompt = build_prompt("What is bound to Patient.gender?", &Slots::default());
    for intent in Intent::ALL {
      assert!(prompt.contains(intent.as_str()));
    }
    assert!(prompt.ends_with("Question: What is bound to Patient.gender?"));
  }
}
