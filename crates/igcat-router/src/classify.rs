//! Deterministic classification: ordered keyword tests over the question.

use crate::{intent::Intent, slots::Slots};

const WHERE_USED: &[&str] = &["where used", "where-used", "where is", "where are", "used where"];
const MUST_SUPPORT: &[&str] = &["must support", "mustsupport", "must-support"];
const BINDINGS: &[&str] = &["binding", "bound to", "value set", "valueset", "terminology"];
const CONSTRAINTS: &[&str] = &["constraint", "invariant"];
const SUMMARY: &[&str] = &["summary", "summarize", "summarise", "overview", "describe"];

/// Map a question to exactly one intent. The first matching rule wins:
///
/// 1. a path slot, or any `.` in the question → element details;
/// 2. a where-used phrase together with a value-set slot → where used;
/// 3. must-support keywords;
/// 4. binding keywords;
/// 5. constraint keywords;
/// 6. summary keywords;
/// 7. otherwise unknown.
pub fn classify(question: &str, slots: &Slots) -> Intent {
  let q = question.to_lowercase();
  let mentions = |words: &[&str]| words.iter().any(|w| q.contains(w));

  if slots.path.is_some() || q.contains('.') {
    Intent::ElementDetails
  } else if slots.value_set.is_some() && mentions(WHERE_USED) && q.contains("used") {
    Intent::WhereUsedValueSet
  } else if mentions(MUST_SUPPORT) {
    Intent::MustSupport
  } else if mentions(BINDINGS) {
    Intent::Bindings
  } else if mentions(CONSTRAINTS) {
    Intent::Constraints
  } else if mentions(SUMMARY) {
    Intent::ProfileSummary
  } else {
    Intent::Unknown
  }
}
