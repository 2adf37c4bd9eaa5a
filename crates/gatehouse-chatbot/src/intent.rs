//! Intent classification — an ordered keyword dispatch table.
//!
//! The assistant is a fixed keyword router, not an NLP system: the first
//! rule whose keyword list matches the lowercased message wins. Rule order
//! is therefore part of the behaviour (e.g. "today" outranks the generic
//! count keywords).

use serde::{Deserialize, Serialize};

/// The canned question a message maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
  TodayVisitors,
  VisitorCount,
  SearchVisitor,
  VisitorHistory,
  TypeAnalysis,
  EntryTimeAnalysis,
  DurationAnalysis,
  PeakHours,
  ActiveVisitors,
  Help,
  Unknown,
}

/// How confident the classifier is in its routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
  High,
  Medium,
  Low,
}

/// First-match-wins rules. Each entry: intent, confidence, trigger keywords.
const RULES: &[(Intent, Confidence, &[&str])] = &[
  (Intent::TodayVisitors, Confidence::High, &["today", "aujourd"]),
  (
    Intent::ActiveVisitors,
    Confidence::High,
    &["active", "still here", "on site", "present", "currently inside"],
  ),
  (
    Intent::PeakHours,
    Confidence::High,
    &["peak", "busiest", "rush hour"],
  ),
  (
    Intent::EntryTimeAnalysis,
    Confidence::High,
    &["entry time", "arrival", "what time", "entry hour", "when do"],
  ),
  (
    Intent::DurationAnalysis,
    Confidence::High,
    &["duration", "how long", "length of stay", "time spent"],
  ),
  (
    Intent::TypeAnalysis,
    Confidence::High,
    &["type", "breakdown", "doctor", "supplier", "patient", "category"],
  ),
  (
    Intent::VisitorHistory,
    Confidence::Medium,
    &["history", "how often", "previous visits", "past visits"],
  ),
  (
    Intent::SearchVisitor,
    Confidence::Medium,
    &["search", "find", "look up", "lookup", "cin"],
  ),
  (
    Intent::VisitorCount,
    Confidence::High,
    &["how many", "count", "number of", "total", "visitors"],
  ),
  (
    Intent::Help,
    Confidence::High,
    &["help", "what can you", "capabilities"],
  ),
];

/// Route a free-text message to an intent.
pub fn classify(message: &str) -> (Intent, Confidence) {
  let message = message.to_lowercase();
  for &(intent, confidence, keywords) in RULES {
    if keywords.iter().any(|kw| message.contains(kw)) {
      return (intent, confidence);
    }
  }
  (Intent::Unknown, Confidence::Low)
}

/// Pull a search term out of a search/history request: everything after a
/// "for"/"of" connective, or the final word as a fallback.
pub fn extract_search_term(message: &str) -> Option<String> {
  let message = message.trim();
  for connective in [" for ", " of ", " named ", " called "] {
    if let Some(pos) = message.to_lowercase().find(connective) {
      let term = message[pos + connective.len()..]
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation());
      if !term.is_empty() {
        return Some(term.to_owned());
      }
    }
  }
  // Fall back to the last word when the message has more than one.
  let mut words = message.split_whitespace().rev();
  let last = words.next()?;
  words.next()?;
  let term = last.trim_matches(|c: char| c.is_ascii_punctuation());
  (!term.is_empty()).then(|| term.to_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn routes_common_phrasings() {
    assert_eq!(classify("How many visitors today?").0, Intent::TodayVisitors);
    assert_eq!(classify("how many visitors this week").0, Intent::VisitorCount);
    assert_eq!(classify("who is still here?").0, Intent::ActiveVisitors);
    assert_eq!(classify("what is the peak hour").0, Intent::PeakHours);
    assert_eq!(classify("show the entry time chart").0, Intent::EntryTimeAnalysis);
    assert_eq!(classify("average visit duration").0, Intent::DurationAnalysis);
    assert_eq!(classify("breakdown by visitor type").0, Intent::TypeAnalysis);
    assert_eq!(classify("visit history for 12345678").0, Intent::VisitorHistory);
    assert_eq!(classify("search for Ben Salah").0, Intent::SearchVisitor);
    assert_eq!(classify("help").0, Intent::Help);
  }

  #[test]
  fn unmatched_messages_fall_through_to_unknown() {
    let (intent, confidence) = classify("xyzzy plugh");
    assert_eq!(intent, Intent::Unknown);
    assert_eq!(confidence, Confidence::Low);
  }

  #[test]
  fn rule_order_gives_today_priority_over_count() {
    // Contains both "today" and "how many"; "today" rule is evaluated first.
    let (intent, _) = classify("how many visitors came today");
    assert_eq!(intent, Intent::TodayVisitors);
  }

  #[test]
  fn search_terms_are_extracted_after_connectives() {
    assert_eq!(
      extract_search_term("search for Ben Salah").as_deref(),
      Some("Ben Salah")
    );
    assert_eq!(
      extract_search_term("history of 12345678").as_deref(),
      Some("12345678")
    );
    assert_eq!(
      extract_search_term("find 12345678").as_deref(),
      Some("12345678")
    );
    assert_eq!(extract_search_term("search"), None);
  }
}
