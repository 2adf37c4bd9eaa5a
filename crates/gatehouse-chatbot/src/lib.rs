//! Rule-based chat assistant for the Gatehouse visitor log.
//!
//! Free text goes through the keyword router in [`intent`]; each intent is
//! answered by re-running one of the [`VisitorService`] public operations
//! and formatting the result as text. The assistant holds no state of its
//! own and never touches storage directly.

pub mod intent;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use gatehouse_core::{
  Result, VisitorService,
  analytics::NO_ENTRIES,
  audit::AuditSink,
  filter::{ANALYTICS_LOOKBACK_DAYS, DateRange, VisitFilter},
  store::{UserDirectory, VisitorStore},
  visitor::Visitor,
};

pub use intent::{Confidence, Intent, classify, extract_search_term};

/// At most this many records are spelled out in search/history replies.
const MAX_LISTED: usize = 10;

// ─── Request / reply ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
  pub message:    String,
  pub session_id: Option<String>,
  /// Optional analysis window; defaults to the last 7 days through today.
  pub date_from:  Option<NaiveDate>,
  pub date_to:    Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
  pub reply:       String,
  pub session_id:  Option<String>,
  pub intent:      Intent,
  pub confidence:  Confidence,
  pub suggestions: Vec<String>,
}

fn suggestions(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| (*s).to_owned()).collect()
}

// ─── Assistant ───────────────────────────────────────────────────────────────

/// The chat assistant. Cheap to clone; wraps a shared service handle.
pub struct Chatbot<S, D, A> {
  service: Arc<VisitorService<S, D, A>>,
}

impl<S, D, A> Clone for Chatbot<S, D, A> {
  fn clone(&self) -> Self { Self { service: Arc::clone(&self.service) } }
}

impl<S, D, A> Chatbot<S, D, A>
where
  S: VisitorStore,
  D: UserDirectory,
  A: AuditSink,
{
  pub fn new(service: Arc<VisitorService<S, D, A>>) -> Self {
    Self { service }
  }

  /// Answer one message. Service failures become an apologetic reply; this
  /// method never errors.
  pub async fn respond(&self, request: &ChatRequest) -> ChatReply {
    let (intent, confidence) = classify(&request.message);

    let result = match intent {
      Intent::TodayVisitors => self.today_visitors(request).await,
      Intent::VisitorCount => self.visitor_count(request).await,
      Intent::SearchVisitor => self.search_visitor(request).await,
      Intent::VisitorHistory => self.visitor_history(request).await,
      Intent::TypeAnalysis => self.type_analysis(request).await,
      Intent::EntryTimeAnalysis => self.entry_time_analysis(request).await,
      Intent::DurationAnalysis => self.duration_analysis(request).await,
      Intent::PeakHours => self.peak_hours(request).await,
      Intent::ActiveVisitors => self.active_visitors().await,
      Intent::Help => Ok(help_text()),
      Intent::Unknown => Ok(unknown_text()),
    };

    let (reply, suggestions) = match result {
      Ok(answer) => answer,
      Err(err) => {
        warn!(error = %err, ?intent, "chat handler failed");
        (
          "Sorry, something went wrong while answering that. \
           Please try again."
            .to_owned(),
          suggestions(&["Help"]),
        )
      }
    };

    ChatReply {
      reply,
      session_id: request.session_id.clone(),
      intent,
      confidence,
      suggestions,
    }
  }

  // ── Handlers ──────────────────────────────────────────────────────────────

  async fn today_visitors(
    &self,
    _request: &ChatRequest,
  ) -> Result<(String, Vec<String>)> {
    let today = Utc::now().date_naive();
    let visitors = self
      .service
      .find_filtered(VisitFilter::Any, Some(today), Some(today))
      .await?;

    let total = visitors.len();
    let active = visitors.iter().filter(|v| v.is_active()).count();

    let reply = format!(
      "Visitors today ({}):\n\
       - total: {total}\n\
       - currently on site: {active}\n\
       - already left: {}",
      today.format("%d/%m/%Y"),
      total - active,
    );
    Ok((reply, suggestions(&["Type breakdown", "Peak hours", "Who is still here?"])))
  }

  async fn visitor_count(
    &self,
    request: &ChatRequest,
  ) -> Result<(String, Vec<String>)> {
    // The chat window defaults to the 7-day analytics lookback, not the
    // 30-day listing default, so resolve it here before the listing query.
    let window = DateRange::resolve(
      request.date_from,
      request.date_to,
      ANALYTICS_LOOKBACK_DAYS,
    );
    let visitors = self
      .service
      .find_filtered(VisitFilter::Any, Some(window.from), Some(window.to))
      .await?;

    let total = visitors.len();
    let active = visitors.iter().filter(|v| v.is_active()).count();

    let mut reply = format!(
      "Visitor statistics for the selected period:\n\
       - total: {total}\n\
       - on site: {active}\n\
       - left: {}\n",
      total - active,
    );
    let slices = self
      .service
      .visitor_type_analysis(request.date_from, request.date_to)
      .await?;
    for slice in slices.iter().filter(|s| s.count > 0) {
      reply.push_str(&format!("- {}: {}\n", slice.label, slice.count));
    }
    Ok((reply, suggestions(&["Entry times", "Visit durations"])))
  }

  async fn search_visitor(
    &self,
    request: &ChatRequest,
  ) -> Result<(String, Vec<String>)> {
    let Some(term) = extract_search_term(&request.message) else {
      return Ok((
        "Please give me something to search for — a name, CIN, or fiscal id."
          .to_owned(),
        suggestions(&["Search for <name or CIN>"]),
      ));
    };

    let matches = self.matching_visitors(&term).await?;
    if matches.is_empty() {
      return Ok((
        format!("No visitor matched {term:?}."),
        suggestions(&["How many visitors today?"]),
      ));
    }

    let mut reply =
      format!("Found {} visitor(s) matching {term:?}:\n", matches.len());
    for visitor in matches.iter().take(MAX_LISTED) {
      reply.push_str(&format!(
        "- {} ({}) — {} — entered {}\n",
        visitor.display_name(),
        visitor.cin,
        if visitor.is_active() { "on site" } else { "left" },
        visitor.entered_at.format("%d/%m/%Y %H:%M"),
      ));
    }
    if matches.len() > MAX_LISTED {
      reply.push_str(&format!("... and {} more\n", matches.len() - MAX_LISTED));
    }
    Ok((reply, suggestions(&["Visit history", "Who is still here?"])))
  }

  async fn visitor_history(
    &self,
    request: &ChatRequest,
  ) -> Result<(String, Vec<String>)> {
    let Some(term) = extract_search_term(&request.message) else {
      return Ok((
        "Whose history? Give me a name or a CIN.".to_owned(),
        suggestions(&["History of <name or CIN>"]),
      ));
    };

    let mut visits = self.matching_visitors(&term).await?;
    if visits.is_empty() {
      return Ok((
        format!("No visits on record for {term:?}."),
        suggestions(&["Search for <name or CIN>"]),
      ));
    }
    visits.sort_by(|a, b| b.entered_at.cmp(&a.entered_at));

    let mut reply = format!(
      "History of {} ({}) — {} visit(s):\n",
      visits[0].display_name(),
      visits[0].cin,
      visits.len()
    );
    for (index, visit) in visits.iter().take(MAX_LISTED).enumerate() {
      let close = match (visit.exited_at, visit.duration_minutes()) {
        (Some(exit), Some(minutes)) => {
          format!("left {} ({minutes} min)", exit.format("%H:%M"))
        }
        _ => "still open".to_owned(),
      };
      reply.push_str(&format!(
        "{}. entered {} — {close}\n",
        index + 1,
        visit.entered_at.format("%d/%m/%Y %H:%M"),
      ));
    }
    if visits.len() > MAX_LISTED {
      reply.push_str(&format!("... and {} more\n", visits.len() - MAX_LISTED));
    }
    Ok((reply, suggestions(&["Visit durations", "Type breakdown"])))
  }

  async fn type_analysis(
    &self,
    request: &ChatRequest,
  ) -> Result<(String, Vec<String>)> {
    let slices = self
      .service
      .visitor_type_analysis(request.date_from, request.date_to)
      .await?;

    let total: u64 = slices.iter().map(|s| s.count).sum();
    if total == 0 {
      return Ok((
        "No visits in the selected period.".to_owned(),
        suggestions(&["How many visitors today?"]),
      ));
    }

    let mut reply = "Visitor types in the selected period:\n".to_owned();
    for slice in slices.iter().filter(|s| s.count > 0) {
      reply.push_str(&format!(
        "- {}: {} ({:.1}%)\n",
        slice.label, slice.count, slice.percentage
      ));
    }
    Ok((reply, suggestions(&["Entry times", "Peak hours"])))
  }

  async fn entry_time_analysis(
    &self,
    request: &ChatRequest,
  ) -> Result<(String, Vec<String>)> {
    let buckets = self
      .service
      .entry_time_analysis(request.date_from, request.date_to)
      .await?;

    let total: u64 = buckets.iter().map(|b| b.count).sum();
    if total == 0 {
      return Ok((
        "No entries in the selected period.".to_owned(),
        suggestions(&["How many visitors today?"]),
      ));
    }

    // Busiest bucket; ties keep the earliest hour.
    let peak = buckets
      .iter()
      .max_by(|a, b| a.count.cmp(&b.count).then(b.time_range.cmp(&a.time_range)))
      .map(|b| (b.time_range.clone(), b.count))
      .unwrap_or_default();

    let reply = format!(
      "Entry-time analysis: {total} entries in the period.\n\
       Busiest slot: {} with {} entries.",
      peak.0, peak.1
    );
    Ok((reply, suggestions(&["Peak hours per day", "Visit durations"])))
  }

  async fn duration_analysis(
    &self,
    request: &ChatRequest,
  ) -> Result<(String, Vec<String>)> {
    let buckets = self
      .service
      .visit_duration_analysis(request.date_from, request.date_to)
      .await?;

    let completed: u64 = buckets.iter().map(|b| b.count).sum();
    if completed == 0 {
      return Ok((
        "No completed visits in the selected period.".to_owned(),
        suggestions(&["Who is still here?"]),
      ));
    }

    let mut reply =
      format!("Visit durations ({completed} completed visits):\n");
    for bucket in buckets.iter().filter(|b| b.count > 0) {
      reply.push_str(&format!(
        "- {}: {} (avg {:.0} min)\n",
        bucket.label, bucket.count, bucket.average_minutes
      ));
    }
    Ok((reply, suggestions(&["Type breakdown", "Entry times"])))
  }

  async fn peak_hours(
    &self,
    request: &ChatRequest,
  ) -> Result<(String, Vec<String>)> {
    let days = self
      .service
      .daily_peak_hours(request.date_from, request.date_to)
      .await?;

    let mut reply = "Daily peak hours:\n".to_owned();
    for day in &days {
      if day.peak_hour_range == NO_ENTRIES {
        reply.push_str(&format!("- {}: no entries\n", day.day_label));
      } else {
        reply.push_str(&format!(
          "- {}: {} ({} of {} entries, {:.1}%)\n",
          day.day_label,
          day.peak_hour_range,
          day.peak_count,
          day.total_entries,
          day.percentage,
        ));
      }
    }
    Ok((reply, suggestions(&["Entry times", "How many visitors today?"])))
  }

  async fn active_visitors(&self) -> Result<(String, Vec<String>)> {
    let mut active: Vec<Visitor> = self
      .service
      .find_all()
      .await?
      .into_iter()
      .filter(Visitor::is_active)
      .collect();
    active.sort_by(|a, b| a.entered_at.cmp(&b.entered_at));

    if active.is_empty() {
      return Ok((
        "Nobody is on site right now.".to_owned(),
        suggestions(&["How many visitors today?"]),
      ));
    }

    let mut reply = format!("{} visitor(s) currently on site:\n", active.len());
    for visitor in active.iter().take(MAX_LISTED) {
      reply.push_str(&format!(
        "- {} ({}) — entered {}\n",
        visitor.display_name(),
        visitor.cin,
        visitor.entered_at.format("%d/%m/%Y %H:%M"),
      ));
    }
    if active.len() > MAX_LISTED {
      reply.push_str(&format!("... and {} more\n", active.len() - MAX_LISTED));
    }
    Ok((reply, suggestions(&["Record an exit", "Type breakdown"])))
  }

  /// Case-insensitive match over CIN, fiscal id, and name parts.
  async fn matching_visitors(&self, term: &str) -> Result<Vec<Visitor>> {
    let needle = term.to_lowercase();
    Ok(
      self
        .service
        .find_all()
        .await?
        .into_iter()
        .filter(|v| {
          v.cin.to_lowercase().contains(&needle)
            || v.fiscal_id.to_lowercase().contains(&needle)
            || v
              .last_name
              .as_deref()
              .is_some_and(|n| n.to_lowercase().contains(&needle))
            || v
              .first_name
              .as_deref()
              .is_some_and(|n| n.to_lowercase().contains(&needle))
        })
        .collect(),
    )
  }
}

// ─── Canned texts ────────────────────────────────────────────────────────────

fn help_text() -> (String, Vec<String>) {
  (
    "I can answer questions about the visitor log:\n\
     - visitor counts (today or any period)\n\
     - who is currently on site\n\
     - searches and visit history by name or CIN\n\
     - analytics: visitor types, entry times, visit durations, peak hours"
      .to_owned(),
    suggestions(&[
      "How many visitors today?",
      "Who is still here?",
      "Peak hours",
    ]),
  )
}

fn unknown_text() -> (String, Vec<String>) {
  (
    "I did not understand that. Try asking about visitor counts, \
     who is on site, or one of the analytics views — or say \"help\"."
      .to_owned(),
    suggestions(&["Help", "How many visitors today?"]),
  )
}
