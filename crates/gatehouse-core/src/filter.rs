//! Filter/query engine — a coarse filter selector plus a calendar-date range,
//! translated into one predicate over visitor records.
//!
//! The filter is a closed tagged enum on purpose: the three semantics the
//! application needs are spelled out here, instead of an open-ended dynamic
//! query builder.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::visitor::Visitor;

/// Default lookback for the general visitor listing.
pub const LISTING_LOOKBACK_DAYS: u64 = 30;
/// Default lookback for the analytics views. Distinct from the listing
/// default; both are load-bearing.
pub const ANALYTICS_LOOKBACK_DAYS: u64 = 7;

// ─── Filter selector ─────────────────────────────────────────────────────────

/// Which records of a date window a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitFilter {
  /// Entered within the window and still on site.
  EnteredOpen,
  /// Entered within the window AND exited within the same window. A visit
  /// that entered before the window and exited inside it does not match.
  ExitedInRange,
  /// Entered within the window OR exited within the window.
  #[default]
  Any,
}

impl VisitFilter {
  pub const ALL: [VisitFilter; 3] =
    [Self::EnteredOpen, Self::ExitedInRange, Self::Any];

  /// The serialised query-parameter form.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::EnteredOpen => "entered_open",
      Self::ExitedInRange => "exited_in_range",
      Self::Any => "any",
    }
  }
}

// ─── Date range ──────────────────────────────────────────────────────────────

/// An inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  pub from: NaiveDate,
  pub to:   NaiveDate,
}

impl DateRange {
  /// Resolve optional caller-supplied bounds against a default lookback
  /// window ending today. The listing and analytics callers pass different
  /// lookbacks; the asymmetry is intentional.
  pub fn resolve(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    lookback_days: u64,
  ) -> Self {
    let today = Utc::now().date_naive();
    Self {
      from: from.unwrap_or(today - Days::new(lookback_days)),
      to:   to.unwrap_or(today),
    }
  }

  /// Expand to the inclusive instant bounds
  /// `[from 00:00:00.000, to 23:59:59.999999999]`.
  pub fn expand(&self) -> (DateTime<Utc>, DateTime<Utc>) {
    (start_of_day(self.from), end_of_day(self.to))
  }

  /// Every calendar day in the range, in order, both ends inclusive.
  pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
    let to = self.to;
    self.from.iter_days().take_while(move |day| *day <= to)
  }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
  date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
  date
    .and_hms_nano_opt(23, 59, 59, 999_999_999)
    .expect("23:59:59.999999999 is a valid time of day")
    .and_utc()
}

// ─── Predicate ───────────────────────────────────────────────────────────────

/// The single place the three filter semantics are defined. Storage backends
/// that translate filters to native queries must match this function.
pub fn matches(filter: VisitFilter, visitor: &Visitor, window: &DateRange) -> bool {
  let (start, end) = window.expand();
  let entered_in_range =
    visitor.entered_at >= start && visitor.entered_at <= end;
  let exited_in_range = visitor
    .exited_at
    .is_some_and(|exit| exit >= start && exit <= end);

  match filter {
    VisitFilter::EnteredOpen => entered_in_range && visitor.exited_at.is_none(),
    VisitFilter::ExitedInRange => entered_in_range && exited_in_range,
    VisitFilter::Any => entered_in_range || exited_in_range,
  }
}
