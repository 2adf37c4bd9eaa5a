//! Analytics engine — the aggregation passes behind the charts and the chat
//! assistant.
//!
//! Every function here is a pure aggregation over an already-filtered slice
//! of visitor records (selected by entry timestamp; see
//! [`crate::filter::DateRange`]). No storage access, no side effects. Empty
//! input is a valid, zero-filled answer, never an error.

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::{
  filter::DateRange,
  visitor::{Visitor, VisitorType},
};

/// Peak-hour range reported for a day without any entries.
pub const NO_ENTRIES: &str = "No entries";

// ─── Entry-time histogram ────────────────────────────────────────────────────

/// One hourly bucket of the entry-time histogram. All 24 buckets are always
/// present, zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryTimeBucket {
  /// `"HH:00-HH:00"`, upper hour mod 24.
  pub time_range: String,
  pub count:      u64,
  /// Coarse period tag: Morning 06-12, Afternoon 12-18, Evening 18-22,
  /// Night otherwise.
  pub label:      String,
}

fn hour_range(hour: u32) -> String {
  format!("{hour:02}:00-{:02}:00", (hour + 1) % 24)
}

fn period_label(hour: u32) -> String {
  let period = match hour {
    6..=11 => "Morning",
    12..=17 => "Afternoon",
    18..=21 => "Evening",
    _ => "Night",
  };
  format!("{period} ({})", hour_range(hour))
}

/// Count entries per hour of day over the given records.
pub fn entry_time_histogram(visitors: &[Visitor]) -> Vec<EntryTimeBucket> {
  let mut counts = [0u64; 24];
  for visitor in visitors {
    counts[visitor.entered_at.hour() as usize] += 1;
  }

  (0u32..24)
    .map(|hour| EntryTimeBucket {
      time_range: hour_range(hour),
      count:      counts[hour as usize],
      label:      period_label(hour),
    })
    .collect()
}

// ─── Visit-duration histogram ────────────────────────────────────────────────

/// One fixed duration bucket. Upper bounds are exclusive: a 30-minute visit
/// belongs to `30-60 min`, not `0-30 min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationBucket {
  pub range:           String,
  pub count:           u64,
  pub label:           String,
  /// Arithmetic mean of the bucket's durations in minutes; 0.0 when empty.
  pub average_minutes: f64,
}

/// `(range key, human label, exclusive upper bound in minutes)`.
const DURATION_BUCKETS: [(&str, &str, i64); 8] = [
  ("0-30 min", "Quick Visit (0-30 min)", 30),
  ("30-60 min", "Short Visit (30-60 min)", 60),
  ("1-2 hours", "Medium Visit (1-2 hours)", 120),
  ("2-4 hours", "Long Visit (2-4 hours)", 240),
  ("4-8 hours", "Extended Visit (4-8 hours)", 480),
  ("8-12 hours", "Half Day (8-12 hours)", 720),
  ("12-24 hours", "Full Day (12-24 hours)", 1440),
  ("24+ hours", "Multi-Day (24+ hours)", i64::MAX),
];

/// Bucket completed visits by elapsed minutes. Records without an exit
/// timestamp are skipped.
pub fn visit_duration_histogram(visitors: &[Visitor]) -> Vec<DurationBucket> {
  let mut totals = [(0u64, 0i64); 8];

  for visitor in visitors {
    let Some(minutes) = visitor.duration_minutes() else { continue };
    let index = DURATION_BUCKETS
      .iter()
      .position(|&(_, _, upper)| minutes < upper)
      .unwrap_or(DURATION_BUCKETS.len() - 1);
    totals[index].0 += 1;
    totals[index].1 += minutes;
  }

  DURATION_BUCKETS
    .iter()
    .zip(totals)
    .map(|(&(range, label, _), (count, sum))| DurationBucket {
      range: range.to_owned(),
      count,
      label: label.to_owned(),
      average_minutes: if count == 0 { 0.0 } else { sum as f64 / count as f64 },
    })
    .collect()
}

// ─── Visitor-type distribution ───────────────────────────────────────────────

/// Count and share of one visitor type. All enum values always appear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSlice {
  pub visitor_type: VisitorType,
  pub count:        u64,
  pub label:        String,
  /// Percentage of the total; 0.0 when the total is 0.
  pub percentage:   f64,
}

/// Count records per visitor type, sorted descending by count. The sort is
/// stable, so equal counts keep enum declaration order.
pub fn visitor_type_distribution(visitors: &[Visitor]) -> Vec<TypeSlice> {
  let total = visitors.len() as u64;

  let mut slices: Vec<TypeSlice> = VisitorType::ALL
    .into_iter()
    .map(|visitor_type| {
      let count = visitors
        .iter()
        .filter(|v| v.visitor_type == visitor_type)
        .count() as u64;
      TypeSlice {
        visitor_type,
        count,
        label: visitor_type.label().to_owned(),
        percentage: if total == 0 {
          0.0
        } else {
          count as f64 * 100.0 / total as f64
        },
      }
    })
    .collect();

  slices.sort_by(|a, b| b.count.cmp(&a.count));
  slices
}

// ─── Daily peak hours ────────────────────────────────────────────────────────

/// The busiest entry hour of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPeakHour {
  pub date:            chrono::NaiveDate,
  /// `"%a %d/%m"`, e.g. `"Mon 06/01"`.
  pub day_label:       String,
  /// `"HH:00-HH:00"`, or [`NO_ENTRIES`] for a day without entries.
  pub peak_hour_range: String,
  pub peak_count:      u64,
  pub total_entries:   u64,
  /// Share of the day's entries that fell in the peak hour.
  pub percentage:      f64,
}

fn day_label(date: chrono::NaiveDate) -> String {
  date.format("%a %d/%m").to_string()
}

/// For each calendar day of `range`, the hour with the most entries.
/// Ties resolve to the lowest hour number.
pub fn daily_peak_hours(
  visitors: &[Visitor],
  range: &DateRange,
) -> Vec<DailyPeakHour> {
  range
    .days()
    .map(|date| {
      let mut counts = [0u64; 24];
      let mut total = 0u64;
      for visitor in visitors {
        if visitor.entered_at.date_naive() == date {
          counts[visitor.entered_at.hour() as usize] += 1;
          total += 1;
        }
      }

      if total == 0 {
        return DailyPeakHour {
          date,
          day_label: day_label(date),
          peak_hour_range: NO_ENTRIES.to_owned(),
          peak_count: 0,
          total_entries: 0,
          percentage: 0.0,
        };
      }

      // Strict comparison keeps the lowest hour on ties.
      let mut peak_hour = 0u32;
      for hour in 1..24u32 {
        if counts[hour as usize] > counts[peak_hour as usize] {
          peak_hour = hour;
        }
      }
      let peak_count = counts[peak_hour as usize];

      DailyPeakHour {
        date,
        day_label: day_label(date),
        peak_hour_range: hour_range(peak_hour),
        peak_count,
        total_entries: total,
        percentage: peak_count as f64 * 100.0 / total as f64,
      }
    })
    .collect()
}

// ─── Average duration per day ────────────────────────────────────────────────

/// Mean visit duration of one calendar day's completed visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAverageDuration {
  pub date:            chrono::NaiveDate,
  pub day_label:       String,
  pub average_minutes: f64,
  pub average_hours:   f64,
  pub visit_count:     u64,
}

/// For each calendar day of `range`, the mean duration of completed visits
/// whose entry fell on that day. Days without completed visits are
/// zero-filled.
pub fn daily_average_durations(
  visitors: &[Visitor],
  range: &DateRange,
) -> Vec<DailyAverageDuration> {
  range
    .days()
    .map(|date| {
      let durations: Vec<i64> = visitors
        .iter()
        .filter(|v| v.entered_at.date_naive() == date)
        .filter_map(Visitor::duration_minutes)
        .collect();

      let visit_count = durations.len() as u64;
      let average_minutes = if durations.is_empty() {
        0.0
      } else {
        durations.iter().sum::<i64>() as f64 / durations.len() as f64
      };

      DailyAverageDuration {
        date,
        day_label: day_label(date),
        average_minutes,
        average_hours: average_minutes / 60.0,
        visit_count,
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
  use uuid::Uuid;

  use super::*;

  fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, hour, min, 0).unwrap()
  }

  fn entry(entered: DateTime<Utc>, visitor_type: VisitorType) -> Visitor {
    Visitor {
      id:           Uuid::new_v4(),
      cin:          "12345678".into(),
      last_name:    None,
      first_name:   None,
      fiscal_id:    "1234567A".into(),
      visitor_type,
      entered_at:   entered,
      exited_at:    None,
      observation:  None,
      details:      None,
      entered_by:   "clerk".into(),
      exited_by:    None,
    }
  }

  fn completed(entered: DateTime<Utc>, minutes: i64) -> Visitor {
    let mut visitor = entry(entered, VisitorType::PatientVisitor);
    visitor.exited_at = Some(entered + Duration::minutes(minutes));
    visitor.exited_by = Some("clerk".into());
    visitor
  }

  // ── Entry-time histogram ──────────────────────────────────────────────────

  #[test]
  fn entry_histogram_has_24_buckets_summing_to_input() {
    let visitors = vec![
      entry(at(6, 9, 15), VisitorType::Doctor),
      entry(at(6, 9, 45), VisitorType::Supplier),
      entry(at(6, 14, 0), VisitorType::PatientVisitor),
      entry(at(7, 23, 59), VisitorType::PatientVisitor),
    ];

    let buckets = entry_time_histogram(&visitors);
    assert_eq!(buckets.len(), 24);
    assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), 4);

    assert_eq!(buckets[9].time_range, "09:00-10:00");
    assert_eq!(buckets[9].count, 2);
    assert_eq!(buckets[9].label, "Morning (09:00-10:00)");
    assert_eq!(buckets[14].label, "Afternoon (14:00-15:00)");
    assert_eq!(buckets[23].time_range, "23:00-00:00");
    assert_eq!(buckets[23].label, "Night (23:00-00:00)");
    assert_eq!(buckets[19].label, "Evening (19:00-20:00)");
  }

  #[test]
  fn entry_histogram_is_zero_filled_for_empty_input() {
    let buckets = entry_time_histogram(&[]);
    assert_eq!(buckets.len(), 24);
    assert!(buckets.iter().all(|b| b.count == 0));
  }

  // ── Duration histogram ────────────────────────────────────────────────────

  #[test]
  fn duration_boundaries_are_exclusive_on_the_upper_end() {
    let visitors = vec![
      completed(at(6, 8, 0), 29),
      completed(at(6, 8, 0), 30),
      completed(at(6, 8, 0), 1439),
      completed(at(6, 8, 0), 1440),
    ];

    let buckets = visit_duration_histogram(&visitors);
    assert_eq!(buckets.len(), 8);

    let by_range = |range: &str| {
      buckets.iter().find(|b| b.range == range).unwrap().count
    };
    assert_eq!(by_range("0-30 min"), 1);
    assert_eq!(by_range("30-60 min"), 1);
    assert_eq!(by_range("12-24 hours"), 1);
    assert_eq!(by_range("24+ hours"), 1);
  }

  #[test]
  fn duration_histogram_reports_means_and_skips_open_visits() {
    let visitors = vec![
      completed(at(6, 8, 0), 10),
      completed(at(6, 9, 0), 20),
      entry(at(6, 10, 0), VisitorType::Doctor), // still open; ignored
    ];

    let buckets = visit_duration_histogram(&visitors);
    let quick = &buckets[0];
    assert_eq!(quick.count, 2);
    assert!((quick.average_minutes - 15.0).abs() < f64::EPSILON);
    assert_eq!(quick.label, "Quick Visit (0-30 min)");

    // Every other bucket is present but empty, with a 0.0 mean.
    assert!(buckets[1..].iter().all(|b| b.count == 0));
    assert!(buckets[1..].iter().all(|b| b.average_minutes == 0.0));
  }

  // ── Type distribution ─────────────────────────────────────────────────────

  #[test]
  fn type_distribution_always_lists_all_types_with_percentages() {
    let visitors = vec![
      entry(at(6, 9, 0), VisitorType::Doctor),
      entry(at(6, 10, 0), VisitorType::Doctor),
      entry(at(6, 11, 0), VisitorType::Supplier),
      entry(at(6, 12, 0), VisitorType::Doctor),
    ];

    let slices = visitor_type_distribution(&visitors);
    assert_eq!(slices.len(), 3);
    assert_eq!(slices[0].visitor_type, VisitorType::Doctor);
    assert_eq!(slices[0].count, 3);
    assert!((slices[0].percentage - 75.0).abs() < 1e-9);
    assert_eq!(slices[1].visitor_type, VisitorType::Supplier);
    assert_eq!(slices[2].visitor_type, VisitorType::PatientVisitor);
    assert_eq!(slices[2].count, 0);

    let sum: f64 = slices.iter().map(|s| s.percentage).sum();
    assert!((sum - 100.0).abs() < 1e-9);
  }

  #[test]
  fn type_distribution_ties_keep_declaration_order() {
    let visitors = vec![
      entry(at(6, 9, 0), VisitorType::Supplier),
      entry(at(6, 10, 0), VisitorType::Doctor),
    ];

    let slices = visitor_type_distribution(&visitors);
    // Doctor and Supplier tie at 1; PatientVisitor trails with 0. Stable
    // sort keeps Doctor before Supplier (declaration order).
    assert_eq!(slices[0].visitor_type, VisitorType::Doctor);
    assert_eq!(slices[1].visitor_type, VisitorType::Supplier);
    assert_eq!(slices[2].visitor_type, VisitorType::PatientVisitor);
  }

  #[test]
  fn type_distribution_of_nothing_is_all_zero() {
    let slices = visitor_type_distribution(&[]);
    assert_eq!(slices.len(), 3);
    assert!(slices.iter().all(|s| s.count == 0 && s.percentage == 0.0));
    // Zero everywhere: declaration order throughout.
    assert_eq!(slices[0].visitor_type, VisitorType::PatientVisitor);
  }

  // ── Daily peak hours ──────────────────────────────────────────────────────

  #[test]
  fn peak_hour_reports_count_total_and_percentage() {
    let visitors = vec![
      entry(at(6, 9, 5), VisitorType::Doctor),
      entry(at(6, 9, 20), VisitorType::Doctor),
      entry(at(6, 9, 40), VisitorType::Supplier),
      entry(at(6, 14, 0), VisitorType::PatientVisitor),
    ];
    let range = DateRange {
      from: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
      to:   NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
    };

    let days = daily_peak_hours(&visitors, &range);
    assert_eq!(days.len(), 1);
    let day = &days[0];
    assert_eq!(day.peak_hour_range, "09:00-10:00");
    assert_eq!(day.peak_count, 3);
    assert_eq!(day.total_entries, 4);
    assert!((day.percentage - 75.0).abs() < 1e-9);
    assert_eq!(day.day_label, "Mon 06/01");
  }

  #[test]
  fn peak_hour_ties_resolve_to_the_lowest_hour() {
    let visitors = vec![
      entry(at(6, 15, 0), VisitorType::Doctor),
      entry(at(6, 8, 0), VisitorType::Doctor),
    ];
    let range = DateRange {
      from: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
      to:   NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
    };

    let days = daily_peak_hours(&visitors, &range);
    assert_eq!(days[0].peak_hour_range, "08:00-09:00");
  }

  #[test]
  fn peak_hour_marks_empty_days_with_the_sentinel() {
    let visitors = vec![entry(at(6, 9, 0), VisitorType::Doctor)];
    let range = DateRange {
      from: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
      to:   NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
    };

    let days = daily_peak_hours(&visitors, &range);
    assert_eq!(days.len(), 2);
    assert_eq!(days[1].peak_hour_range, NO_ENTRIES);
    assert_eq!(days[1].peak_count, 0);
    assert_eq!(days[1].total_entries, 0);
    assert_eq!(days[1].percentage, 0.0);
  }

  // ── Average duration per day ──────────────────────────────────────────────

  #[test]
  fn daily_averages_cover_every_day_and_skip_open_visits() {
    let visitors = vec![
      completed(at(6, 9, 0), 60),
      completed(at(6, 10, 0), 120),
      entry(at(6, 11, 0), VisitorType::Doctor), // open, ignored
      completed(at(7, 9, 0), 30),
    ];
    let range = DateRange {
      from: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
      to:   NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(),
    };

    let days = daily_average_durations(&visitors, &range);
    assert_eq!(days.len(), 3);

    assert_eq!(days[0].visit_count, 2);
    assert!((days[0].average_minutes - 90.0).abs() < 1e-9);
    assert!((days[0].average_hours - 1.5).abs() < 1e-9);

    assert_eq!(days[1].visit_count, 1);
    assert!((days[1].average_minutes - 30.0).abs() < 1e-9);

    assert_eq!(days[2].visit_count, 0);
    assert_eq!(days[2].average_minutes, 0.0);
  }
}
