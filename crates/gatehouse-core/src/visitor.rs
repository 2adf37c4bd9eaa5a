//! Visitor records — the central entity of the gatehouse log.
//!
//! A visitor record is created once at entry, mutated exactly once to close
//! the visit, and immutable thereafter. The entry timestamp is always
//! server-assigned; input types deliberately cannot carry it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of the free-text `observation` field.
pub const OBSERVATION_MAX: usize = 500;
/// Maximum length of the free-text `details` field.
pub const DETAILS_MAX: usize = 300;

// ─── Visitor type ────────────────────────────────────────────────────────────

/// The category of a visitor.
///
/// Declaration order doubles as the tie-break order for the type-distribution
/// analytics: equal counts keep this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitorType {
  PatientVisitor,
  Doctor,
  Supplier,
}

impl VisitorType {
  /// All variants, in declaration order.
  pub const ALL: [VisitorType; 3] =
    [Self::PatientVisitor, Self::Doctor, Self::Supplier];

  /// The discriminant string stored in the `visitor_type` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::PatientVisitor => "patient_visitor",
      Self::Doctor => "doctor",
      Self::Supplier => "supplier",
    }
  }

  /// Human label used by charts and the chat assistant.
  pub fn label(self) -> &'static str {
    match self {
      Self::PatientVisitor => "Patient Visitors",
      Self::Doctor => "Doctors",
      Self::Supplier => "Suppliers",
    }
  }
}

// ─── Visitor ─────────────────────────────────────────────────────────────────

/// A single visit by one person, from entry through (optional) exit.
///
/// The `cin` is the visitor's natural key while the visit is open: at most
/// one record per CIN may have `exited_at == None` at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visitor {
  pub id:           Uuid,
  /// National identity number — exactly 8 digits.
  pub cin:          String,
  pub last_name:    Option<String>,
  pub first_name:   Option<String>,
  /// Fiscal registration — exactly 7 digits followed by one letter.
  pub fiscal_id:    String,
  pub visitor_type: VisitorType,
  /// Server-assigned at creation; never changes.
  pub entered_at:   DateTime<Utc>,
  /// `None` while the visit is open; set exactly once.
  pub exited_at:    Option<DateTime<Utc>>,
  pub observation:  Option<String>,
  pub details:      Option<String>,
  /// Staff member who recorded the entry.
  pub entered_by:   String,
  /// Staff member who recorded the exit; `None` until then.
  pub exited_by:    Option<String>,
}

impl Visitor {
  /// A visit is active (open) while no exit has been recorded.
  pub fn is_active(&self) -> bool { self.exited_at.is_none() }

  /// Elapsed whole minutes between entry and exit, if the visit is closed.
  pub fn duration_minutes(&self) -> Option<i64> {
    self
      .exited_at
      .map(|exit| (exit - self.entered_at).num_minutes())
  }

  /// `"First Last"`, falling back to whichever part is present.
  pub fn display_name(&self) -> String {
    match (self.first_name.as_deref(), self.last_name.as_deref()) {
      (Some(f), Some(l)) => format!("{f} {l}"),
      (Some(f), None) => f.to_owned(),
      (None, Some(l)) => l.to_owned(),
      (None, None) => self.cin.clone(),
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::VisitorService::record_entry`].
///
/// The entry timestamp and acting-user fields are always set by the service;
/// they are not accepted from callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVisitor {
  pub cin:          String,
  pub last_name:    Option<String>,
  pub first_name:   Option<String>,
  pub fiscal_id:    String,
  pub visitor_type: VisitorType,
  pub observation:  Option<String>,
  pub details:      Option<String>,
}

/// Input to [`crate::VisitorService::update`] — the descriptive fields only.
/// Lifecycle fields (timestamps, acting users) are never touched by update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorUpdate {
  pub cin:          String,
  pub last_name:    Option<String>,
  pub first_name:   Option<String>,
  pub fiscal_id:    String,
  pub visitor_type: VisitorType,
  pub observation:  Option<String>,
  pub details:      Option<String>,
}

// ─── Staff ───────────────────────────────────────────────────────────────────

/// A staff member allowed to record entries and exits.
///
/// The password hash is an argon2 PHC string; the core never inspects it
/// beyond passing it to the server's auth layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffUser {
  pub username:      String,
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}
