//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (nanosecond
//! precision, `Z` suffix) so that SQL string comparison — the filter queries
//! use `BETWEEN` on these columns — agrees with chronological order. UUIDs
//! are stored as hyphenated lowercase strings; the audit snapshot as compact
//! JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use gatehouse_core::{
  audit::{AuditEntity, AuditOperation, AuditRecord},
  visitor::{StaffUser, Visitor, VisitorType},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── VisitorType ─────────────────────────────────────────────────────────────

pub fn encode_visitor_type(t: VisitorType) -> &'static str { t.as_str() }

pub fn decode_visitor_type(s: &str) -> Result<VisitorType> {
  match s {
    "patient_visitor" => Ok(VisitorType::PatientVisitor),
    "doctor" => Ok(VisitorType::Doctor),
    "supplier" => Ok(VisitorType::Supplier),
    other => Err(Error::Decode(format!("unknown visitor type: {other:?}"))),
  }
}

// ─── Audit discriminants ─────────────────────────────────────────────────────

pub fn decode_audit_entity(s: &str) -> Result<AuditEntity> {
  match s {
    "visitor" => Ok(AuditEntity::Visitor),
    "user" => Ok(AuditEntity::User),
    other => Err(Error::Decode(format!("unknown audit entity: {other:?}"))),
  }
}

pub fn decode_audit_operation(s: &str) -> Result<AuditOperation> {
  match s {
    "create" => Ok(AuditOperation::Create),
    "update" => Ok(AuditOperation::Update),
    "delete" => Ok(AuditOperation::Delete),
    other => Err(Error::Decode(format!("unknown audit operation: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `visitors` row.
pub struct RawVisitor {
  pub visitor_id:   String,
  pub cin:          String,
  pub last_name:    Option<String>,
  pub first_name:   Option<String>,
  pub fiscal_id:    String,
  pub visitor_type: String,
  pub entered_at:   String,
  pub exited_at:    Option<String>,
  pub observation:  Option<String>,
  pub details:      Option<String>,
  pub entered_by:   String,
  pub exited_by:    Option<String>,
}

impl RawVisitor {
  /// Column list matching the field order of [`RawVisitor::from_row`].
  pub const COLUMNS: &'static str = "visitor_id, cin, last_name, first_name, \
     fiscal_id, visitor_type, entered_at, exited_at, observation, details, \
     entered_by, exited_by";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      visitor_id:   row.get(0)?,
      cin:          row.get(1)?,
      last_name:    row.get(2)?,
      first_name:   row.get(3)?,
      fiscal_id:    row.get(4)?,
      visitor_type: row.get(5)?,
      entered_at:   row.get(6)?,
      exited_at:    row.get(7)?,
      observation:  row.get(8)?,
      details:      row.get(9)?,
      entered_by:   row.get(10)?,
      exited_by:    row.get(11)?,
    })
  }

  pub fn into_visitor(self) -> Result<Visitor> {
    Ok(Visitor {
      id:           decode_uuid(&self.visitor_id)?,
      cin:          self.cin,
      last_name:    self.last_name,
      first_name:   self.first_name,
      fiscal_id:    self.fiscal_id,
      visitor_type: decode_visitor_type(&self.visitor_type)?,
      entered_at:   decode_dt(&self.entered_at)?,
      exited_at:    self.exited_at.as_deref().map(decode_dt).transpose()?,
      observation:  self.observation,
      details:      self.details,
      entered_by:   self.entered_by,
      exited_by:    self.exited_by,
    })
  }
}

/// Raw strings read directly from a `staff_users` row.
pub struct RawStaffUser {
  pub username:      String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawStaffUser {
  pub fn into_user(self) -> Result<StaffUser> {
    Ok(StaffUser {
      username:      self.username,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `audit_log` row.
pub struct RawAuditRecord {
  pub audit_id:    String,
  pub entity:      String,
  pub entity_id:   String,
  pub operation:   String,
  pub snapshot:    String,
  pub actor:       Option<String>,
  pub recorded_at: String,
}

impl RawAuditRecord {
  pub fn into_record(self) -> Result<AuditRecord> {
    Ok(AuditRecord {
      audit_id:    decode_uuid(&self.audit_id)?,
      entity:      decode_audit_entity(&self.entity)?,
      entity_id:   self.entity_id,
      operation:   decode_audit_operation(&self.operation)?,
      snapshot:    serde_json::from_str(&self.snapshot)?,
      actor:       self.actor,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
