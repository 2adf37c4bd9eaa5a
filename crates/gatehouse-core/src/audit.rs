//! Audit trail types and the sink trait.
//!
//! Audit events are emitted by the lifecycle service as explicit post-write
//! calls, not as implicit persistence callbacks. The sink is best-effort by
//! contract: a failing sink is logged and never fails the primary operation.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::visitor::{StaffUser, Visitor};

// ─── Event vocabulary ────────────────────────────────────────────────────────

/// Which persisted entity an audit event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditEntity {
  Visitor,
  User,
}

impl AuditEntity {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Visitor => "visitor",
      Self::User => "user",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOperation {
  Create,
  Update,
  Delete,
}

impl AuditOperation {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Create => "create",
      Self::Update => "update",
      Self::Delete => "delete",
    }
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// One audit event, carrying a full JSON snapshot of the entity at event
/// time. The `recorded_at` timestamp is assigned by the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
  pub entity:    AuditEntity,
  pub entity_id: String,
  pub operation: AuditOperation,
  pub snapshot:  serde_json::Value,
  pub actor:     Option<String>,
}

impl AuditEvent {
  pub fn visitor(
    operation: AuditOperation,
    visitor: &Visitor,
    actor: Option<&str>,
  ) -> Result<Self, serde_json::Error> {
    Ok(Self {
      entity:    AuditEntity::Visitor,
      entity_id: visitor.id.to_string(),
      operation,
      snapshot:  serde_json::to_value(visitor)?,
      actor:     actor.map(str::to_owned),
    })
  }

  pub fn user(
    operation: AuditOperation,
    user: &StaffUser,
    actor: Option<&str>,
  ) -> Result<Self, serde_json::Error> {
    Ok(Self {
      entity:    AuditEntity::User,
      entity_id: user.username.clone(),
      operation,
      // StaffUser skips its password hash on serialisation.
      snapshot:  serde_json::to_value(user)?,
      actor:     actor.map(str::to_owned),
    })
  }
}

/// A persisted audit event, as returned when listing the trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
  pub audit_id:    Uuid,
  pub entity:      AuditEntity,
  pub entity_id:   String,
  pub operation:   AuditOperation,
  pub snapshot:    serde_json::Value,
  pub actor:       Option<String>,
  pub recorded_at: DateTime<Utc>,
}

// ─── Sink trait ──────────────────────────────────────────────────────────────

/// Destination for audit events.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait AuditSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append one event. The sink assigns the record id and timestamp.
  fn record(
    &self,
    event: AuditEvent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Most recent events, newest first, optionally restricted to one entity.
  fn recent(
    &self,
    entity: Option<AuditEntity>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<AuditRecord>, Self::Error>> + Send + '_;
}
