//! [`SqliteStore`] — the SQLite implementation of the `gatehouse-core`
//! storage traits.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use gatehouse_core::{
  audit::{AuditEntity, AuditEvent, AuditRecord, AuditSink},
  filter::{DateRange, VisitFilter},
  store::{UserDirectory, VisitorStore},
  visitor::{StaffUser, Visitor},
};

use crate::{
  Error, Result,
  encode::{
    RawAuditRecord, RawStaffUser, RawVisitor, encode_dt, encode_uuid,
    encode_visitor_type,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Gatehouse store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// `true` when the backend rejected a write on a uniqueness constraint.
fn is_constraint_violation(err: &tokio_rusqlite::Error) -> bool {
  matches!(
    err,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
      if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch visitors with a fixed WHERE clause over `(start, end)` bounds.
  async fn select_visitors(
    &self,
    where_clause: &'static str,
    window: &DateRange,
  ) -> Result<Vec<Visitor>> {
    let (start, end) = window.expand();
    let start_str = encode_dt(start);
    let end_str = encode_dt(end);

    let raws: Vec<RawVisitor> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM visitors WHERE {where_clause}",
          RawVisitor::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![start_str, end_str], RawVisitor::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVisitor::into_visitor).collect()
  }
}

// ─── VisitorStore impl ───────────────────────────────────────────────────────

impl VisitorStore for SqliteStore {
  type Error = Error;

  fn insert_visitor(
    &self,
    visitor: &Visitor,
  ) -> impl std::future::Future<Output = Result<()>> + Send + '_ {
    let id_str = encode_uuid(visitor.id);
    let cin = visitor.cin.clone();
    let cin_param = cin.clone();
    let last_name = visitor.last_name.clone();
    let first_name = visitor.first_name.clone();
    let fiscal_id = visitor.fiscal_id.clone();
    let type_str = encode_visitor_type(visitor.visitor_type).to_owned();
    let entered_str = encode_dt(visitor.entered_at);
    let exited_str = visitor.exited_at.map(encode_dt);
    let observation = visitor.observation.clone();
    let details = visitor.details.clone();
    let entered_by = visitor.entered_by.clone();
    let exited_by = visitor.exited_by.clone();

    async move {
      let result = self
        .conn
        .call(move |conn| {
          conn.execute(
            "INSERT INTO visitors (
               visitor_id, cin, last_name, first_name, fiscal_id, visitor_type,
               entered_at, exited_at, observation, details, entered_by, exited_by
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
              id_str,
              cin_param,
              last_name,
              first_name,
              fiscal_id,
              type_str,
              entered_str,
              exited_str,
              observation,
              details,
              entered_by,
              exited_by,
            ],
          )?;
          Ok(())
        })
        .await;

      match result {
        Ok(()) => Ok(()),
        // The only uniqueness constraint reachable from an insert with a fresh
        // UUID is the partial index on open visits.
        Err(err) if is_constraint_violation(&err) => {
          Err(Error::ActiveCinConstraint(cin))
        }
        Err(err) => Err(err.into()),
      }
    }
  }

  fn update_visitor(
    &self,
    visitor: &Visitor,
  ) -> impl std::future::Future<Output = Result<()>> + Send + '_ {
    let id_str = encode_uuid(visitor.id);
    let cin = visitor.cin.clone();
    let last_name = visitor.last_name.clone();
    let first_name = visitor.first_name.clone();
    let fiscal_id = visitor.fiscal_id.clone();
    let type_str = encode_visitor_type(visitor.visitor_type).to_owned();
    let entered_str = encode_dt(visitor.entered_at);
    let exited_str = visitor.exited_at.map(encode_dt);
    let observation = visitor.observation.clone();
    let details = visitor.details.clone();
    let entered_by = visitor.entered_by.clone();
    let exited_by = visitor.exited_by.clone();

    async move {
      self
        .conn
        .call(move |conn| {
          conn.execute(
            "UPDATE visitors SET
               cin = ?2, last_name = ?3, first_name = ?4, fiscal_id = ?5,
               visitor_type = ?6, entered_at = ?7, exited_at = ?8,
               observation = ?9, details = ?10, entered_by = ?11, exited_by = ?12
             WHERE visitor_id = ?1",
            rusqlite::params![
              id_str,
              cin,
              last_name,
              first_name,
              fiscal_id,
              type_str,
              entered_str,
              exited_str,
              observation,
              details,
              entered_by,
              exited_by,
            ],
          )?;
          Ok(())
        })
        .await?;
      Ok(())
    }
  }

  async fn delete_visitor(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        let rows = conn.execute(
          "DELETE FROM visitors WHERE visitor_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(rows > 0)
      })
      .await?;
    Ok(deleted)
  }

  async fn get_visitor(&self, id: Uuid) -> Result<Option<Visitor>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawVisitor> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM visitors WHERE visitor_id = ?1",
          RawVisitor::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawVisitor::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVisitor::into_visitor).transpose()
  }

  async fn find_active_by_cin(&self, cin: &str) -> Result<Option<Visitor>> {
    let cin_str = cin.to_owned();

    let raw: Option<RawVisitor> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM visitors WHERE cin = ?1 AND exited_at IS NULL",
          RawVisitor::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![cin_str], RawVisitor::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVisitor::into_visitor).transpose()
  }

  async fn list_all(&self) -> Result<Vec<Visitor>> {
    let raws: Vec<RawVisitor> = self
      .conn
      .call(|conn| {
        let sql = format!("SELECT {} FROM visitors", RawVisitor::COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawVisitor::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVisitor::into_visitor).collect()
  }

  async fn list_filtered(
    &self,
    filter: VisitFilter,
    window: &DateRange,
  ) -> Result<Vec<Visitor>> {
    // One static WHERE clause per filter variant, mirroring
    // `gatehouse_core::filter::matches`.
    let where_clause = match filter {
      VisitFilter::EnteredOpen => {
        "entered_at BETWEEN ?1 AND ?2 AND exited_at IS NULL"
      }
      VisitFilter::ExitedInRange => {
        "entered_at BETWEEN ?1 AND ?2
           AND exited_at IS NOT NULL AND exited_at BETWEEN ?1 AND ?2"
      }
      VisitFilter::Any => {
        "entered_at BETWEEN ?1 AND ?2
           OR (exited_at IS NOT NULL AND exited_at BETWEEN ?1 AND ?2)"
      }
    };
    self.select_visitors(where_clause, window).await
  }

  async fn list_entered_between(
    &self,
    window: &DateRange,
  ) -> Result<Vec<Visitor>> {
    self
      .select_visitors("entered_at BETWEEN ?1 AND ?2", window)
      .await
  }
}

// ─── UserDirectory impl ──────────────────────────────────────────────────────

impl UserDirectory for SqliteStore {
  type Error = Error;

  fn add_user(
    &self,
    user: &StaffUser,
  ) -> impl std::future::Future<Output = Result<()>> + Send + '_ {
    let username = user.username.clone();
    let username_param = username.clone();
    let password_hash = user.password_hash.clone();
    let created_str = encode_dt(user.created_at);

    async move {
      let result = self
        .conn
        .call(move |conn| {
          conn.execute(
            "INSERT INTO staff_users (username, password_hash, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![username_param, password_hash, created_str],
          )?;
          Ok(())
        })
        .await;

      match result {
        Ok(()) => Ok(()),
        Err(err) if is_constraint_violation(&err) => {
          Err(Error::UserExists(username))
        }
        Err(err) => Err(err.into()),
      }
    }
  }

  async fn find_user(&self, username: &str) -> Result<Option<StaffUser>> {
    let username_str = username.to_owned();

    let raw: Option<RawStaffUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT username, password_hash, created_at
               FROM staff_users WHERE username = ?1",
              rusqlite::params![username_str],
              |row| {
                Ok(RawStaffUser {
                  username:      row.get(0)?,
                  password_hash: row.get(1)?,
                  created_at:    row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStaffUser::into_user).transpose()
  }

  async fn user_exists(&self, username: &str) -> Result<bool> {
    let username_str = username.to_owned();

    let exists = self
      .conn
      .call(move |conn| {
        let found: bool = conn
          .query_row(
            "SELECT 1 FROM staff_users WHERE username = ?1",
            rusqlite::params![username_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(found)
      })
      .await?;
    Ok(exists)
  }
}

// ─── AuditSink impl ──────────────────────────────────────────────────────────

impl AuditSink for SqliteStore {
  type Error = Error;

  async fn record(&self, event: AuditEvent) -> Result<()> {
    let audit_id_str = encode_uuid(Uuid::new_v4());
    let entity_str = event.entity.as_str().to_owned();
    let entity_id = event.entity_id;
    let operation_str = event.operation.as_str().to_owned();
    let snapshot_str = event.snapshot.to_string();
    let actor = event.actor;
    let recorded_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO audit_log (
             audit_id, entity, entity_id, operation, snapshot, actor,
             recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            audit_id_str,
            entity_str,
            entity_id,
            operation_str,
            snapshot_str,
            actor,
            recorded_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn recent(
    &self,
    entity: Option<AuditEntity>,
    limit: usize,
  ) -> Result<Vec<AuditRecord>> {
    let entity_str = entity.map(|e| e.as_str().to_owned());
    let limit_val = limit as i64;

    let raws: Vec<RawAuditRecord> = self
      .conn
      .call(move |conn| {
        let sql = if entity_str.is_some() {
          "SELECT audit_id, entity, entity_id, operation, snapshot, actor,
                  recorded_at
           FROM audit_log WHERE entity = ?1
           ORDER BY recorded_at DESC, audit_id DESC LIMIT ?2"
        } else {
          "SELECT audit_id, entity, entity_id, operation, snapshot, actor,
                  recorded_at
           FROM audit_log WHERE ?1 IS NULL
           ORDER BY recorded_at DESC, audit_id DESC LIMIT ?2"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![entity_str.as_deref(), limit_val],
            |row| {
              Ok(RawAuditRecord {
                audit_id:    row.get(0)?,
                entity:      row.get(1)?,
                entity_id:   row.get(2)?,
                operation:   row.get(3)?,
                snapshot:    row.get(4)?,
                actor:       row.get(5)?,
                recorded_at: row.get(6)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuditRecord::into_record).collect()
  }
}
