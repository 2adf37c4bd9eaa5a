//! [`VisitorService`] — the visitor lifecycle and analytics engine.
//!
//! One explicitly constructed service instance owns the business rules:
//! acting-user validation, CIN/fiscal-id formats, the single-active-visit
//! invariant, the entry/exit transitions, and the date-windowed analytics.
//! Storage, the user directory, and the audit sink are injected.

use std::sync::{Arc, LazyLock};

use chrono::{NaiveDate, Utc};
use regex::Regex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  analytics::{
    self, DailyAverageDuration, DailyPeakHour, DurationBucket,
    EntryTimeBucket, TypeSlice,
  },
  audit::{AuditEntity, AuditEvent, AuditOperation, AuditRecord, AuditSink},
  error::{Error, Result},
  filter::{
    ANALYTICS_LOOKBACK_DAYS, DateRange, LISTING_LOOKBACK_DAYS, VisitFilter,
  },
  store::{UserDirectory, VisitorStore},
  visitor::{
    DETAILS_MAX, NewVisitor, OBSERVATION_MAX, StaffUser, Visitor,
    VisitorUpdate,
  },
};

static CIN_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\d{8}$").expect("valid CIN pattern"));
static FISCAL_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^\d{7}[A-Za-z]$").expect("valid fiscal-id pattern")
});

// ─── Service ─────────────────────────────────────────────────────────────────

/// The lifecycle and analytics engine. Cheap to clone; all collaborators are
/// reference-counted.
pub struct VisitorService<S, D, A> {
  store: Arc<S>,
  users: Arc<D>,
  audit: Arc<A>,
}

impl<S, D, A> Clone for VisitorService<S, D, A> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      users: Arc::clone(&self.users),
      audit: Arc::clone(&self.audit),
    }
  }
}

impl<S, D, A> VisitorService<S, D, A>
where
  S: VisitorStore,
  D: UserDirectory,
  A: AuditSink,
{
  pub fn new(store: Arc<S>, users: Arc<D>, audit: Arc<A>) -> Self {
    Self { store, users, audit }
  }

  // ── Validation ────────────────────────────────────────────────────────────

  async fn validate_user(&self, username: &str) -> Result<()> {
    if username.trim().is_empty() {
      return Err(Error::MissingUser);
    }
    let known = self
      .users
      .user_exists(username)
      .await
      .map_err(Error::storage)?;
    if !known {
      return Err(Error::UnknownUser(username.to_owned()));
    }
    Ok(())
  }

  fn validate_formats(
    cin: &str,
    fiscal_id: &str,
    observation: Option<&str>,
    details: Option<&str>,
  ) -> Result<()> {
    if !CIN_PATTERN.is_match(cin) {
      return Err(Error::InvalidCin(cin.to_owned()));
    }
    if !FISCAL_ID_PATTERN.is_match(fiscal_id) {
      return Err(Error::InvalidFiscalId(fiscal_id.to_owned()));
    }
    if observation.is_some_and(|text| text.chars().count() > OBSERVATION_MAX) {
      return Err(Error::FieldTooLong {
        field: "observation",
        max:   OBSERVATION_MAX,
      });
    }
    if details.is_some_and(|text| text.chars().count() > DETAILS_MAX) {
      return Err(Error::FieldTooLong { field: "details", max: DETAILS_MAX });
    }
    Ok(())
  }

  // ── Audit emission ────────────────────────────────────────────────────────

  /// Best-effort by contract: failures are logged, never propagated.
  async fn emit_audit(&self, event: Result<AuditEvent, serde_json::Error>) {
    match event {
      Ok(event) => {
        if let Err(err) = self.audit.record(event).await {
          warn!(error = %err, "audit sink rejected event");
        }
      }
      Err(err) => warn!(error = %err, "could not serialise audit snapshot"),
    }
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  /// Register a visitor entry. The entry timestamp is always the current
  /// instant; any timestamp a caller might try to supply has no channel in
  /// [`NewVisitor`].
  pub async fn record_entry(
    &self,
    new: NewVisitor,
    acting_user: &str,
  ) -> Result<Visitor> {
    debug!(cin = %new.cin, user = acting_user, "recording visitor entry");

    self.validate_user(acting_user).await?;
    Self::validate_formats(
      &new.cin,
      &new.fiscal_id,
      new.observation.as_deref(),
      new.details.as_deref(),
    )?;

    // Pre-insert check so the caller gets the conflicting record's id; the
    // storage constraint on open visits backstops concurrent entries.
    if let Some(active) = self
      .store
      .find_active_by_cin(&new.cin)
      .await
      .map_err(Error::storage)?
    {
      return Err(Error::CinAlreadyActive {
        cin:            new.cin,
        conflicting_id: active.id,
      });
    }

    let visitor = Visitor {
      id:           Uuid::new_v4(),
      cin:          new.cin,
      last_name:    new.last_name,
      first_name:   new.first_name,
      fiscal_id:    new.fiscal_id,
      visitor_type: new.visitor_type,
      entered_at:   Utc::now(),
      exited_at:    None,
      observation:  new.observation,
      details:      new.details,
      entered_by:   acting_user.to_owned(),
      exited_by:    None,
    };

    if let Err(err) = self.store.insert_visitor(&visitor).await {
      // A concurrent entry may have taken the CIN between the check and the
      // insert and tripped the storage constraint; re-read so the caller
      // sees the conflict, not a raw storage error.
      if let Ok(Some(active)) =
        self.store.find_active_by_cin(&visitor.cin).await
        && active.id != visitor.id
      {
        return Err(Error::CinAlreadyActive {
          cin:            visitor.cin,
          conflicting_id: active.id,
        });
      }
      return Err(Error::storage(err));
    }

    self
      .emit_audit(AuditEvent::visitor(
        AuditOperation::Create,
        &visitor,
        Some(acting_user),
      ))
      .await;

    Ok(visitor)
  }

  /// Close an open visit. Fails with [`Error::AlreadyExited`] if the exit
  /// was already recorded — an exit happens exactly once.
  pub async fn record_exit(
    &self,
    id: Uuid,
    acting_user: &str,
  ) -> Result<Visitor> {
    debug!(visitor = %id, user = acting_user, "recording visitor exit");

    self.validate_user(acting_user).await?;

    let mut visitor = self
      .store
      .get_visitor(id)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::VisitorNotFound(id))?;

    if visitor.exited_at.is_some() {
      return Err(Error::AlreadyExited(id));
    }

    visitor.exited_at = Some(Utc::now());
    visitor.exited_by = Some(acting_user.to_owned());

    self
      .store
      .update_visitor(&visitor)
      .await
      .map_err(Error::storage)?;

    self
      .emit_audit(AuditEvent::visitor(
        AuditOperation::Update,
        &visitor,
        Some(acting_user),
      ))
      .await;

    Ok(visitor)
  }

  /// Overwrite the descriptive fields of a record. Formats are re-validated;
  /// active-CIN uniqueness is not re-checked because update never touches
  /// the lifecycle fields and so cannot open a second visit.
  pub async fn update(
    &self,
    id: Uuid,
    update: VisitorUpdate,
  ) -> Result<Visitor> {
    debug!(visitor = %id, "updating visitor record");

    Self::validate_formats(
      &update.cin,
      &update.fiscal_id,
      update.observation.as_deref(),
      update.details.as_deref(),
    )?;

    let mut visitor = self
      .store
      .get_visitor(id)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::VisitorNotFound(id))?;

    visitor.cin = update.cin;
    visitor.last_name = update.last_name;
    visitor.first_name = update.first_name;
    visitor.fiscal_id = update.fiscal_id;
    visitor.visitor_type = update.visitor_type;
    visitor.observation = update.observation;
    visitor.details = update.details;

    self
      .store
      .update_visitor(&visitor)
      .await
      .map_err(Error::storage)?;

    self
      .emit_audit(AuditEvent::visitor(AuditOperation::Update, &visitor, None))
      .await;

    Ok(visitor)
  }

  /// Administrative removal of a record.
  pub async fn delete(&self, id: Uuid) -> Result<()> {
    debug!(visitor = %id, "deleting visitor record");

    let visitor = self
      .store
      .get_visitor(id)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::VisitorNotFound(id))?;

    self
      .store
      .delete_visitor(id)
      .await
      .map_err(Error::storage)?;

    self
      .emit_audit(AuditEvent::visitor(AuditOperation::Delete, &visitor, None))
      .await;

    Ok(())
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  pub async fn find_one(&self, id: Uuid) -> Result<Visitor> {
    self
      .store
      .get_visitor(id)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::VisitorNotFound(id))
  }

  pub async fn find_all(&self) -> Result<Vec<Visitor>> {
    self.store.list_all().await.map_err(Error::storage)
  }

  /// Filtered listing; defaults to the last 30 days through today.
  pub async fn find_filtered(
    &self,
    filter: VisitFilter,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
  ) -> Result<Vec<Visitor>> {
    let window =
      DateRange::resolve(date_from, date_to, LISTING_LOOKBACK_DAYS);
    self
      .store
      .list_filtered(filter, &window)
      .await
      .map_err(Error::storage)
  }

  // ── Analytics ─────────────────────────────────────────────────────────────
  //
  // All five default to the last 7 days through today — deliberately
  // narrower than the listing default.

  async fn entered_in_window(
    &self,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
  ) -> Result<(Vec<Visitor>, DateRange)> {
    let window =
      DateRange::resolve(date_from, date_to, ANALYTICS_LOOKBACK_DAYS);
    let visitors = self
      .store
      .list_entered_between(&window)
      .await
      .map_err(Error::storage)?;
    Ok((visitors, window))
  }

  pub async fn entry_time_analysis(
    &self,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
  ) -> Result<Vec<EntryTimeBucket>> {
    let (visitors, _) = self.entered_in_window(date_from, date_to).await?;
    Ok(analytics::entry_time_histogram(&visitors))
  }

  pub async fn visit_duration_analysis(
    &self,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
  ) -> Result<Vec<DurationBucket>> {
    let (visitors, _) = self.entered_in_window(date_from, date_to).await?;
    Ok(analytics::visit_duration_histogram(&visitors))
  }

  pub async fn visitor_type_analysis(
    &self,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
  ) -> Result<Vec<TypeSlice>> {
    let (visitors, _) = self.entered_in_window(date_from, date_to).await?;
    Ok(analytics::visitor_type_distribution(&visitors))
  }

  pub async fn daily_peak_hours(
    &self,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
  ) -> Result<Vec<DailyPeakHour>> {
    let (visitors, window) =
      self.entered_in_window(date_from, date_to).await?;
    Ok(analytics::daily_peak_hours(&visitors, &window))
  }

  pub async fn average_visit_duration_analysis(
    &self,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
  ) -> Result<Vec<DailyAverageDuration>> {
    let (visitors, window) =
      self.entered_in_window(date_from, date_to).await?;
    Ok(analytics::daily_average_durations(&visitors, &window))
  }

  // ── Staff users ───────────────────────────────────────────────────────────

  /// Register a staff user. `password_hash` must already be an argon2 PHC
  /// string; the service never sees plaintext passwords.
  pub async fn add_staff_user(
    &self,
    username: &str,
    password_hash: &str,
  ) -> Result<StaffUser> {
    if username.trim().is_empty() {
      return Err(Error::MissingUser);
    }
    if self
      .users
      .user_exists(username)
      .await
      .map_err(Error::storage)?
    {
      return Err(Error::UserAlreadyExists(username.to_owned()));
    }

    let user = StaffUser {
      username:      username.to_owned(),
      password_hash: password_hash.to_owned(),
      created_at:    Utc::now(),
    };
    self.users.add_user(&user).await.map_err(Error::storage)?;

    self
      .emit_audit(AuditEvent::user(AuditOperation::Create, &user, None))
      .await;

    Ok(user)
  }

  // ── Audit trail ───────────────────────────────────────────────────────────

  /// Recent audit events, newest first.
  pub async fn recent_audit(
    &self,
    entity: Option<AuditEntity>,
    limit: usize,
  ) -> Result<Vec<AuditRecord>> {
    self
      .audit
      .recent(entity, limit)
      .await
      .map_err(Error::storage)
  }
}
