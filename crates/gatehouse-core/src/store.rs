//! The storage traits and supporting query types.
//!
//! Implemented by storage backends (e.g. `gatehouse-store-sqlite`). Higher
//! layers depend on these abstractions, never on a concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  filter::{DateRange, VisitFilter},
  visitor::{StaffUser, Visitor},
};

// ─── Visitor store ───────────────────────────────────────────────────────────

/// Abstraction over the visitor record store.
///
/// Backends must uphold the single-active-visit-per-CIN invariant under
/// concurrent writers (e.g. with a partial unique constraint on open
/// visits); the service's pre-insert check alone is not atomic.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait VisitorStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a fully-built visitor record.
  fn insert_visitor(
    &self,
    visitor: &Visitor,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Overwrite the stored record with the same id.
  fn update_visitor(
    &self,
    visitor: &Visitor,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove a record. Returns `false` if the id was unknown.
  fn delete_visitor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Retrieve a record by id. Returns `None` if not found.
  fn get_visitor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Visitor>, Self::Error>> + Send + '_;

  /// The open visit for a CIN, if one exists.
  fn find_active_by_cin<'a>(
    &'a self,
    cin: &'a str,
  ) -> impl Future<Output = Result<Option<Visitor>, Self::Error>> + Send + 'a;

  /// Every record in the store. Order unspecified.
  fn list_all(
    &self,
  ) -> impl Future<Output = Result<Vec<Visitor>, Self::Error>> + Send + '_;

  /// Records matching a [`VisitFilter`] over `window` — the backend must
  /// reproduce [`crate::filter::matches`] exactly. Order unspecified.
  fn list_filtered<'a>(
    &'a self,
    filter: VisitFilter,
    window: &'a DateRange,
  ) -> impl Future<Output = Result<Vec<Visitor>, Self::Error>> + Send + 'a;

  /// Records whose entry timestamp falls inside `window`, regardless of
  /// exit state. This is the selection every analytics pass starts from.
  fn list_entered_between<'a>(
    &'a self,
    window: &'a DateRange,
  ) -> impl Future<Output = Result<Vec<Visitor>, Self::Error>> + Send + 'a;
}

// ─── User directory ──────────────────────────────────────────────────────────

/// Lookup of staff users, used to validate the acting user on lifecycle
/// operations and by the server's authentication layer.
pub trait UserDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new staff user. Fails if the username is taken.
  fn add_user(
    &self,
    user: &StaffUser,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn find_user<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<StaffUser>, Self::Error>> + Send + 'a;

  fn user_exists<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
