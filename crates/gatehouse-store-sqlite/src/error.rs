//! Error type for `gatehouse-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored discriminant column holds a value no variant maps to.
  #[error("cannot decode column value: {0}")]
  Decode(String),

  /// The partial unique index on open visits rejected an insert — a second
  /// entry raced in for the same CIN.
  #[error("an open visit already exists for CIN {0:?}")]
  ActiveCinConstraint(String),

  #[error("staff user {0:?} already exists")]
  UserExists(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
