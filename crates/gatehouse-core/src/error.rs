//! Error types for `gatehouse-core`.

use thiserror::Error;
use uuid::Uuid;

/// Coarse classification of an [`Error`], so callers can pick a response
/// shape (HTTP status, chat wording) without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Bad input shape or format, unknown acting user, CIN conflict.
  Validation,
  /// Unknown record id.
  NotFound,
  /// A lifecycle transition that has already happened (double exit).
  Conflict,
  /// Anything the storage layer failed at.
  Storage,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("acting user must not be empty")]
  MissingUser,

  #[error("user {0:?} does not exist")]
  UnknownUser(String),

  #[error("CIN must be exactly 8 digits, got {0:?}")]
  InvalidCin(String),

  #[error("fiscal id must be exactly 7 digits followed by one letter, got {0:?}")]
  InvalidFiscalId(String),

  #[error(
    "CIN {cin:?} is already in use by active visitor {conflicting_id}; \
     that visitor must exit before the CIN can be used again"
  )]
  CinAlreadyActive { cin: String, conflicting_id: Uuid },

  #[error("{field} must not exceed {max} characters")]
  FieldTooLong { field: &'static str, max: usize },

  #[error("staff user {0:?} already exists")]
  UserAlreadyExists(String),

  #[error("visitor not found: {0}")]
  VisitorNotFound(Uuid),

  #[error("visitor {0} has already exited")]
  AlreadyExited(Uuid),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error crossing the store trait boundary.
  pub fn storage<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(err))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::MissingUser
      | Self::UnknownUser(_)
      | Self::InvalidCin(_)
      | Self::InvalidFiscalId(_)
      | Self::CinAlreadyActive { .. }
      | Self::FieldTooLong { .. }
      | Self::UserAlreadyExists(_) => ErrorKind::Validation,
      Self::VisitorNotFound(_) => ErrorKind::NotFound,
      Self::AlreadyExited(_) => ErrorKind::Conflict,
      Self::Storage(_) => ErrorKind::Storage,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
