//! Domain-level errors raised by the pure ledger rules

use thiserror::Error;

/// Failure kinds produced before anything touches storage.
///
/// The backend maps each kind onto its HTTP status; the message is surfaced to the
/// client verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    ReferencedResourceMissing(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
