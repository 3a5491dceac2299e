//! Crate-level error type for engine operations.
//!
//! Individual models carry their own narrow error enums (`LoanError`,
//! `PaymentError`, ...) for illegal transitions on a single entity. Engine
//! operations translate those, plus every cross-entity check, into one
//! `EngineError` so callers get a single typed surface:
//!
//! - `Validation` — input violates a declared invariant; field-specific.
//! - `Authorization` — actor lacks the role or fails a gate.
//! - `Precondition` — the operation's prerequisites are unmet.
//! - `Conflict` — concurrent-update collision (kept for the API contract;
//!   the single-writer store cannot currently produce one).
//! - `Integrity` — duplicate-key or referential violation.
//! - `ExternalService` — gateway failure; never rolls back a domain write.
//! - `NotFound` — a referenced entity id does not exist.

use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Error returned by every engine operation.
///
/// An `Err` return guarantees that no state was mutated by the operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("validation failed on {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("precondition not met: {0}")]
    Precondition(String),

    #[error("conflicting update: {0}")]
    Conflict(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("external service failure: {0}")]
    ExternalService(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
}

impl EngineError {
    /// Field-specific validation failure.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True when the error represents a refused authorization gate.
    pub fn is_authorization(&self) -> bool {
        matches!(self, EngineError::Authorization(_))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Integrity(format!("serialization: {e}"))
    }
}
