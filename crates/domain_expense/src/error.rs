//! Expense workflow errors

use thiserror::Error;

use core_kernel::{MoneyError, PortError};

/// Errors surfaced by the expense workflow
///
/// Every variant except `DependencyDegraded` reaches the caller verbatim.
/// Degradation of the conversion service is absorbed with a fallback value
/// and notification failures are swallowed, so `DependencyDegraded` only
/// appears when a caller invokes a collaborator directly.
#[derive(Debug, Error)]
pub enum ExpenseError {
    /// Malformed input, rejected before any state change
    #[error("Validation error: {0}")]
    Validation(String),

    /// The acting principal lacks authority for the transition or view
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The claim's current state does not permit the transition
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// A concurrent writer committed first; reload and retry
    #[error("Version conflict on claim {claim_id}: expected version {expected}")]
    VersionConflict { claim_id: String, expected: u64 },

    #[error("Dependency degraded: {0}")]
    DependencyDegraded(String),

    /// Persistence or another collaborator failed outright
    #[error("Infrastructure failure: {0}")]
    Infrastructure(PortError),
}

impl ExpenseError {
    pub fn validation(message: impl Into<String>) -> Self {
        ExpenseError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ExpenseError::Forbidden(message.into())
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        ExpenseError::InvalidTransition(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        ExpenseError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Short machine-readable code, used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            ExpenseError::Validation(_) => "validation_error",
            ExpenseError::Forbidden(_) => "forbidden",
            ExpenseError::NotFound { .. } => "not_found",
            ExpenseError::InvalidTransition(_) => "invalid_transition",
            ExpenseError::VersionConflict { .. } => "version_conflict",
            ExpenseError::DependencyDegraded(_) => "dependency_degraded",
            ExpenseError::Infrastructure(_) => "internal_error",
        }
    }
}

impl From<PortError> for ExpenseError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => ExpenseError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Validation { message, .. } => ExpenseError::Validation(message),
            PortError::VersionConflict { id, expected, .. } => ExpenseError::VersionConflict {
                claim_id: id,
                expected,
            },
            other => ExpenseError::Infrastructure(other),
        }
    }
}

impl From<MoneyError> for ExpenseError {
    fn from(error: MoneyError) -> Self {
        ExpenseError::Validation(error.to_string())
    }
}
