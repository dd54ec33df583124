//! Error types for the catalog and booking services.
//!
//! Business outcomes such as "sold out" are not errors; they are
//! [`BookingOutcome`](crate::booking::BookingOutcome) variants.

use seatledger_core::ledger::LedgerError;
use seatledger_runtime::DeadlineExceeded;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by catalog operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No show is stored under the name.
    #[error("Show not found: {name}")]
    NotFound {
        /// The requested show name.
        name: String,
    },

    /// The listing is malformed.
    #[error("Invalid show listing: {0}")]
    Validation(String),

    /// The ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errors surfaced by the booking service and the gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Malformed input.
    #[error("{0}")]
    Validation(String),

    /// A point lookup found nothing.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity kind looked up.
        entity: &'static str,
        /// The key that was absent.
        key: String,
    },

    /// A dependent service answered with an error.
    #[error("{dependency} call failed: {reason}")]
    Dependency {
        /// Name of the dependency.
        dependency: &'static str,
        /// Its error message.
        reason: String,
    },

    /// A dependent service did not answer in time.
    #[error("{dependency} did not respond within {timeout:?}")]
    DependencyTimeout {
        /// Name of the dependency.
        dependency: &'static str,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The ledger failed or rejected the commit.
    #[error("Storage error: {0}")]
    Storage(#[from] LedgerError),
}

impl BookingError {
    /// `true` only for commit conflicts, which a re-run against fresh state
    /// can resolve.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(error) if error.is_conflict())
    }

    /// Map a catalog error raised during a booking.
    ///
    /// Ledger failures keep their identity so conflicts stay retryable;
    /// anything else is a dependency failure.
    #[must_use]
    pub fn from_dependency(dependency: &'static str, error: CatalogError) -> Self {
        match error {
            CatalogError::Ledger(error) => Self::Storage(error),
            other => Self::Dependency {
                dependency,
                reason: other.to_string(),
            },
        }
    }
}

impl From<DeadlineExceeded> for BookingError {
    fn from(error: DeadlineExceeded) -> Self {
        Self::DependencyTimeout {
            dependency: error.dependency,
            timeout: error.timeout,
        }
    }
}

/// Direct catalog calls from the gateway keep their own meaning.
impl From<CatalogError> for BookingError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFound { name } => Self::NotFound {
                entity: "show",
                key: name,
            },
            CatalogError::Validation(reason) => Self::Validation(reason),
            CatalogError::Ledger(error) => Self::Storage(error),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use seatledger_core::ledger::LedgerKey;

    fn conflict() -> LedgerError {
        LedgerError::conflict(LedgerKey::entity("quota", "pool").unwrap(), None, None)
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(BookingError::Storage(conflict()).is_retryable());
        assert!(!BookingError::Storage(LedgerError::Unavailable("down".into())).is_retryable());
        assert!(!BookingError::Validation("bad".into()).is_retryable());
    }

    #[test]
    fn dependency_mapping_keeps_ledger_conflicts() {
        let mapped = BookingError::from_dependency("catalog", CatalogError::Ledger(conflict()));
        assert!(mapped.is_retryable());

        let mapped = BookingError::from_dependency(
            "catalog",
            CatalogError::Validation("time slot must not be empty".into()),
        );
        assert_eq!(
            mapped.to_string(),
            "catalog call failed: Invalid show listing: time slot must not be empty"
        );
    }

    #[test]
    fn deadline_becomes_dependency_timeout() {
        let error: BookingError = DeadlineExceeded {
            dependency: "catalog",
            timeout: Duration::from_millis(5),
        }
        .into();
        assert_eq!(
            error,
            BookingError::DependencyTimeout {
                dependency: "catalog",
                timeout: Duration::from_millis(5)
            }
        );
    }
}
