//! Core error taxonomy.
//!
//! One tagged enum for every failure the core can raise. Each variant
//! carries whatever an actionable error message needs; `code()` and
//! `http_status()` exist purely so a transport layer can map without string
//! matching, not because the core speaks HTTP itself.

use thiserror::Error;

/// Core error kinds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("insufficient stock for product {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    #[error("stock exists for product {product} but only in expired batches")]
    ExpiredBatchOnly { product: String },

    #[error("concurrency conflict on {entity} {id}: expected row_version {expected}, found {found}")]
    ConcurrencyConflict {
        entity: String,
        id: String,
        expected: i64,
        found: i64,
    },

    #[error("idempotency violation: {0}")]
    IdempotencyViolation(String),

    #[error("proposal {0} was already converted to a sale")]
    AlreadyConverted(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("validation error on {field}: {message}")]
    ValidationError { field: String, message: String },
}

impl CoreError {
    /// Stable machine-readable tag for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::InvalidTransition { .. } => "INVALID_TRANSITION",
            CoreError::InvalidOperation(_) => "INVALID_OPERATION",
            CoreError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            CoreError::ExpiredBatchOnly { .. } => "EXPIRED_BATCH_ONLY",
            CoreError::ConcurrencyConflict { .. } => "CONCURRENCY_CONFLICT",
            CoreError::IdempotencyViolation(_) => "IDEMPOTENCY_VIOLATION",
            CoreError::AlreadyConverted(_) => "ALREADY_CONVERTED",
            CoreError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            CoreError::ValidationError { .. } => "VALIDATION_ERROR",
        }
    }

    /// Suggested HTTP status for a transport layer; the core never
    /// constructs a response itself.
    pub fn http_status(&self) -> u16 {
        match self {
            CoreError::Forbidden(_) => 403,
            CoreError::NotFound(_) => 404,
            CoreError::InvalidTransition { .. }
            | CoreError::InvalidOperation(_)
            | CoreError::InsufficientStock { .. }
            | CoreError::ExpiredBatchOnly { .. }
            | CoreError::ValidationError { .. } => 400,
            CoreError::ConcurrencyConflict { .. }
            | CoreError::IdempotencyViolation(_)
            | CoreError::AlreadyConverted(_) => 409,
            CoreError::ConfigurationError(_) => 500,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::ConfigurationError(format!("database error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(CoreError::Forbidden("x".into()).code(), "FORBIDDEN");
        assert_eq!(
            CoreError::InsufficientStock {
                product: "SKU1".into(),
                requested: 10,
                available: 3
            }
            .code(),
            "INSUFFICIENT_STOCK"
        );
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(CoreError::Forbidden("x".into()).http_status(), 403);
        assert_eq!(
            CoreError::ConcurrencyConflict {
                entity: "Sale".into(),
                id: "1".into(),
                expected: 1,
                found: 2
            }
            .http_status(),
            409
        );
        assert_eq!(CoreError::ConfigurationError("x".into()).http_status(), 500);
    }

    #[test]
    fn insufficient_stock_message_names_quantities() {
        let err = CoreError::InsufficientStock {
            product: "AMOX-500".into(),
            requested: 15,
            available: 8,
        };
        let msg = err.to_string();
        assert!(msg.contains("AMOX-500"));
        assert!(msg.contains("15"));
        assert!(msg.contains('8'));
    }
}
