//! Structured requests for the operation boundary: typed fields, no
//! positional ambiguity.
//!
//! Field-level constraints (non-positive quantities, empty required text)
//! are declared with `validator` and checked once, at the top of each
//! [`crate::service::CoreService`] method, before anything touches the
//! database. A failing constraint becomes `CoreError::ValidationError`
//! naming the offending field, never a bare string.

use validator::{Validate, ValidationErrors};

use crate::error::CoreError;
use crate::ids::{ChargeProposalId, EncounterId, LegalEntityId, LocationId, SaleId};

/// Run `validator`'s derived checks and translate the first failure into
/// a `CoreError::ValidationError`. The core only ever needs to report one
/// problem at a time to the caller; `validator` itself can return several.
pub fn validate<T: Validate>(request: &T) -> Result<(), CoreError> {
    request.validate().map_err(first_field_error)
}

fn first_field_error(errors: ValidationErrors) -> CoreError {
    for (field, field_errors) in errors.field_errors() {
        if let Some(e) = field_errors.first() {
            let message = e
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("failed validation: {}", e.code));
            return CoreError::ValidationError {
                field: field.to_string(),
                message,
            };
        }
    }
    CoreError::ValidationError {
        field: "unknown".to_string(),
        message: "validation failed".to_string(),
    }
}

#[derive(Debug, Clone, Validate)]
pub struct GenerateProposalRequest {
    pub encounter: EncounterId,
    #[validate(length(max = 2000, message = "notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct ConvertToSaleRequest {
    pub proposal: ChargeProposalId,
    pub legal_entity: LegalEntityId,
    #[validate(length(max = 2000, message = "notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct PaySaleRequest {
    pub sale: SaleId,
    #[validate(range(min = 0, message = "expected_row_version cannot be negative"))]
    pub expected_row_version: i64,
    pub location: Option<LocationId>,
}

#[derive(Debug, Clone, Validate)]
pub struct RefundSaleRequest {
    pub sale: SaleId,
    #[validate(range(min = 0, message = "expected_row_version cannot be negative"))]
    pub expected_row_version: i64,
    #[validate(length(
        min = 1,
        max = 500,
        message = "reason is required and must be at most 500 characters"
    ))]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_row_version_is_rejected() {
        let req = PaySaleRequest {
            sale: SaleId::new(),
            expected_row_version: -1,
            location: None,
        };
        let err = validate(&req).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError { field, .. } if field == "expected_row_version"));
    }

    #[test]
    fn empty_refund_reason_is_rejected() {
        let req = RefundSaleRequest {
            sale: SaleId::new(),
            expected_row_version: 3,
            reason: String::new(),
        };
        let err = validate(&req).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError { field, .. } if field == "reason"));
    }

    #[test]
    fn valid_refund_request_passes() {
        let req = RefundSaleRequest {
            sale: SaleId::new(),
            expected_row_version: 3,
            reason: "Customer return".to_string(),
        };
        assert!(validate(&req).is_ok());
    }
}
