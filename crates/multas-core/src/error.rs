//! # Error Types
//!
//! Domain-specific error types for multas-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  multas-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  multas-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  backoffice-api errors                                                 │
//! │  └── ApiError         - What the frontend sees (JSON + HTTP status)    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Frontend               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::types::ChargeStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Service cannot be found.
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// Service exists but was deactivated; no new charges may use it.
    #[error("Service {0} is inactive")]
    ServiceInactive(String),

    /// Charge cannot be found.
    #[error("Charge not found: {0}")]
    ChargeNotFound(String),

    /// Charge amount does not cover ACSM + ICETRAN + processing fee.
    ///
    /// ## When This Occurs
    /// ```text
    /// Split: R$ 6,00 + R$ 6,00 + R$ 3,50 = R$ 15,50 minimum
    ///      │
    ///      ▼
    /// Operator types R$ 10,00
    ///      │
    ///      ▼
    /// BelowMinimumCharge { amount: R$ 10,00, minimum: R$ 15,50 }
    /// ```
    #[error("Charge amount {amount} is below the minimum charge {minimum}")]
    BelowMinimumCharge { amount: Money, minimum: Money },

    /// Charge status change not allowed by the charge lifecycle.
    #[error("Charge {charge_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        charge_id: String,
        from: ChargeStatus,
        to: ChargeStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater (split components).
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// CPF/CNPJ with wrong length or check digits.
    #[error("{field} is not a valid CPF or CNPJ")]
    InvalidDocument { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_minimum_message() {
        let err = CoreError::BelowMinimumCharge {
            amount: Money::from_cents(1000),
            minimum: Money::from_cents(1550),
        };
        assert_eq!(
            err.to_string(),
            "Charge amount R$ 10,00 is below the minimum charge R$ 15,50"
        );
    }

    #[test]
    fn test_status_transition_message() {
        let err = CoreError::InvalidStatusTransition {
            charge_id: "c-1".to_string(),
            from: ChargeStatus::Cancelled,
            to: ChargeStatus::Received,
        };
        assert_eq!(err.to_string(), "Charge c-1 cannot move from cancelled to received");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBeNonNegative {
            field: "acsm_value".to_string(),
        };
        assert_eq!(err.to_string(), "acsm_value must not be negative");

        let err = ValidationError::InvalidDocument {
            field: "customer_document".to_string(),
        };
        assert_eq!(err.to_string(), "customer_document is not a valid CPF or CNPJ");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
