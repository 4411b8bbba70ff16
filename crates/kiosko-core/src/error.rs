//! # Error Types
//!
//! Domain-specific error types for kiosko-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kiosko-core errors (this file)                                        │
//! │  ├── CoreError        - Register rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kiosko-core store boundary (store.rs)                                 │
//! │  └── StoreError       - Conflict / NotFound / Unavailable              │
//! │                                                                         │
//! │  kiosko-db errors                                                      │
//! │  └── DbError          - sqlx failures, mapped into StoreError          │
//! │                                                                         │
//! │  register app                                                          │
//! │  └── ApiError         - What the host sees (serialized)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Clamping (quantity and stock bounds) never produces an error.

use thiserror::Error;

use crate::wizard::WizardStep;

// =============================================================================
// Core Error
// =============================================================================

/// Register rule violations raised by the pure state machines.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A wizard step was requested whose entry guard does not hold.
    ///
    /// ```text
    /// Products (cart empty)
    ///      │  go_to_step(CustomerData)
    ///      ▼
    /// StepBlocked { requested: CustomerData, blocked_by: Products }
    ///      │
    ///      ▼
    /// UI keeps "Next" disabled
    /// ```
    #[error("Cannot enter {requested}: {blocked_by} is not complete")]
    StepBlocked {
        requested: WizardStep,
        blocked_by: WizardStep,
    },

    /// The step is not part of the current sequence (Shipping without shipping).
    #[error("Step {0} is not offered for this sale")]
    StepNotOffered(WizardStep),

    /// No cart line at the given index.
    #[error("Cart line not found: {0}")]
    CartLineNotFound(usize),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// No tendered payment with the given client-local id.
    #[error("Payment not found: {0}")]
    PaymentNotFound(u64),

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// A non-cash payment without its confirmation code.
    #[error("Payment method {method} requires a confirmation code")]
    ConfirmationCodeRequired { method: String },

    /// A location was chosen before its parent level.
    #[error("Select a {parent} before choosing a {level}")]
    ParentLocationMissing { level: String, parent: String },

    /// Cash session is closed or does not accept the operation.
    #[error("Cash session {session_id} is {status}, cannot perform operation")]
    InvalidSessionStatus { session_id: String, status: String },

    /// The sale already committed; only a reset starts a new one.
    #[error("Sale already completed as order {order_id}")]
    SaleCompleted { order_id: String },

    /// The wizard is not in a state that can be submitted.
    #[error("Sale cannot be submitted: {reason}")]
    NotReadyToSubmit { reason: String },

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

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_blocked_message() {
        let err = CoreError::StepBlocked {
            requested: WizardStep::CustomerData,
            blocked_by: WizardStep::Products,
        };
        assert_eq!(
            err.to_string(),
            "Cannot enter customer data: products is not complete"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "document number".to_string(),
        };
        assert_eq!(err.to_string(), "document number is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::MustBePositive {
            field: "amount".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
