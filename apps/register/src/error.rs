//! # API Error Type
//!
//! Unified error type for the register's host surface.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kiosko POS                             │
//! │                                                                         │
//! │  Host (console, UI bridge)        Register                              │
//! │  ─────────────────────────        ────────                              │
//! │                                                                         │
//! │  register.go_to_step(3)                                                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │                                                                  │  │
//! │  │  CoreError::StepBlocked ──────────► STEP_BLOCKED                 │  │
//! │  │  StoreError::SessionAlreadyOpen ──► SESSION_ALREADY_OPEN         │  │
//! │  │  StoreError::InsufficientStock ───► INSUFFICIENT_STOCK           │  │
//! │  │  StoreError::Unavailable ─────────► EXTERNAL (retry same token)  │  │
//! │  │  commit timeout ──────────────────► EXTERNAL                     │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "STEP_BLOCKED",                                              │
//! │    "message": "Cannot enter customer data: products is not complete" } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use kiosko_core::{CoreError, StoreError, ValidationError};
use kiosko_db::DbError;

/// Error returned from every register operation.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Channel not found: ch-09" }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Channel, session, price list, cart line, payment, location...
    NotFound,

    /// Input validation failed
    ValidationError,

    /// A wizard step gate does not hold; the UI disables progression
    StepBlocked,

    /// No sale has been started on this register
    NoActiveSale,

    /// The channel already has an OPEN cash session
    SessionAlreadyOpen,

    /// Live stock no longer covers a line at commit
    InsufficientStock,

    /// Some other conflicting write
    Conflict,

    /// Operation not allowed in the current state
    BusinessLogic,

    /// Payment rejected
    PaymentError,

    /// Cart limit reached
    CartError,

    /// The store failed or timed out; retrying is safe
    External,

    /// Internal error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn no_active_sale() -> Self {
        ApiError::new(
            ErrorCode::NoActiveSale,
            "No sale in progress; start a sale first",
        )
    }

    pub fn external(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::External, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        self.code == ErrorCode::External
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        let code = match err {
            CoreError::StepBlocked { .. } | CoreError::StepNotOffered(_) => ErrorCode::StepBlocked,
            CoreError::CartLineNotFound(_) | CoreError::PaymentNotFound(_) => ErrorCode::NotFound,
            CoreError::CartTooLarge { .. } => ErrorCode::CartError,
            CoreError::InvalidPaymentAmount { .. } | CoreError::ConfirmationCodeRequired { .. } => {
                ErrorCode::PaymentError
            }
            CoreError::InvalidSessionStatus { .. } | CoreError::SaleCompleted { .. } => {
                ErrorCode::BusinessLogic
            }
            CoreError::ParentLocationMissing { .. }
            | CoreError::NotReadyToSubmit { .. }
            | CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts store errors to API errors.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            StoreError::SessionAlreadyOpen { .. } => {
                ApiError::new(ErrorCode::SessionAlreadyOpen, err.to_string())
            }
            StoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            StoreError::Conflict(_) => ApiError::new(ErrorCode::Conflict, err.to_string()),
            StoreError::Unavailable(e) => {
                tracing::error!("Store unavailable: {}", e);
                ApiError::external("The store is unavailable; try again")
            }
        }
    }
}

/// Converts database errors through the store boundary.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        StoreError::from(err).into()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kiosko_core::WizardStep;

    #[test]
    fn test_step_gate_is_step_blocked() {
        let err: ApiError = CoreError::StepBlocked {
            requested: WizardStep::CustomerData,
            blocked_by: WizardStep::Products,
        }
        .into();
        assert_eq!(err.code, ErrorCode::StepBlocked);
        assert!(err.message.contains("products"));
    }

    #[test]
    fn test_conflicts_keep_distinct_codes() {
        let open: ApiError = StoreError::SessionAlreadyOpen {
            channel_id: "ch-01".into(),
        }
        .into();
        let stock: ApiError = StoreError::InsufficientStock {
            variation_id: "v".into(),
            sku: "TSHIRT-M".into(),
            available: 1,
            requested: 2,
        }
        .into();

        assert_eq!(open.code, ErrorCode::SessionAlreadyOpen);
        assert_eq!(stock.code, ErrorCode::InsufficientStock);
    }

    #[test]
    fn test_unavailable_is_retryable_external() {
        let err: ApiError = StoreError::Unavailable("disk I/O error".into()).into();
        assert_eq!(err.code, ErrorCode::External);
        assert!(err.is_retryable());
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_serializes_screaming_snake_code() {
        let err = ApiError::not_found("Channel", "ch-09");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Channel not found: ch-09");
    }
}
