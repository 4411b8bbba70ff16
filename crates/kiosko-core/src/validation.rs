//! # Validation Module
//!
//! Input validation for values typed at the register.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Host UI                                                       │
//! │  └── Disables "Next" while a step guard is false                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Register service                                             │
//! │  └── THIS MODULE: amounts, documents, names, notes                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store                                                         │
//! │  ├── One OPEN session per channel (unique index)                        │
//! │  ├── Conditional stock decrement                                        │
//! │  └── Unique submission token per order                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantities are deliberately absent: the cart clamps them instead of
//! rejecting them.

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest free-text note accepted on a session open/close.
pub const MAX_NOTES_LEN: usize = 500;

/// Largest amount accepted for a tender, a drawer count or a sale's paid
/// total: 100 million in major units.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an identity document number.
///
/// ## Rules
/// - Must not be empty
/// - At most 20 characters
/// - Letters, digits and hyphens only
///
/// ```rust
/// use kiosko_core::validation::validate_document_number;
///
/// assert!(validate_document_number("20123456789").is_ok());
/// assert!(validate_document_number("").is_err());
/// assert!(validate_document_number("12 34").is_err());
/// ```
pub fn validate_document_number(number: &str) -> ValidationResult<()> {
    let number = number.trim();

    if number.is_empty() {
        return Err(ValidationError::Required {
            field: "document number".to_string(),
        });
    }

    if number.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "document number".to_string(),
            max: 20,
        });
    }

    if !number.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "document number".to_string(),
            reason: "must contain only letters, digits and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates a customer name field (1-150 characters after trimming).
pub fn validate_customer_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 150 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 150,
        });
    }

    Ok(())
}

/// Validates a search query and returns it trimmed. Empty is allowed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates optional session notes and returns them trimmed.
///
/// Blank notes collapse to `None`.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(Some(notes.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a drawer amount (opening float or counted cash).
///
/// Zero is allowed (an empty drawer); negative is not. Capped at
/// [`MAX_AMOUNT_CENTS`].
///
/// ```rust
/// use kiosko_core::money::Money;
/// use kiosko_core::validation::validate_drawer_amount;
///
/// assert!(validate_drawer_amount("opening amount", Money::from_cents(10000)).is_ok());
/// assert!(validate_drawer_amount("opening amount", Money::zero()).is_ok());
/// assert!(validate_drawer_amount("opening amount", Money::from_cents(-1)).is_err());
/// ```
pub fn validate_drawer_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() || amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a tendered payment amount: positive and at most
/// [`MAX_AMOUNT_CENTS`].
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "payment amount".to_string(),
            min: 1,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "vat_rate_bps".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
