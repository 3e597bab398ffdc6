//! # Validation Module
//!
//! Input validation for every mutating operation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation (forms)                                          │
//! │  └── Widgets already constrain most input                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine entry points                                           │
//! │  └── THIS MODULE: rules checked BEFORE the first sheet write            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: The spreadsheet                                               │
//! │  └── Nothing. Any cell accepts any text, so layer 2 is the last line.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ledger_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("THREAD-RED").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::SaleLine;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_SKU_LEN: usize = 64;
const MAX_NAME_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - No control characters (a stray newline breaks key lookup)
///
/// Hand-maintained sheets use spaces and slashes in SKUs, so the character
/// set is otherwise open.
///
/// ```rust
/// use ledger_core::validation::validate_sku;
///
/// assert!(validate_sku("FAB 12/B").is_ok());
/// assert!(validate_sku("  ").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.chars().count() > MAX_SKU_LEN {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LEN,
        });
    }

    if sku.chars().any(char::is_control) {
        return Err(ValidationError::invalid_format(
            "sku",
            "must not contain control characters",
        ));
    }

    Ok(())
}

/// Validates a display name (product, customer, expense category).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an id that must reference an existing row.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an optional email address. Blank is allowed.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(());
    }
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::invalid_format(
            "email",
            "must look like name@example.com",
        )),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sold quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `MAX_LINE_QUANTITY`
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates stock on hand for a new item (zero allowed).
pub fn validate_opening_stock(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }
    Ok(())
}

/// Validates a money amount that may be zero (prices, totals, tax).
///
/// ```rust
/// use ledger_core::money::Money;
/// use ledger_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("price", Money::zero()).is_ok());
/// assert!(validate_non_negative("price", Money::from_cents(-1)).is_err());
/// ```
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a money amount that must be above zero (gift certificates,
/// expenses, credit top-ups).
pub fn validate_positive(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a unit cost.
pub fn validate_unit_cost(cost: f64) -> ValidationResult<()> {
    if !cost.is_finite() {
        return Err(ValidationError::invalid_format("cost", "must be a number"));
    }
    if cost < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "cost".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates a cart before checkout.
///
/// ## Rules
/// - At least one line, at most `MAX_CART_LINES`
/// - Every line: non-empty SKU, `qty > 0`, `price ≥ 0`
pub fn validate_cart(lines: &[SaleLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "cart".to_string(),
        });
    }

    if lines.len() > MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 1,
            max: MAX_CART_LINES as i64,
        });
    }

    for line in lines {
        validate_sku(&line.sku)?;
        validate_quantity(line.qty)?;
        validate_non_negative("price", line.price)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
