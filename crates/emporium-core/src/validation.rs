//! # Validation Module
//!
//! Input validation for cart, coupon and checkout data.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Storefront (TypeScript)  - format checks, instant feedback    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (Rust)      - deserialization                    │
//! │           └── THIS MODULE: business rule validation                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                   - NOT NULL / UNIQUE / CHECK          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use emporium_core::validation::{validate_coupon_code, validate_quantity};
//!
//! assert_eq!(validate_coupon_code(" diwali10 ").unwrap(), "DIWALI10");
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::ShippingAddress;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a catalog product id: non-empty, at most 64 characters.
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }

    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "product_id".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates and normalizes a coupon code.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 32 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Returns
/// The trimmed, upper-cased code. Codes compare case-insensitively, so
/// `diwali10` and `DIWALI10` are the same coupon.
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "coupon_code".to_string(),
        });
    }

    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "coupon_code".to_string(),
            max: 32,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "coupon_code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

/// Validates a carrier tracking id.
pub fn validate_tracking_id(tracking_id: &str) -> ValidationResult<()> {
    let tracking_id = tracking_id.trim();

    if tracking_id.is_empty() {
        return Err(ValidationError::Required {
            field: "tracking_id".to_string(),
        });
    }

    if tracking_id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "tracking_id".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a shipping address.
///
/// ## Rules
/// - `full_name`, `phone`, `line1`, `city`, `state`, `country` are required
/// - `postal_code` is a six-digit PIN code
pub fn validate_address(address: &ShippingAddress) -> ValidationResult<()> {
    let required = [
        ("full_name", &address.full_name),
        ("phone", &address.phone),
        ("line1", &address.line1),
        ("city", &address.city),
        ("state", &address.state),
        ("country", &address.country),
    ];

    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ValidationError::Required {
                field: field.to_string(),
            });
        }
    }

    let pin = address.postal_code.trim();
    if pin.len() != 6 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "postal_code".to_string(),
            reason: "must be a six-digit PIN code".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: u32) -> ValidationResult<()> {
    if qty == 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY as i64,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (free samples).
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
