//! # Validation Module
//!
//! Input validation for the back office.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend (React)                                             │
//! │  ├── Masks for CPF/CNPJ, currency inputs                               │
//! │  └── Live split preview (advisory only)                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: backoffice-api (Rust)                                        │
//! │  ├── Deserialization                                                   │
//! │  ├── THIS MODULE: field rules                                          │
//! │  └── ViabilityPolicy: amount >= minimum charge                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (split columns >= 0)                                        │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT_CENTS, MAX_DESCRIPTION_LEN, MAX_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a service name.
///
/// ## Example
/// ```rust
/// use multas_core::validation::validate_service_name;
///
/// assert!(validate_service_name("Recurso de multa").is_ok());
/// assert!(validate_service_name("  ").is_err());
/// ```
pub fn validate_service_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, MAX_NAME_LEN)
}

/// Validates the customer name printed on the charge.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    validate_required_text("customer_name", name, MAX_NAME_LEN)
}

/// Validates an optional free-text description.
pub fn validate_description(description: Option<&str>) -> ValidationResult<()> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LEN => Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        }),
        _ => Ok(()),
    }
}

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Monetary Validators
// =============================================================================

/// Validates one component of a split (ACSM, ICETRAN, processing fee).
///
/// ## Rules
/// - Zero is allowed (service with no ACSM share, for example)
/// - Negative values are rejected
/// - At most [`MAX_AMOUNT_CENTS`], so the sum of three components fits in i64
pub fn validate_split_component(field: &str, value: Money) -> ValidationResult<()> {
    if value.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }

    if value.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a charge amount.
///
/// ## Rules
/// - Must be positive: a gateway cannot issue a R$ 0,00 charge
/// - At most [`MAX_AMOUNT_CENTS`]
///
/// Whether the amount covers the split is a separate, policy-driven check.
pub fn validate_charge_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Document Validators (CPF / CNPJ)
// =============================================================================

/// Validates a CPF or CNPJ and returns it as digits only.
///
/// ## Rules
/// - Punctuation (`.`, `-`, `/`) and spaces are ignored
/// - 11 digits → CPF, 14 digits → CNPJ, anything else is invalid
/// - Check digits must match
/// - Repeated-digit sequences (`111.111.111-11`) are rejected
///
/// ## Example
/// ```rust
/// use multas_core::validation::validate_document;
///
/// assert_eq!(validate_document("529.982.247-25").unwrap(), "52998224725");
/// assert_eq!(validate_document("11.222.333/0001-81").unwrap(), "11222333000181");
/// assert!(validate_document("529.982.247-26").is_err());
/// ```
pub fn validate_document(document: &str) -> ValidationResult<String> {
    let invalid = || ValidationError::InvalidDocument {
        field: "customer_document".to_string(),
    };

    if document.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "customer_document".to_string(),
        });
    }

    if !document
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '/' | ' '))
    {
        return Err(invalid());
    }

    let digits: Vec<u32> = document.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.windows(2).all(|w| w[0] == w[1]) {
        return Err(invalid());
    }

    let valid = match digits.len() {
        11 => cpf_check_digits_match(&digits),
        14 => cnpj_check_digits_match(&digits),
        _ => false,
    };

    if !valid {
        return Err(invalid());
    }

    Ok(digits.iter().map(|d| char::from_digit(*d, 10).unwrap_or('0')).collect())
}

fn cpf_check_digits_match(digits: &[u32]) -> bool {
    let check = |len: usize| -> u32 {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        match (sum * 10) % 11 {
            10 => 0,
            r => r,
        }
    };

    check(9) == digits[9] && check(10) == digits[10]
}

fn cnpj_check_digits_match(digits: &[u32]) -> bool {
    const FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    let check = |weights: &[u32]| -> u32 {
        let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
        match sum % 11 {
            r if r < 2 => 0,
            r => 11 - r,
        }
    };

    check(&FIRST) == digits[12] && check(&SECOND) == digits[13]
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates a charge due date against today's date.
///
/// ## Rules
/// - Today is allowed (same-day PIX)
/// - Past dates are rejected
pub fn validate_due_date(due_date: NaiveDate, today: NaiveDate) -> ValidationResult<()> {
    if due_date < today {
        return Err(ValidationError::InvalidFormat {
            field: "due_date".to_string(),
            reason: format!("must not be before {}", today),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use multas_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_names() {
        assert!(validate_service_name("Recurso de multa - 1ª instância").is_ok());
        assert!(validate_service_name("").is_err());
        assert!(validate_service_name(&"A".repeat(300)).is_err());

        assert!(validate_customer_name("João da Silva").is_ok());
        assert!(validate_customer_name("   ").is_err());
    }

    #[test]
    fn test_validate_description() {
        assert!(validate_description(None).is_ok());
        assert!(validate_description(Some("AIT 123456")).is_ok());
        assert!(validate_description(Some(&"x".repeat(501))).is_err());
    }

    #[test]
    fn test_validate_split_component() {
        assert!(validate_split_component("acsm_value", Money::zero()).is_ok());
        assert!(validate_split_component("acsm_value", Money::from_cents(600)).is_ok());
        assert!(validate_split_component("acsm_value", Money::from_cents(-1)).is_err());

        assert!(validate_split_component("acsm_value", Money::from_cents(MAX_AMOUNT_CENTS)).is_ok());
        assert!(matches!(
            validate_split_component("icetran_value", Money::from_cents(MAX_AMOUNT_CENTS + 1)),
            Err(ValidationError::OutOfRange { field, max, .. })
                if field == "icetran_value" && max == MAX_AMOUNT_CENTS
        ));
    }

    #[test]
    fn test_validate_charge_amount() {
        assert!(validate_charge_amount(Money::from_cents(1)).is_ok());
        assert!(validate_charge_amount(Money::zero()).is_err());
        assert!(validate_charge_amount(Money::from_cents(-100)).is_err());

        assert!(validate_charge_amount(Money::from_cents(MAX_AMOUNT_CENTS)).is_ok());
        assert!(matches!(
            validate_charge_amount(Money::from_cents(i64::MAX)),
            Err(ValidationError::OutOfRange { min: 1, .. })
        ));
    }

    #[test]
    fn test_validate_cpf() {
        assert_eq!(validate_document("529.982.247-25").unwrap(), "52998224725");
        assert_eq!(validate_document("52998224725").unwrap(), "52998224725");

        assert!(validate_document("529.982.247-24").is_err());
        assert!(validate_document("111.111.111-11").is_err());
        assert!(validate_document("5299822472").is_err());
        assert!(validate_document("529a982b247").is_err());
        assert!(matches!(
            validate_document(""),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_cnpj() {
        assert_eq!(
            validate_document("11.222.333/0001-81").unwrap(),
            "11222333000181"
        );
        assert!(validate_document("11.222.333/0001-80").is_err());
        assert!(validate_document("00.000.000/0000-00").is_err());
    }

    #[test]
    fn test_validate_due_date() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        assert!(validate_due_date(today, today).is_ok());
        assert!(validate_due_date(today.succ_opt().unwrap(), today).is_ok());
        assert!(validate_due_date(today.pred_opt().unwrap(), today).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
