//! # Money Module
//!
//! Provides the `Money` type for handling monetary values (BRL) safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    6.00 + 6.00 + 3.50 = 15.5 ✓  but  0.1 + 0.2 = 0.30000000000000004   │
//! │                                                                         │
//! │  A split that is off by one centavo means ACSM, ICETRAN or the          │
//! │  despachante gets paid the wrong amount.                                │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Centavos                                         │
//! │    600 + 600 + 350 = 1550 centavos, always                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use multas_core::money::Money;
//!
//! let acsm = Money::from_cents(600);                 // R$ 6,00
//! let price = Money::parse_decimal("60,00").unwrap(); // R$ 60,00
//!
//! assert_eq!((price - acsm).cents(), 5400);
//! assert_eq!(price.to_string(), "R$ 60,00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::ValidationResult;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (1/100 of a real).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate results such as `amount - minimum` may be
///   negative before they are clamped
/// - **Single field tuple struct**: serializes as a plain integer
///
/// ## Where Money is Used
/// ```text
/// SplitConfig { acsm, icetran, taxa } ──► minimum_charge ──┐
///                                                          ├──► margin
/// Charge amount (typed by the operator) ───────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ## Example
    /// ```rust
    /// use multas_core::money::Money;
    ///
    /// let fee = Money::from_cents(350); // R$ 3,50
    /// assert_eq!(fee.cents(), 350);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from reais and centavos.
    ///
    /// For negative amounts only `reais` carries the sign:
    /// `from_reais_centavos(-5, 50)` is -R$ 5,50.
    #[inline]
    pub const fn from_reais_centavos(reais: i64, centavos: i64) -> Self {
        if reais < 0 {
            Money(reais * 100 - centavos)
        } else {
            Money(reais * 100 + centavos)
        }
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole reais portion (truncated toward zero).
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavos portion (always 0-99).
    #[inline]
    pub const fn centavos_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Subtracts `other`, flooring the result at zero.
    ///
    /// ## Example
    /// ```rust
    /// use multas_core::money::Money;
    ///
    /// let price = Money::from_cents(1000);
    /// let minimum = Money::from_cents(1550);
    /// assert_eq!(price.saturating_sub(minimum), Money::zero());
    /// assert_eq!(minimum.saturating_sub(price).cents(), 550);
    /// ```
    #[inline]
    pub const fn saturating_sub(&self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0)).clamp_non_negative()
    }

    /// Adds `other`, stopping at the i64 bounds instead of wrapping.
    #[inline]
    pub const fn saturating_add(&self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Returns `self` if it is non-negative, zero otherwise.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Money {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Formats the value as a plain decimal string with two places.
    ///
    /// This is the wire format used in webhook payloads (`"1234.56"`).
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.reais().abs(), self.centavos_part())
    }

    /// Parses a decimal amount typed by an operator.
    ///
    /// ## Accepted Formats
    /// ```text
    /// "15.5"        → 1550     (dot decimal)
    /// "15,50"       → 1550     (pt-BR comma decimal)
    /// "R$ 1.234,56" → 123456   (currency prefix, dot grouping)
    /// "1,234.56"    → 123456   (comma grouping, dot decimal)
    /// "1.234.567"   → 123456700 (repeated dots are grouping)
    /// "0.125"       → 13       (extra digits round half away from zero)
    /// ```
    ///
    /// ## Errors
    /// `InvalidFormat` for empty input, stray characters, or values that do
    /// not fit in centavos.
    pub fn parse_decimal(input: &str) -> ValidationResult<Money> {
        let mut s = input.trim();

        let negative = if let Some(rest) = s.strip_prefix('-') {
            s = rest.trim_start();
            true
        } else {
            false
        };

        if let Some(rest) = s.strip_prefix("R$") {
            s = rest.trim_start();
        }

        if s.is_empty() {
            return Err(invalid_amount("value is empty"));
        }

        if !s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
            return Err(invalid_amount("must contain only digits and separators"));
        }

        let (int_part, frac_part) = split_decimal(s)?;

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid_amount("no digits found"));
        }

        let mut cents: i128 = 0;
        for c in int_part.chars() {
            cents = cents * 10 + c.to_digit(10).map(i128::from).unwrap_or(0);
            if cents > i64::MAX as i128 {
                return Err(invalid_amount("value is too large"));
            }
        }
        cents *= 100;

        let frac: Vec<u32> = frac_part.chars().filter_map(|c| c.to_digit(10)).collect();
        let tenths = frac.first().copied().unwrap_or(0) as i128;
        let hundredths = frac.get(1).copied().unwrap_or(0) as i128;
        cents += tenths * 10 + hundredths;
        if frac.get(2).copied().unwrap_or(0) >= 5 {
            cents += 1;
        }

        if cents > i64::MAX as i128 {
            return Err(invalid_amount("value is too large"));
        }

        let cents = cents as i64;
        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Coerces free-form input to Money, falling back to zero.
    ///
    /// Mirrors the `parseFloat(value) || 0` behaviour of the back-office
    /// forms: the whole input is tried first, then its longest numeric
    /// prefix (`"60abc"` → R$ 60,00), and anything else becomes zero.
    ///
    /// ## Example
    /// ```rust
    /// use multas_core::money::Money;
    ///
    /// assert_eq!(Money::parse_lenient("15,50").cents(), 1550);
    /// assert_eq!(Money::parse_lenient("60abc").cents(), 6000);
    /// assert_eq!(Money::parse_lenient("abc"), Money::zero());
    /// assert_eq!(Money::parse_lenient(""), Money::zero());
    /// ```
    pub fn parse_lenient(input: &str) -> Money {
        if let Ok(money) = Money::parse_decimal(input) {
            return money;
        }

        let trimmed = input.trim_start();
        let mut prefix = String::new();
        let mut seen_dot = false;
        for (i, c) in trimmed.chars().enumerate() {
            match c {
                '-' | '+' if i == 0 => prefix.push(c),
                '0'..='9' => prefix.push(c),
                '.' if !seen_dot => {
                    seen_dot = true;
                    prefix.push(c);
                }
                _ => break,
            }
        }

        let prefix = prefix.trim_start_matches('+');
        Money::parse_decimal(prefix).unwrap_or_default()
    }
}

/// Splits the digits of an amount into integer and fractional parts,
/// dropping grouping separators.
fn split_decimal(s: &str) -> ValidationResult<(String, String)> {
    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();

    let decimal_sep = match (last_comma, last_dot) {
        (Some(c), Some(d)) => {
            let (sep, count) = if c > d { (',', commas) } else { ('.', dots) };
            if count > 1 {
                return Err(invalid_amount("decimal separator appears more than once"));
            }
            Some(sep)
        }
        (Some(_), None) if commas == 1 => Some(','),
        (Some(_), None) => return Err(invalid_amount("ambiguous use of ','")),
        (None, Some(_)) if dots == 1 => Some('.'),
        (None, Some(_)) => None,
        (None, None) => None,
    };

    let (int_raw, frac_raw) = match decimal_sep.and_then(|sep| s.rsplit_once(sep)) {
        Some((int_raw, frac_raw)) => (int_raw, frac_raw),
        None => (s, ""),
    };

    if frac_raw.contains(['.', ',']) {
        return Err(invalid_amount("grouping separator after decimal separator"));
    }

    let int_part: String = int_raw.chars().filter(char::is_ascii_digit).collect();
    Ok((int_part, frac_raw.to_string()))
}

fn invalid_amount(reason: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: "amount".to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Brazilian display format: `R$ 1.234,56`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.reais().abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }

        write!(f, "{}R$ {},{:02}", sign, grouped, self.centavos_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1550);
        assert_eq!(money.cents(), 1550);
        assert_eq!(money.reais(), 15);
        assert_eq!(money.centavos_part(), 50);
    }

    #[test]
    fn test_from_reais_centavos() {
        assert_eq!(Money::from_reais_centavos(15, 50).cents(), 1550);
        assert_eq!(Money::from_reais_centavos(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display_brl() {
        assert_eq!(Money::from_cents(1550).to_string(), "R$ 15,50");
        assert_eq!(Money::from_cents(0).to_string(), "R$ 0,00");
        assert_eq!(Money::from_cents(123456).to_string(), "R$ 1.234,56");
        assert_eq!(Money::from_cents(123456789).to_string(), "R$ 1.234.567,89");
        assert_eq!(Money::from_cents(-550).to_string(), "-R$ 5,50");
    }

    #[test]
    fn test_to_decimal_string() {
        assert_eq!(Money::from_cents(4450).to_decimal_string(), "44.50");
        assert_eq!(Money::from_cents(5).to_decimal_string(), "0.05");
        assert_eq!(Money::from_cents(-550).to_decimal_string(), "-5.50");
    }

    #[test]
    fn test_parse_decimal_formats() {
        assert_eq!(Money::parse_decimal("15.5").unwrap().cents(), 1550);
        assert_eq!(Money::parse_decimal("15,50").unwrap().cents(), 1550);
        assert_eq!(Money::parse_decimal("60").unwrap().cents(), 6000);
        assert_eq!(Money::parse_decimal(" R$ 1.234,56 ").unwrap().cents(), 123456);
        assert_eq!(Money::parse_decimal("1,234.56").unwrap().cents(), 123456);
        assert_eq!(Money::parse_decimal("1.234.567").unwrap().cents(), 123456700);
        assert_eq!(Money::parse_decimal(",5").unwrap().cents(), 50);
        assert_eq!(Money::parse_decimal("-5,50").unwrap().cents(), -550);
    }

    #[test]
    fn test_parse_decimal_rounds_third_digit() {
        assert_eq!(Money::parse_decimal("0.125").unwrap().cents(), 13);
        assert_eq!(Money::parse_decimal("0.124").unwrap().cents(), 12);
        assert_eq!(Money::parse_decimal("-0.125").unwrap().cents(), -13);
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert!(Money::parse_decimal("").is_err());
        assert!(Money::parse_decimal("R$").is_err());
        assert!(Money::parse_decimal("abc").is_err());
        assert!(Money::parse_decimal("12abc").is_err());
        assert!(Money::parse_decimal("1,2,3").is_err());
        assert!(Money::parse_decimal("1.234,5.6").is_err());
        assert!(Money::parse_decimal(".").is_err());
        assert!(Money::parse_decimal("99999999999999999999").is_err());
    }

    #[test]
    fn test_parse_lenient_coerces_to_zero() {
        assert_eq!(Money::parse_lenient("abc"), Money::zero());
        assert_eq!(Money::parse_lenient(""), Money::zero());
        assert_eq!(Money::parse_lenient("   "), Money::zero());
        assert_eq!(Money::parse_lenient("60abc").cents(), 6000);
        assert_eq!(Money::parse_lenient("3.5 reais").cents(), 350);
        assert_eq!(Money::parse_lenient("+7").cents(), 700);
        assert_eq!(Money::parse_lenient("11,00").cents(), 1100);
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(600);
        let b = Money::from_cents(350);

        assert_eq!((a + b).cents(), 950);
        assert_eq!((a - b).cents(), 250);
        assert_eq!((a * 3).cents(), 1800);

        let total: Money = [a, a, b].into_iter().sum();
        assert_eq!(total.cents(), 1550);
    }

    #[test]
    fn test_saturating_sub_and_clamp() {
        let price = Money::from_cents(1000);
        let minimum = Money::from_cents(1550);

        assert_eq!(price.saturating_sub(minimum), Money::zero());
        assert_eq!(minimum.saturating_sub(price).cents(), 550);
        assert_eq!(Money::from_cents(-1).clamp_non_negative(), Money::zero());
    }

    #[test]
    fn test_magnitude_boundary() {
        let largest = Money::parse_decimal("92233720368547758.07").unwrap();
        assert_eq!(largest.cents(), i64::MAX);
        assert!(Money::parse_decimal("92233720368547758.08").is_err());

        assert_eq!(largest.saturating_add(largest), largest);
        assert_eq!(
            Money::from_cents(600).saturating_add(Money::from_cents(950)).cents(),
            1550
        );

        let cap = Money::parse_decimal("R$ 1.000.000.000,00").unwrap();
        assert_eq!(cap.cents(), crate::MAX_AMOUNT_CENTS);
        assert!(crate::validation::validate_charge_amount(cap).is_ok());
        assert!(crate::validation::validate_split_component("acsm_value", largest).is_err());
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().cents(), 100);
    }
}
