//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Spreadsheet cells come back as text: "108.00", "$1,080.5", "7"        │
//! │  Summing them as floats drifts:                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    "108.00" → 10800 cents, sums are exact, cells are written back      │
//! │    with exactly two decimals                                            │
//! │                                                                         │
//! │  The one deliberate exception is unit COST, which is a weighted        │
//! │  average and keeps fractional cents (see `costing`).                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ledger_core::money::Money;
//!
//! let price = Money::parse("$10.99").unwrap();
//! assert_eq!(price.cents(), 1099);
//! assert_eq!(price.to_cell(), "10.99");
//!
//! // Blank or garbage cells read as zero on the lenient path
//! assert_eq!(Money::parse_lenient(""), Money::zero());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Inventory.Price ──► SaleLine.price ──► line total ──► subtotal        │
/// │                                                          │              │
/// │                                   TaxRate ──► tax ◄──────┘              │
/// │                                                │                        │
/// │  Transactions.TotalAmount ◄── subtotal + tax ──┘                        │
/// │  Customers.Credit, Expenses.Amount, report totals                       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Rounds a float amount to the nearest cent (half away from zero).
    ///
    /// ## Usage
    /// Only for values that are inherently fractional, such as
    /// `quantity × weighted-average cost` in COGS.
    pub fn from_f64_rounded(amount: f64) -> Self {
        Money((amount * 100.0).round() as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the value as a float (for cost arithmetic and display only).
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Subtracts, flooring the result at zero.
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::money::Money;
    ///
    /// let credit = Money::from_cents(1000);
    /// assert_eq!(credit.saturating_sub_floor_zero(Money::from_cents(2500)), Money::zero());
    /// ```
    #[inline]
    pub fn saturating_sub_floor_zero(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }

    /// Adds, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Calculates tax for a rate, rounding half up to the nearest cent.
    ///
    /// ## Implementation
    /// The rate is held in parts per million, so the integer formula is
    /// `(amount * ppm + 500_000) / 1_000_000`.
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::money::Money;
    /// use ledger_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(10_000);
    /// let tax = subtotal.calculate_tax(TaxRate::from_fraction(0.08));
    /// assert_eq!(tax.cents(), 800);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.ppm() as i128 + 500_000) / 1_000_000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Parses a money cell.
    ///
    /// ## Accepted Forms
    /// `108`, `108.5`, `108.00`, `$1,080.50`, `-4.25`, ` 3.999 ` (rounded to
    /// the nearest cent, half away from zero).
    ///
    /// ## Errors
    /// `ValidationError::Required` for blank input,
    /// `ValidationError::InvalidFormat` for anything non-numeric.
    pub fn parse(raw: &str) -> Result<Money, ValidationError> {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
            .collect();

        if cleaned.is_empty() {
            return Err(ValidationError::Required {
                field: "amount".to_string(),
            });
        }

        let invalid = || ValidationError::invalid_format("amount", format!("'{}' is not a number", raw.trim()));

        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if (whole.is_empty() && fraction.is_empty())
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole_cents: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<i64>()
                .map_err(|_| invalid())?
                .checked_mul(100)
                .ok_or_else(invalid)?
        };

        let mut frac_digits = fraction.chars().map(|c| c as i64 - '0' as i64);
        let tenths = frac_digits.next().unwrap_or(0);
        let hundredths = frac_digits.next().unwrap_or(0);
        let round_up = frac_digits.next().map(|d| d >= 5).unwrap_or(false);

        let cents = whole_cents
            .checked_add(tenths * 10 + hundredths + i64::from(round_up))
            .ok_or_else(invalid)?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Parses a money cell, reading blank or unparseable text as zero.
    ///
    /// ## Usage
    /// Report aggregation over historical rows, where one bad cell must not
    /// sink the whole report.
    pub fn parse_lenient(raw: &str) -> Money {
        Money::parse(raw).unwrap_or_default()
    }

    /// Formats the value for a spreadsheet cell: two decimals, no symbol.
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(10800).to_cell(), "108.00");
    /// assert_eq!(Money::from_cents(-5).to_cell(), "-0.05");
    /// ```
    pub fn to_cell(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as `$10.99`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
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
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
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
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_parse_common_cells() {
        assert_eq!(Money::parse("108").unwrap().cents(), 10_800);
        assert_eq!(Money::parse("108.5").unwrap().cents(), 10_850);
        assert_eq!(Money::parse("108.00").unwrap().cents(), 10_800);
        assert_eq!(Money::parse("$1,080.50").unwrap().cents(), 108_050);
        assert_eq!(Money::parse("-4.25").unwrap().cents(), -425);
        assert_eq!(Money::parse(".5").unwrap().cents(), 50);
        assert_eq!(Money::parse(" 20.000 ").unwrap().cents(), 2_000);
    }

    #[test]
    fn test_parse_rounds_third_decimal() {
        assert_eq!(Money::parse("3.995").unwrap().cents(), 400);
        assert_eq!(Money::parse("3.994").unwrap().cents(), 399);
        assert_eq!(Money::parse("-3.995").unwrap().cents(), -400);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(Money::parse(""), Err(ValidationError::Required { .. })));
        assert!(Money::parse("abc").is_err());
        assert!(Money::parse("1.2.3").is_err());
        assert!(Money::parse("-").is_err());
        assert!(Money::parse(".").is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        let max = Money::from_cents(i64::MAX).to_cell();
        assert_eq!(Money::parse(&max).unwrap().cents(), i64::MAX);
        assert!(Money::parse("92233720368547758.075").is_err());
        assert!(Money::parse("92233720368547758.08").is_err());
        assert!(Money::parse("99999999999999999999").is_err());
    }

    #[test]
    fn test_checked_add() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max.checked_add(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(250).checked_add(Money::from_cents(50)),
            Some(Money::from_cents(300))
        );
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(Money::parse_lenient(""), Money::zero());
        assert_eq!(Money::parse_lenient("n/a"), Money::zero());
        assert_eq!(Money::parse_lenient("8"), Money::from_cents(800));
    }

    #[test]
    fn test_to_cell() {
        assert_eq!(Money::from_cents(10_800).to_cell(), "108.00");
        assert_eq!(Money::from_cents(5).to_cell(), "0.05");
        assert_eq!(Money::from_cents(-1_250).to_cell(), "-12.50");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_saturating_sub_floor_zero() {
        let credit = Money::from_cents(1_000);
        assert_eq!(
            credit.saturating_sub_floor_zero(Money::from_cents(400)),
            Money::from_cents(600)
        );
        assert_eq!(
            credit.saturating_sub_floor_zero(Money::from_cents(4_000)),
            Money::zero()
        );
    }

    #[test]
    fn test_tax_calculation() {
        let subtotal = Money::from_cents(10_000);
        assert_eq!(subtotal.calculate_tax(TaxRate::from_fraction(0.08)).cents(), 800);

        // $10.00 at 8.25% = $0.825 → $0.83
        let amount = Money::from_cents(1_000);
        assert_eq!(amount.calculate_tax(TaxRate::from_fraction(0.0825)).cents(), 83);
    }

    #[test]
    fn test_from_f64_rounded() {
        assert_eq!(Money::from_f64_rounded(25.0).cents(), 2_500);
        assert_eq!(Money::from_f64_rounded(2.345_1).cents(), 235);
        assert_eq!(Money::from_f64_rounded(-1.006).cents(), -101);
    }
}
