//! # Checkout Pricing
//!
//! Computes what the presentation layer shows at checkout and then hands to
//! the sale commit engine.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► Σ qty × unit price ──► subtotal                              │
//! │                                      │                                  │
//! │                     TaxRate (retail) ▼                                  │
//! │                                   + tax ──► grand total                 │
//! │                                               │                         │
//! │                  store credit (≤ grand total) ▼                         │
//! │                                   − credit ──► amount due               │
//! │                                                (written as TotalAmount) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{InventoryItem, SaleLine, TaxRate};

/// Unit price for an item.
///
/// Wholesale buyers pay `WholesalePrice` when it is set (> 0), everyone else
/// pays `Price`.
pub fn unit_price(item: &InventoryItem, wholesale: bool) -> Money {
    if wholesale && item.wholesale_price.is_positive() {
        item.wholesale_price
    } else {
        item.price
    }
}

/// Whether tax is charged by default. Wholesale sales are tax-exempt unless
/// the cashier opts in.
pub fn default_apply_tax(wholesale: bool) -> bool {
    !wholesale
}

/// Totals for one checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutQuote {
    pub subtotal: Money,
    pub tax: Money,
    /// `subtotal + tax`.
    pub grand_total: Money,
    /// Store credit applied, never more than `grand_total`.
    pub credit_applied: Money,
    /// `grand_total − credit_applied`.
    pub amount_due: Money,
}

/// Largest credit that can be applied to a total.
pub fn max_applicable_credit(available: Money, grand_total: Money) -> Money {
    available.min(grand_total).max(Money::zero())
}

/// Prices a cart.
///
/// ## Arguments
/// * `lines` - cart lines with their unit price already chosen
/// * `rate` - the `TaxRate` setting
/// * `apply_tax` - see [`default_apply_tax`]
/// * `credit_requested` - credit the customer wants to spend; capped at the
///   grand total
///
/// ## Example
/// ```rust
/// use ledger_core::money::Money;
/// use ledger_core::pricing::quote;
/// use ledger_core::types::{SaleLine, TaxRate};
///
/// let lines = vec![SaleLine::new("T-1", "Thread", 10, Money::from_cents(1_000))];
/// let q = quote(&lines, TaxRate::from_fraction(0.08), true, Money::from_cents(500));
/// assert_eq!(q.subtotal.cents(), 10_000);
/// assert_eq!(q.tax.cents(), 800);
/// assert_eq!(q.amount_due.cents(), 10_300);
/// ```
pub fn quote(
    lines: &[SaleLine],
    rate: TaxRate,
    apply_tax: bool,
    credit_requested: Money,
) -> CheckoutQuote {
    let subtotal: Money = lines.iter().map(SaleLine::line_total).sum();
    let tax = if apply_tax {
        subtotal.calculate_tax(rate)
    } else {
        Money::zero()
    };
    let grand_total = subtotal + tax;
    let credit_applied = max_applicable_credit(credit_requested, grand_total);

    CheckoutQuote {
        subtotal,
        tax,
        grand_total,
        credit_applied,
        amount_due: grand_total - credit_applied,
    }
}

// =============================================================================
// Payment Method Credit Suffix
// =============================================================================

/// Payment method as written on the invoice header.
///
/// When credit was redeemed the amount is recorded inline, since the
/// `Transactions` table has no credit column:
///
/// ```rust
/// use ledger_core::money::Money;
/// use ledger_core::pricing::payment_method_with_credit;
///
/// assert_eq!(payment_method_with_credit("Cash", Money::from_cents(1_000)), "Cash (+$10.00 Credit)");
/// assert_eq!(payment_method_with_credit("Cash", Money::zero()), "Cash");
/// ```
pub fn payment_method_with_credit(payment_method: &str, credit: Money) -> String {
    if credit.is_positive() {
        format!("{} (+{} Credit)", payment_method, credit)
    } else {
        payment_method.to_string()
    }
}

/// Reads the credit amount back out of a payment method cell.
pub fn parse_credit_suffix(payment_method: &str) -> Option<Money> {
    let trimmed = payment_method.trim_end();
    let body = trimmed.strip_suffix("Credit)")?;
    let start = body.rfind("(+")?;
    Money::parse(&body[start + 2..]).ok()
}

// =============================================================================
// Unit Tests
// =============================================================================
