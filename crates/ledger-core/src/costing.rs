//! # Costing
//!
//! Weighted-average cost blending and the non-negative clamps applied to
//! stock and store credit.
//!
//! ## Restock Cost Blend
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  on hand:  s0 units at c0        received: q units at c1               │
//! │                                                                         │
//! │              s0·c0 + q·c1                                               │
//! │  new cost =  ────────────        (c1 when s0 ≤ 0)                       │
//! │                s0 + q                                                   │
//! │                                                                         │
//! │  10 @ 2.00 + 10 @ 3.00  →  20 @ 2.50                                    │
//! │   0 @ 9.99 +  5 @ 4.00  →   5 @ 4.00  (old cost carries no weight)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Clamps
//! A sale never drives `StockQty` below zero and a debit never drives
//! `Credit` below zero. The shortfall is reported, not blocked.

use crate::money::Money;

// =============================================================================
// Cost Blend
// =============================================================================

/// Blends the on-hand unit cost with the cost of newly received units.
///
/// Negative on-hand stock counts as zero, so the result always lies between
/// `c0` and `c1` and is `c1` exactly when nothing is on hand.
///
/// ## Arguments
/// * `on_hand` - units in stock before the restock (`s0`)
/// * `on_hand_cost` - current weighted-average unit cost (`c0`)
/// * `received` - units being added (`q`)
/// * `received_cost` - unit cost of the received units (`c1`)
///
/// ## Example
/// ```rust
/// use ledger_core::costing::blend_unit_cost;
///
/// assert_eq!(blend_unit_cost(0, 9.99, 5, 4.0), 4.0);
/// assert_eq!(blend_unit_cost(-3, 10.0, 5, 1.0), 1.0);
/// assert!((blend_unit_cost(10, 2.0, 10, 3.0) - 2.5).abs() < 1e-9);
/// ```
pub fn blend_unit_cost(on_hand: i64, on_hand_cost: f64, received: i64, received_cost: f64) -> f64 {
    // s0 ≤ 0 must give c1 exactly
    if on_hand <= 0 || received <= 0 {
        return received_cost;
    }
    let (s0, q) = (on_hand as f64, received as f64);
    (s0 * on_hand_cost + q * received_cost) / (s0 + q)
}

// =============================================================================
// Stock Clamp
// =============================================================================

/// Result of decrementing one inventory row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub before: i64,
    pub after: i64,
    /// Units sold beyond what was on hand (0 when stock covered the sale).
    pub shortfall: i64,
}

impl StockDecrement {
    pub fn oversold(&self) -> bool {
        self.shortfall > 0
    }
}

/// Decrements stock by `qty`, clamping at zero.
///
/// ```rust
/// use ledger_core::costing::decrement_stock;
///
/// let d = decrement_stock(3, 5);
/// assert_eq!((d.after, d.shortfall), (0, 2));
/// ```
pub fn decrement_stock(current: i64, qty: i64) -> StockDecrement {
    let after = clamp_stock(current, qty);
    StockDecrement {
        before: current,
        after,
        shortfall: (qty - current.max(0)).max(0),
    }
}

/// `max(0, current − qty)`.
#[inline]
pub fn clamp_stock(current: i64, qty: i64) -> i64 {
    current.saturating_sub(qty).max(0)
}

// =============================================================================
// Credit Clamp
// =============================================================================

/// `max(0, current − debit)`.
#[inline]
pub fn clamp_credit(current: Money, debit: Money) -> Money {
    current.saturating_sub_floor_zero(debit)
}

// =============================================================================
// Unit Tests
// =============================================================================
