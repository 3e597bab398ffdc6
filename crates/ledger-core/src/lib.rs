//! # ledger-core: Pure Business Logic for the Sheet Ledger
//!
//! This crate is the **heart** of the ledger. It holds every rule that decides
//! what gets written to the spreadsheet, as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sheet Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Presentation (out of this workspace)               │   │
//! │  │     POS page ──► Kiosk ──► Customers ──► Reports ──► PDF        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    ledger-engine                                │   │
//! │  │    commit_sale, restock, sell_gift_certificate, reports         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ledger-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │  sheet  │ │ costing │ │ commit  │ │ report  │  │   │
//! │  │   │  Money  │ │ Record  │ │ blend   │ │ stages  │ │ income  │  │   │
//! │  │   │         │ │ Schema  │ │ clamps  │ │         │ │ tax     │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO SHEETS • NO NETWORK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    ledger-db (Sheet Store Adapter)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer cents and cell parsing
//! - [`types`] - Ledger entities (InventoryItem, Customer, Transaction, ...)
//! - [`sheet`] - Header-resolved row model (`SheetSchema`, `Record`)
//! - [`costing`] - Weighted-average cost blend and non-negative clamps
//! - [`commit`] - Sale commit state machine
//! - [`pricing`] - Checkout quote (unit price, tax, credit)
//! - [`report`] - Income statement, tax liability, top sellers
//! - [`validation`] - Input validation before any write
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use ledger_core::costing::blend_unit_cost;
//! use ledger_core::money::Money;
//!
//! // 10 on hand at $2.00, receive 10 more at $3.00
//! let cost = blend_unit_cost(10, 2.0, 10, 3.0);
//! assert!((cost - 2.5).abs() < 1e-9);
//!
//! assert_eq!(Money::parse("108.00").unwrap().cents(), 10_800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commit;
pub mod costing;
pub mod error;
pub mod money;
pub mod pricing;
pub mod report;
pub mod sheet;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use commit::CommitStage;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use sheet::{Field, Record, SheetSchema};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Customer reference written on transactions without a registered customer.
pub const GUEST_CUSTOMER_ID: &str = "Guest";

/// SKU written on the line item of a gift certificate sale.
pub const GIFT_CERTIFICATE_SKU: &str = "GIFT-CERT";

/// Settings key holding the next sequential invoice number.
pub const NEXT_INVOICE_ID_KEY: &str = "NextInvoiceID";

/// Days until a `Pending` invoice falls due.
pub const DEFAULT_PENDING_DUE_DAYS: i64 = 30;

/// Maximum lines allowed in a single checkout.
///
/// ## Business Reason
/// A single batched append of line items stays well under the backend's
/// request size limits.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
pub const MAX_LINE_QUANTITY: i64 = 9_999;
