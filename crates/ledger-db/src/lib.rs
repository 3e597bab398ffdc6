//! # ledger-db: Sheet Store Adapter
//!
//! Every call the ledger makes to its tabular backend goes through this crate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sheet Ledger Data Flow                           │
//! │                                                                         │
//! │  ledger-engine (commit_sale, restock, reports)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    ledger-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ Repositories  │    │   Workbook    │    │  SheetStore  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ InventoryRepo │───►│ named columns │───►│ Memory       │  │   │
//! │  │   │ CustomerRepo  │    │ RowHandle     │    │ SQLite       │  │   │
//! │  │   │ InvoiceRepo   │    │ build_row     │    │ (remote)     │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The `SheetStore` trait and its backends
//! - [`workbook`] - Header-resolved access (`Workbook`, `RowHandle`)
//! - [`tables`] - The six ledger tables and their default headers
//! - [`repository`] - Typed repositories per table
//! - [`pool`] - SQLite connection pool
//! - [`migrations`] - Embedded SQLite migrations
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_db::{MemoryWorkbook, Workbook};
//!
//! let workbook = Workbook::new(Arc::new(MemoryWorkbook::new()));
//! workbook.ensure_all().await?;
//!
//! let items = workbook.inventory().list().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;
pub mod tables;
pub mod workbook;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use pool::DbConfig;
pub use store::memory::{Fault, FaultKind, MemoryWorkbook, StoreOp};
pub use store::sqlite::SqliteWorkbook;
pub use store::SheetStore;
pub use tables::LedgerTable;
pub use workbook::{RowHandle, Workbook};

// Repository re-exports for convenience
pub use repository::{
    CustomerRepository, ExpenseRepository, InventoryRepository, InvoiceRepository,
    SettingsRepository,
};
