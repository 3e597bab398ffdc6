//! # Repository Module
//!
//! Typed access to each ledger table.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Engine                                                                 │
//! │       │                                                                 │
//! │       │  workbook.inventory().get("T-1")                                │
//! │       ▼                                                                 │
//! │  InventoryRepository                                                    │
//! │  ├── list()                                                             │
//! │  ├── get(sku) / locate(sku) / probe(sku)                                │
//! │  ├── insert(item)                                                       │
//! │  └── replace_all(header, rows)                                          │
//! │       │                                                                 │
//! │       │  Record ⇄ InventoryItem (ledger-core)                           │
//! │       ▼                                                                 │
//! │  Workbook (named columns) ──► SheetStore (memory | sqlite)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories perform single reads and single writes. Read-modify-write
//! sequences (stock decrement, credit debit, counter bump) belong to the
//! engines, which work on the returned [`RowHandle`](crate::RowHandle)s.
//!
//! ## Available Repositories
//!
//! - [`InventoryRepository`] - Inventory rows
//! - [`CustomerRepository`] - Customers and their credit
//! - [`InvoiceRepository`] - Transactions and TransactionItems
//! - [`SettingsRepository`] - Key/value settings
//! - [`ExpenseRepository`] - Append-only expenses

pub mod customer;
pub mod expense;
pub mod inventory;
pub mod invoice;
pub mod settings;

pub use customer::CustomerRepository;
pub use expense::ExpenseRepository;
pub use inventory::InventoryRepository;
pub use invoice::InvoiceRepository;
pub use settings::SettingsRepository;
