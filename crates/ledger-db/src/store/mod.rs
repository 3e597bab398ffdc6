//! # Sheet Store Backends
//!
//! The raw tabular backend: named sheets of string cells, a header on row 1.
//!
//! ## Addressing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              col 1      col 2      col 3                                │
//! │  row 1   │ SKU      │ Name     │ StockQty │   ← header                  │
//! │  row 2   │ T-1      │ Red      │ 12       │   ← first data row          │
//! │  row 3   │ T-2      │ Blue     │ 0        │                             │
//! │                                                                         │
//! │  delete_row(2) → "T-2" moves up to row 2                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Backends
//! - [`memory::MemoryWorkbook`] - process-local, with fault injection for tests
//! - [`sqlite::SqliteWorkbook`] - persisted through a sqlx pool
//!
//! A hosted spreadsheet client would be a third implementation of the same
//! trait. Nothing above this module knows which backend it is talking to.

use async_trait::async_trait;

use crate::error::StoreResult;

pub mod memory;
pub mod sqlite;

/// First data row (row 1 is the header).
pub const FIRST_DATA_ROW: usize = 2;

/// A tabular backend.
///
/// Every method is one remote call. Implementations must be safe to share
/// across tasks (`Arc<dyn SheetStore>`); they serialise individual calls but
/// never hold anything across calls.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Creates the sheet with `header` if it does not exist.
    /// Returns `true` when the sheet was created.
    async fn ensure_sheet(&self, sheet: &str, header: &[String]) -> StoreResult<bool>;

    /// Row 1 of the sheet.
    async fn header(&self, sheet: &str) -> StoreResult<Vec<String>>;

    /// All data rows in order; index 0 is sheet row 2.
    async fn rows(&self, sheet: &str) -> StoreResult<Vec<Vec<String>>>;

    /// One data row.
    async fn read_row(&self, sheet: &str, row: usize) -> StoreResult<Vec<String>>;

    /// First data row whose cell in `column` equals `key` (both trimmed).
    async fn find_row(&self, sheet: &str, column: usize, key: &str) -> StoreResult<Option<usize>>;

    /// One cell. Cells beyond the end of a row read as `""`.
    async fn read_cell(&self, sheet: &str, row: usize, column: usize) -> StoreResult<String>;

    /// Writes one cell, widening the row if needed.
    async fn update_cell(&self, sheet: &str, row: usize, column: usize, value: &str)
        -> StoreResult<()>;

    /// Appends rows after the last data row, in order, in one call.
    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> StoreResult<()>;

    /// Deletes a data row; later rows shift up.
    async fn delete_row(&self, sheet: &str, row: usize) -> StoreResult<()>;

    /// Replaces header and data in one call.
    async fn overwrite(&self, sheet: &str, header: &[String], rows: &[Vec<String>])
        -> StoreResult<()>;
}

/// Trimmed-equality used by every backend's `find_row`.
pub(crate) fn cell_matches(cell: &str, key: &str) -> bool {
    cell.trim() == key.trim()
}
