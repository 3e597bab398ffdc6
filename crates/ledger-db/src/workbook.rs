//! # Workbook
//!
//! Named-column access over a [`SheetStore`].
//!
//! ## Column Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  write_field(handle, "Cost", "2.5000")                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  handle.schema ── column_of("Cost") ──► Some(6) ──► update_cell(r, 6)   │
//! │                                    └──► None   ──► skipped, Ok(false)   │
//! │                                                                         │
//! │  append_record(Inventory, [("SKU","T-1"), ("Cost","2.5")])              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  header() ──► SheetSchema::build_row ──► ["T-1", "", "", "", "", "2.5"] │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The header is read fresh for every operation. A [`RowHandle`] carries the
//! schema it was located with, so one operation resolves its columns once and
//! a column inserted by hand between operations is picked up by the next one.
//!
//! Handles are positional. Deleting a row invalidates handles to later rows
//! of the same table.

use std::sync::Arc;

use ledger_core::{Record, SheetSchema};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::repository::{
    CustomerRepository, ExpenseRepository, InventoryRepository, InvoiceRepository,
    SettingsRepository,
};
use crate::store::{SheetStore, FIRST_DATA_ROW};
use crate::tables::LedgerTable;

// =============================================================================
// Row Handle
// =============================================================================

/// A located data row plus the header it was resolved against.
#[derive(Debug, Clone)]
pub struct RowHandle {
    table: LedgerTable,
    row: usize,
    schema: Arc<SheetSchema>,
}

impl RowHandle {
    pub fn table(&self) -> LedgerTable {
        self.table
    }

    /// 1-based sheet row.
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn schema(&self) -> &Arc<SheetSchema> {
        &self.schema
    }
}

// =============================================================================
// Workbook
// =============================================================================

/// The ledger's view of the backend.
///
/// Cheap to clone; all clones share one backend.
///
/// ## Usage
/// ```rust,ignore
/// let workbook = Workbook::new(Arc::new(MemoryWorkbook::new()));
/// workbook.ensure_all().await?;
///
/// let item = workbook.inventory().get("T-1").await?;
/// ```
#[derive(Clone)]
pub struct Workbook {
    store: Arc<dyn SheetStore>,
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl Workbook {
    pub fn new(store: Arc<dyn SheetStore>) -> Self {
        Workbook { store }
    }

    /// The raw backend.
    pub fn store(&self) -> &Arc<dyn SheetStore> {
        &self.store
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    // -------------------------------------------------------------------------
    // Sheets
    // -------------------------------------------------------------------------

    /// Creates `table` with its default header if missing.
    pub async fn ensure_table(&self, table: LedgerTable) -> StoreResult<bool> {
        let created = self
            .store
            .ensure_sheet(table.sheet_name(), &table.default_header())
            .await?;
        if created {
            debug!(table = %table, "Created sheet");
        }
        Ok(created)
    }

    /// Creates every missing table. Returns the ones created.
    pub async fn ensure_all(&self) -> StoreResult<Vec<LedgerTable>> {
        let mut created = Vec::new();
        for table in LedgerTable::ALL {
            if self.ensure_table(table).await? {
                created.push(table);
            }
        }
        Ok(created)
    }

    /// Reads the live header of `table`.
    pub async fn schema(&self, table: LedgerTable) -> StoreResult<Arc<SheetSchema>> {
        let header = self.store.header(table.sheet_name()).await?;
        Ok(Arc::new(SheetSchema::new(table.sheet_name(), header)))
    }

    /// 1-based column of `name` in the live header, or `None`.
    pub async fn resolve_column(&self, table: LedgerTable, name: &str) -> StoreResult<Option<usize>> {
        Ok(self.schema(table).await?.column_of(name))
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Every data row of `table` as records.
    pub async fn read_all(&self, table: LedgerTable) -> StoreResult<Vec<Record>> {
        let schema = self.schema(table).await?;
        let rows = self.store.rows(table.sheet_name()).await?;
        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(idx, cells)| Record::new(idx + FIRST_DATA_ROW, Arc::clone(&schema), cells))
            .collect())
    }

    /// First row of `table` whose key column equals `key`.
    ///
    /// ## Errors
    /// - `NotFound` when no row matches
    /// - `MissingColumn` when the header has no key column
    pub async fn find_row_by_key(&self, table: LedgerTable, key: &str) -> StoreResult<RowHandle> {
        self.probe(table, key)
            .await?
            .ok_or_else(|| StoreError::not_found(table.entity(), key.trim()))
    }

    /// Like [`Self::find_row_by_key`] but absence is `Ok(None)`.
    pub async fn probe(&self, table: LedgerTable, key: &str) -> StoreResult<Option<RowHandle>> {
        let key_column = table.key_column().ok_or_else(|| StoreError::MissingColumn {
            sheet: table.sheet_name().to_string(),
            column: "key".to_string(),
        })?;
        self.find_row_by(table, key_column, key).await
    }

    /// First row of `table` whose `column` equals `value`.
    pub async fn find_row_by(
        &self,
        table: LedgerTable,
        column: &str,
        value: &str,
    ) -> StoreResult<Option<RowHandle>> {
        let schema = self.schema(table).await?;
        let idx = schema.column_of(column).ok_or_else(|| StoreError::MissingColumn {
            sheet: table.sheet_name().to_string(),
            column: column.to_string(),
        })?;

        let row = self.store.find_row(table.sheet_name(), idx, value).await?;
        Ok(row.map(|row| RowHandle { table, row, schema }))
    }

    /// Re-reads the located row.
    pub async fn read_record(&self, handle: &RowHandle) -> StoreResult<Record> {
        let cells = self
            .store
            .read_row(handle.table.sheet_name(), handle.row)
            .await?;
        Ok(Record::new(handle.row, Arc::clone(&handle.schema), cells))
    }

    /// Reads one named cell. `None` when the column is absent.
    pub async fn read_field(&self, handle: &RowHandle, name: &str) -> StoreResult<Option<String>> {
        match handle.schema.column_of(name) {
            Some(col) => {
                let value = self
                    .store
                    .read_cell(handle.table.sheet_name(), handle.row, col)
                    .await?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Writes one named cell. Returns `false` (and writes nothing) when the
    /// column is absent.
    pub async fn write_field(&self, handle: &RowHandle, name: &str, value: &str) -> StoreResult<bool> {
        let Some(col) = handle.schema.column_of(name) else {
            debug!(table = %handle.table, column = name, "Column absent, write skipped");
            return Ok(false);
        };

        self.store
            .update_cell(handle.table.sheet_name(), handle.row, col, value)
            .await?;
        debug!(table = %handle.table, row = handle.row, column = name, value, "Field written");
        Ok(true)
    }

    /// Appends one row built against the live header.
    pub async fn append_record(&self, table: LedgerTable, fields: &[(&str, String)]) -> StoreResult<()> {
        let record = fields.to_vec();
        self.append_records(table, &[record]).await?;
        Ok(())
    }

    /// Appends rows built against the live header, in one backend call.
    pub async fn append_records(
        &self,
        table: LedgerTable,
        records: &[Vec<(&str, String)>],
    ) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let schema = self.schema(table).await?;
        let rows: Vec<Vec<String>> = records.iter().map(|r| schema.build_row(r)).collect();

        self.store.append_rows(table.sheet_name(), &rows).await?;
        debug!(table = %table, count = rows.len(), "Rows appended");
        Ok(rows.len())
    }

    /// Deletes the located row; later rows shift up.
    pub async fn delete_row(&self, handle: &RowHandle) -> StoreResult<()> {
        self.store
            .delete_row(handle.table.sheet_name(), handle.row)
            .await?;
        debug!(table = %handle.table, row = handle.row, "Row deleted");
        Ok(())
    }

    /// Replaces the whole table in one call.
    ///
    /// ## Errors
    /// - `EmptyInputRejected` when `rows` is empty; the table is untouched
    pub async fn overwrite_table(
        &self,
        table: LedgerTable,
        header: &[String],
        rows: &[Vec<String>],
    ) -> StoreResult<()> {
        if rows.is_empty() {
            return Err(StoreError::EmptyInputRejected(table.sheet_name().to_string()));
        }

        self.store.overwrite(table.sheet_name(), header, rows).await?;
        debug!(table = %table, count = rows.len(), "Table overwritten");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Repositories
    // -------------------------------------------------------------------------

    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.clone())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.clone())
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.clone())
    }

    pub fn expenses(&self) -> ExpenseRepository {
        ExpenseRepository::new(self.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
