//! # In-Memory Workbook
//!
//! A [`SheetStore`] kept in process memory. Used by tests, demos and the
//! `memory` backend setting.
//!
//! ## Fault Injection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  wb.inject(Fault::new(StoreOp::AppendRows, "TransactionItems",          │
//! │                       FaultKind::Backend("quota".into())));             │
//! │                                                                         │
//! │  commit_sale ──► header append ✓ ──► items append ✗ Backend             │
//! │                                                                         │
//! │  Faults match on (operation, sheet), can skip the first N matching      │
//! │  calls and fire a bounded number of times.                              │
//! │                                                                         │
//! │  FaultKind::Clobber(v) lets an update_cell "succeed" and then replaces  │
//! │  the cell with v, as if a concurrent writer got there last.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::debug;

use super::{cell_matches, SheetStore, FIRST_DATA_ROW};
use crate::error::{StoreError, StoreResult};

// =============================================================================
// Fault Injection
// =============================================================================

/// Backend operations, for matching faults and counting calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    EnsureSheet,
    Header,
    Rows,
    ReadRow,
    FindRow,
    ReadCell,
    UpdateCell,
    AppendRows,
    DeleteRow,
    Overwrite,
}

/// What an injected fault does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// Fail with [`StoreError::RateLimited`].
    RateLimited,
    /// Fail with [`StoreError::Backend`].
    Backend(String),
    /// `UpdateCell` only: the write lands, then the cell is set to this value.
    Clobber(String),
}

/// One injected fault.
#[derive(Debug, Clone)]
pub struct Fault {
    op: StoreOp,
    sheet: String,
    kind: FaultKind,
    skip: usize,
    remaining: usize,
}

impl Fault {
    /// Fires once on the next matching call.
    pub fn new(op: StoreOp, sheet: impl Into<String>, kind: FaultKind) -> Self {
        Fault {
            op,
            sheet: sheet.into(),
            kind,
            skip: 0,
            remaining: 1,
        }
    }

    /// Lets the first `n` matching calls through.
    pub fn after(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    /// Fires on `n` matching calls instead of one.
    pub fn times(mut self, n: usize) -> Self {
        self.remaining = n;
        self
    }
}

// =============================================================================
// Memory Workbook
// =============================================================================

#[derive(Debug, Clone, Default)]
struct Sheet {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Process-local workbook.
#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    sheets: RwLock<HashMap<String, Sheet>>,
    faults: Mutex<Vec<Fault>>,
    calls: Mutex<HashMap<StoreOp, usize>>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sheet with the given header and rows (builder style, for tests).
    pub fn with_sheet(mut self, name: &str, header: &[&str], rows: &[&[&str]]) -> Self {
        let sheet = Sheet {
            header: header.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        };
        self.sheets.get_mut().insert(name.to_string(), sheet);
        self
    }

    /// Registers a fault.
    pub fn inject(&self, fault: Fault) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push(fault);
        }
    }

    /// Removes every pending fault.
    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.clear();
        }
    }

    /// Number of calls made for `op` so far.
    pub fn call_count(&self, op: StoreOp) -> usize {
        self.calls
            .lock()
            .map(|c| c.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Copy of a sheet's header and rows, `None` if it does not exist.
    pub async fn snapshot(&self, sheet: &str) -> Option<(Vec<String>, Vec<Vec<String>>)> {
        let sheets = self.sheets.read().await;
        sheets
            .get(sheet)
            .map(|s| (s.header.clone(), s.rows.clone()))
    }

    /// Counts the call and returns the fault to apply, if any.
    fn intercept(&self, op: StoreOp, sheet: &str) -> Option<FaultKind> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(op).or_insert(0) += 1;
        }

        let mut faults = self.faults.lock().ok()?;
        let idx = faults
            .iter()
            .position(|f| f.op == op && f.sheet == sheet && f.remaining > 0)?;
        let fault = &mut faults[idx];
        if fault.skip > 0 {
            fault.skip -= 1;
            return None;
        }
        fault.remaining -= 1;
        let kind = fault.kind.clone();
        if fault.remaining == 0 {
            faults.remove(idx);
        }
        debug!(?op, sheet, ?kind, "Injected fault fired");
        Some(kind)
    }

    /// Applies a failing fault. `Clobber` is handled by `update_cell` itself.
    fn check(&self, op: StoreOp, sheet: &str) -> StoreResult<Option<String>> {
        match self.intercept(op, sheet) {
            None => Ok(None),
            Some(FaultKind::RateLimited) => Err(StoreError::RateLimited),
            Some(FaultKind::Backend(msg)) => Err(StoreError::Backend(msg)),
            Some(FaultKind::Clobber(value)) => Ok(Some(value)),
        }
    }
}

fn data_index(sheet_name: &str, sheet: &Sheet, row: usize) -> StoreResult<usize> {
    if row < FIRST_DATA_ROW || row - FIRST_DATA_ROW >= sheet.rows.len() {
        return Err(StoreError::RowOutOfRange {
            sheet: sheet_name.to_string(),
            row,
        });
    }
    Ok(row - FIRST_DATA_ROW)
}

fn check_column(sheet: &str, column: usize) -> StoreResult<()> {
    if column == 0 {
        return Err(StoreError::ColumnOutOfRange {
            sheet: sheet.to_string(),
            column,
        });
    }
    Ok(())
}

#[async_trait]
impl SheetStore for MemoryWorkbook {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_sheet(&self, sheet: &str, header: &[String]) -> StoreResult<bool> {
        self.check(StoreOp::EnsureSheet, sheet)?;
        let mut sheets = self.sheets.write().await;
        if sheets.contains_key(sheet) {
            return Ok(false);
        }
        sheets.insert(
            sheet.to_string(),
            Sheet {
                header: header.to_vec(),
                rows: Vec::new(),
            },
        );
        Ok(true)
    }

    async fn header(&self, sheet: &str) -> StoreResult<Vec<String>> {
        self.check(StoreOp::Header, sheet)?;
        let sheets = self.sheets.read().await;
        sheets
            .get(sheet)
            .map(|s| s.header.clone())
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))
    }

    async fn rows(&self, sheet: &str) -> StoreResult<Vec<Vec<String>>> {
        self.check(StoreOp::Rows, sheet)?;
        let sheets = self.sheets.read().await;
        sheets
            .get(sheet)
            .map(|s| s.rows.clone())
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))
    }

    async fn read_row(&self, sheet: &str, row: usize) -> StoreResult<Vec<String>> {
        self.check(StoreOp::ReadRow, sheet)?;
        let sheets = self.sheets.read().await;
        let s = sheets
            .get(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        let idx = data_index(sheet, s, row)?;
        Ok(s.rows[idx].clone())
    }

    async fn find_row(&self, sheet: &str, column: usize, key: &str) -> StoreResult<Option<usize>> {
        self.check(StoreOp::FindRow, sheet)?;
        check_column(sheet, column)?;
        let sheets = self.sheets.read().await;
        let s = sheets
            .get(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        Ok(s.rows
            .iter()
            .position(|r| r.get(column - 1).map(|c| cell_matches(c, key)).unwrap_or(false))
            .map(|idx| idx + FIRST_DATA_ROW))
    }

    async fn read_cell(&self, sheet: &str, row: usize, column: usize) -> StoreResult<String> {
        self.check(StoreOp::ReadCell, sheet)?;
        check_column(sheet, column)?;
        let sheets = self.sheets.read().await;
        let s = sheets
            .get(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        let cells = if row == 1 {
            &s.header
        } else {
            &s.rows[data_index(sheet, s, row)?]
        };
        Ok(cells.get(column - 1).cloned().unwrap_or_default())
    }

    async fn update_cell(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> StoreResult<()> {
        let clobber = self.check(StoreOp::UpdateCell, sheet)?;
        check_column(sheet, column)?;
        let mut sheets = self.sheets.write().await;
        let s = sheets
            .get_mut(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        let cells = if row == 1 {
            &mut s.header
        } else {
            let idx = data_index(sheet, s, row)?;
            &mut s.rows[idx]
        };
        if cells.len() < column {
            cells.resize(column, String::new());
        }
        cells[column - 1] = clobber.unwrap_or_else(|| value.to_string());
        Ok(())
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> StoreResult<()> {
        self.check(StoreOp::AppendRows, sheet)?;
        let mut sheets = self.sheets.write().await;
        let s = sheets
            .get_mut(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        s.rows.extend(rows.iter().cloned());
        Ok(())
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> StoreResult<()> {
        self.check(StoreOp::DeleteRow, sheet)?;
        let mut sheets = self.sheets.write().await;
        let s = sheets
            .get_mut(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        let idx = data_index(sheet, s, row)?;
        s.rows.remove(idx);
        Ok(())
    }

    async fn overwrite(
        &self,
        sheet: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> StoreResult<()> {
        self.check(StoreOp::Overwrite, sheet)?;
        let mut sheets = self.sheets.write().await;
        sheets.insert(
            sheet.to_string(),
            Sheet {
                header: header.to_vec(),
                rows: rows.to_vec(),
            },
        );
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn workbook() -> MemoryWorkbook {
        MemoryWorkbook::new().with_sheet(
            "Inventory",
            &["SKU", "Name", "StockQty"],
            &[&["T-1", "Red", "12"], &["T-2", "Blue", "0"], &["T-1", "Dup", "3"]],
        )
    }

    #[tokio::test]
    async fn test_find_row_first_match_wins() {
        let wb = workbook();
        assert_eq!(wb.find_row("Inventory", 1, "T-1").await.unwrap(), Some(2));
        assert_eq!(wb.find_row("Inventory", 1, " T-2 ").await.unwrap(), Some(3));
        assert_eq!(wb.find_row("Inventory", 1, "T-9").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_and_update_cell() {
        let wb = workbook();
        assert_eq!(wb.read_cell("Inventory", 1, 3).await.unwrap(), "StockQty");
        assert_eq!(wb.read_cell("Inventory", 2, 3).await.unwrap(), "12");
        assert_eq!(wb.read_cell("Inventory", 2, 9).await.unwrap(), "");

        wb.update_cell("Inventory", 2, 5, "x").await.unwrap();
        assert_eq!(wb.read_row("Inventory", 2).await.unwrap(), strings(&["T-1", "Red", "12", "", "x"]));
    }

    #[tokio::test]
    async fn test_delete_shifts_rows_up() {
        let wb = workbook();
        wb.delete_row("Inventory", 2).await.unwrap();
        assert_eq!(wb.read_cell("Inventory", 2, 1).await.unwrap(), "T-2");
        assert!(matches!(
            wb.delete_row("Inventory", 1).await,
            Err(StoreError::RowOutOfRange { row: 1, .. })
        ));
        assert!(matches!(
            wb.delete_row("Inventory", 4).await,
            Err(StoreError::RowOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_sheet() {
        let wb = MemoryWorkbook::new();
        assert!(matches!(
            wb.header("Nope").await,
            Err(StoreError::SheetNotFound(_))
        ));
        assert!(wb.ensure_sheet("Nope", &strings(&["A"])).await.unwrap());
        assert!(!wb.ensure_sheet("Nope", &strings(&["B"])).await.unwrap());
        assert_eq!(wb.header("Nope").await.unwrap(), strings(&["A"]));
    }

    #[tokio::test]
    async fn test_fault_skip_and_times() {
        let wb = workbook();
        wb.inject(
            Fault::new(StoreOp::ReadCell, "Inventory", FaultKind::RateLimited)
                .after(1)
                .times(2),
        );
        assert!(wb.read_cell("Inventory", 2, 1).await.is_ok());
        assert!(matches!(wb.read_cell("Inventory", 2, 1).await, Err(StoreError::RateLimited)));
        assert!(matches!(wb.read_cell("Inventory", 2, 1).await, Err(StoreError::RateLimited)));
        assert!(wb.read_cell("Inventory", 2, 1).await.is_ok());
        assert_eq!(wb.call_count(StoreOp::ReadCell), 4);
    }

    #[tokio::test]
    async fn test_fault_only_matches_its_sheet() {
        let wb = workbook().with_sheet("Settings", &["Key", "Value"], &[]);
        wb.inject(Fault::new(StoreOp::Rows, "Settings", FaultKind::Backend("down".into())));
        assert!(wb.rows("Inventory").await.is_ok());
        assert!(matches!(wb.rows("Settings").await, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_clobber() {
        let wb = workbook();
        wb.inject(Fault::new(
            StoreOp::UpdateCell,
            "Inventory",
            FaultKind::Clobber("99".into()),
        ));
        wb.update_cell("Inventory", 2, 3, "11").await.unwrap();
        assert_eq!(wb.read_cell("Inventory", 2, 3).await.unwrap(), "99");
    }
}
