//! # SQLite Workbook
//!
//! A [`SheetStore`] persisted in SQLite through a sqlx pool.
//!
//! ## Call Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SheetStore call        SQL                                             │
//! │  ───────────────────    ─────────────────────────────────────────────  │
//! │  header                 SELECT header FROM sheets                       │
//! │  rows / find_row        SELECT cells ... ORDER BY position              │
//! │  read_cell / read_row   SELECT cells ... WHERE position = ?             │
//! │  update_cell            BEGIN; SELECT cells; UPDATE cells; COMMIT       │
//! │  append_rows            BEGIN; MAX(position); INSERT × n; COMMIT        │
//! │  delete_row             BEGIN; DELETE; UPDATE position - 1; COMMIT      │
//! │  overwrite              BEGIN; UPDATE header; DELETE; INSERT × n; COMMIT│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each call is one short SQL transaction, matching the one-call-one-request
//! shape of a hosted spreadsheet. Multi-call operations get no isolation here
//! either; that is the engine's problem, by the same rules as remote sheets.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{cell_matches, SheetStore, FIRST_DATA_ROW};
use crate::error::{StoreError, StoreResult};
use crate::pool::{self, DbConfig};

/// SQLite-backed workbook.
#[derive(Debug, Clone)]
pub struct SqliteWorkbook {
    pool: SqlitePool,
}

impl SqliteWorkbook {
    /// Connects (creating the file and schema if needed).
    pub async fn open(config: &DbConfig) -> StoreResult<Self> {
        let pool = pool::connect(config).await?;
        Ok(SqliteWorkbook { pool })
    }

    /// Wraps an existing, migrated pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        SqliteWorkbook { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the pool. Later calls fail with `Backend`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn require_sheet<'e, E>(executor: E, sheet: &str) -> StoreResult<Vec<String>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let header: Option<String> = sqlx::query_scalar("SELECT header FROM sheets WHERE name = ?1")
            .bind(sheet)
            .fetch_optional(executor)
            .await?;
        match header {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(StoreError::SheetNotFound(sheet.to_string())),
        }
    }
}

fn position_of(sheet: &str, row: usize) -> StoreResult<i64> {
    if row < FIRST_DATA_ROW {
        return Err(StoreError::RowOutOfRange {
            sheet: sheet.to_string(),
            row,
        });
    }
    Ok((row - FIRST_DATA_ROW) as i64)
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
impl SheetStore for SqliteWorkbook {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn ensure_sheet(&self, sheet: &str, header: &[String]) -> StoreResult<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO sheets (name, header) VALUES (?1, ?2)")
            .bind(sheet)
            .bind(serde_json::to_string(header)?)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn header(&self, sheet: &str) -> StoreResult<Vec<String>> {
        Self::require_sheet(&self.pool, sheet).await
    }

    async fn rows(&self, sheet: &str) -> StoreResult<Vec<Vec<String>>> {
        let mut tx = self.pool.begin().await?;
        Self::require_sheet(&mut *tx, sheet).await?;

        let rows = sqlx::query("SELECT cells FROM sheet_rows WHERE sheet = ?1 ORDER BY position")
            .bind(sheet)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        rows.iter()
            .map(|r| {
                let json: String = r.try_get("cells")?;
                Ok(serde_json::from_str(&json)?)
            })
            .collect()
    }

    async fn read_row(&self, sheet: &str, row: usize) -> StoreResult<Vec<String>> {
        let position = position_of(sheet, row)?;
        let mut tx = self.pool.begin().await?;
        Self::require_sheet(&mut *tx, sheet).await?;

        let cells: Option<String> = sqlx::query_scalar(
            "SELECT cells FROM sheet_rows WHERE sheet = ?1 AND position = ?2",
        )
        .bind(sheet)
        .bind(position)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        match cells {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(StoreError::RowOutOfRange {
                sheet: sheet.to_string(),
                row,
            }),
        }
    }

    async fn find_row(&self, sheet: &str, column: usize, key: &str) -> StoreResult<Option<usize>> {
        check_column(sheet, column)?;
        let rows = self.rows(sheet).await?;
        Ok(rows
            .iter()
            .position(|r| r.get(column - 1).map(|c| cell_matches(c, key)).unwrap_or(false))
            .map(|idx| idx + FIRST_DATA_ROW))
    }

    async fn read_cell(&self, sheet: &str, row: usize, column: usize) -> StoreResult<String> {
        check_column(sheet, column)?;
        let cells = if row == 1 {
            self.header(sheet).await?
        } else {
            self.read_row(sheet, row).await?
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
        check_column(sheet, column)?;
        let mut tx = self.pool.begin().await?;
        let header = Self::require_sheet(&mut *tx, sheet).await?;

        if row == 1 {
            let mut header = header;
            if header.len() < column {
                header.resize(column, String::new());
            }
            header[column - 1] = value.to_string();
            sqlx::query("UPDATE sheets SET header = ?1 WHERE name = ?2")
                .bind(serde_json::to_string(&header)?)
                .bind(sheet)
                .execute(&mut *tx)
                .await?;
        } else {
            let position = position_of(sheet, row)?;
            let current: Option<(i64, String)> = sqlx::query_as(
                "SELECT id, cells FROM sheet_rows WHERE sheet = ?1 AND position = ?2",
            )
            .bind(sheet)
            .bind(position)
            .fetch_optional(&mut *tx)
            .await?;

            let (id, json) = current.ok_or_else(|| StoreError::RowOutOfRange {
                sheet: sheet.to_string(),
                row,
            })?;
            let mut cells: Vec<String> = serde_json::from_str(&json)?;
            if cells.len() < column {
                cells.resize(column, String::new());
            }
            cells[column - 1] = value.to_string();

            sqlx::query("UPDATE sheet_rows SET cells = ?1 WHERE id = ?2")
                .bind(serde_json::to_string(&cells)?)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(sheet, row, column, "Cell updated");
        Ok(())
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::require_sheet(&mut *tx, sheet).await?;

        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM sheet_rows WHERE sheet = ?1",
        )
        .bind(sheet)
        .fetch_one(&mut *tx)
        .await?;

        for (offset, cells) in rows.iter().enumerate() {
            sqlx::query("INSERT INTO sheet_rows (sheet, position, cells) VALUES (?1, ?2, ?3)")
                .bind(sheet)
                .bind(next + offset as i64)
                .bind(serde_json::to_string(cells)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(sheet, count = rows.len(), "Rows appended");
        Ok(())
    }

    async fn delete_row(&self, sheet: &str, row: usize) -> StoreResult<()> {
        let position = position_of(sheet, row)?;
        let mut tx = self.pool.begin().await?;
        Self::require_sheet(&mut *tx, sheet).await?;

        let deleted = sqlx::query("DELETE FROM sheet_rows WHERE sheet = ?1 AND position = ?2")
            .bind(sheet)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::RowOutOfRange {
                sheet: sheet.to_string(),
                row,
            });
        }

        sqlx::query("UPDATE sheet_rows SET position = position - 1 WHERE sheet = ?1 AND position > ?2")
            .bind(sheet)
            .bind(position)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(sheet, row, "Row deleted");
        Ok(())
    }

    async fn overwrite(
        &self,
        sheet: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let header_json = serde_json::to_string(header)?;

        sqlx::query(
            "INSERT INTO sheets (name, header) VALUES (?1, ?2) \
             ON CONFLICT(name) DO UPDATE SET header = excluded.header",
        )
        .bind(sheet)
        .bind(&header_json)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM sheet_rows WHERE sheet = ?1")
            .bind(sheet)
            .execute(&mut *tx)
            .await?;

        for (position, cells) in rows.iter().enumerate() {
            sqlx::query("INSERT INTO sheet_rows (sheet, position, cells) VALUES (?1, ?2, ?3)")
                .bind(sheet)
                .bind(position as i64)
                .bind(serde_json::to_string(cells)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(sheet, count = rows.len(), "Sheet overwritten");
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

    async fn workbook() -> SqliteWorkbook {
        let wb = SqliteWorkbook::open(&DbConfig::in_memory()).await.unwrap();
        wb.ensure_sheet("Inventory", &strings(&["SKU", "Name", "StockQty"]))
            .await
            .unwrap();
        wb.append_rows(
            "Inventory",
            &[
                strings(&["T-1", "Red", "12"]),
                strings(&["T-2", "Blue", "0"]),
                strings(&["T-3", "Green", "4"]),
            ],
        )
        .await
        .unwrap();
        wb
    }

    #[tokio::test]
    async fn test_rows_and_find() {
        let wb = workbook().await;
        assert_eq!(wb.rows("Inventory").await.unwrap().len(), 3);
        assert_eq!(wb.find_row("Inventory", 1, "T-2").await.unwrap(), Some(3));
        assert_eq!(wb.find_row("Inventory", 1, "T-9").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_cell_widens_row() {
        let wb = workbook().await;
        wb.update_cell("Inventory", 2, 3, "11").await.unwrap();
        wb.update_cell("Inventory", 2, 5, "x").await.unwrap();
        assert_eq!(
            wb.read_row("Inventory", 2).await.unwrap(),
            strings(&["T-1", "Red", "11", "", "x"])
        );
        assert_eq!(wb.read_cell("Inventory", 1, 2).await.unwrap(), "Name");
    }

    #[tokio::test]
    async fn test_delete_row_shifts_positions() {
        let wb = workbook().await;
        wb.delete_row("Inventory", 2).await.unwrap();
        assert_eq!(wb.read_cell("Inventory", 2, 1).await.unwrap(), "T-2");
        assert_eq!(wb.read_cell("Inventory", 3, 1).await.unwrap(), "T-3");
        assert!(matches!(
            wb.read_row("Inventory", 4).await,
            Err(StoreError::RowOutOfRange { .. })
        ));

        wb.append_rows("Inventory", &[strings(&["T-4", "Pink", "1"])])
            .await
            .unwrap();
        assert_eq!(wb.read_cell("Inventory", 4, 1).await.unwrap(), "T-4");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_everything() {
        let wb = workbook().await;
        wb.overwrite(
            "Inventory",
            &strings(&["SKU", "Cost"]),
            &[strings(&["Z-1", "2.5"])],
        )
        .await
        .unwrap();
        assert_eq!(wb.header("Inventory").await.unwrap(), strings(&["SKU", "Cost"]));
        assert_eq!(wb.rows("Inventory").await.unwrap(), vec![strings(&["Z-1", "2.5"])]);
    }

    #[tokio::test]
    async fn test_missing_sheet() {
        let wb = workbook().await;
        assert!(matches!(
            wb.rows("Expenses").await,
            Err(StoreError::SheetNotFound(_))
        ));
        assert!(!wb.ensure_sheet("Inventory", &[]).await.unwrap());
    }
}
