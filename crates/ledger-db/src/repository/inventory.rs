//! # Inventory Repository
//!
//! Reads and writes `Inventory` rows.
//!
//! SKUs are not guaranteed unique. Every lookup returns the first matching
//! row, and [`InventoryRepository::cost_index`] keeps the first row per SKU.

use std::collections::HashMap;

use ledger_core::InventoryItem;
use tracing::debug;

use crate::error::StoreResult;
use crate::tables::LedgerTable;
use crate::workbook::{RowHandle, Workbook};

const TABLE: LedgerTable = LedgerTable::Inventory;

/// Repository for inventory rows.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    workbook: Workbook,
}

impl InventoryRepository {
    pub fn new(workbook: Workbook) -> Self {
        InventoryRepository { workbook }
    }

    /// All items in sheet order.
    pub async fn list(&self) -> StoreResult<Vec<InventoryItem>> {
        let records = self.workbook.read_all(TABLE).await?;
        Ok(records.iter().map(InventoryItem::from_record).collect())
    }

    /// The first item with `sku`.
    ///
    /// ## Returns
    /// * `Err(NotFound)` - no such SKU
    pub async fn get(&self, sku: &str) -> StoreResult<InventoryItem> {
        let handle = self.locate(sku).await?;
        let record = self.workbook.read_record(&handle).await?;
        Ok(InventoryItem::from_record(&record))
    }

    /// Row of the first item with `sku`, or `NotFound`.
    pub async fn locate(&self, sku: &str) -> StoreResult<RowHandle> {
        self.workbook.find_row_by_key(TABLE, sku).await
    }

    /// Row of the first item with `sku`, if any.
    pub async fn probe(&self, sku: &str) -> StoreResult<Option<RowHandle>> {
        self.workbook.probe(TABLE, sku).await
    }

    /// Appends one item.
    pub async fn insert(&self, item: &InventoryItem) -> StoreResult<()> {
        debug!(sku = %item.sku, stock = item.stock_qty, "Inserting inventory item");
        self.workbook.append_record(TABLE, &item.to_fields()).await
    }

    /// Current unit cost per SKU. Blank or absent costs map to `None`.
    pub async fn cost_index(&self) -> StoreResult<HashMap<String, Option<f64>>> {
        let mut index = HashMap::new();
        for item in self.list().await? {
            index.entry(item.sku).or_insert(item.cost);
        }
        Ok(index)
    }

    /// Replaces the whole table. `EmptyInputRejected` when `rows` is empty.
    pub async fn replace_all(&self, header: &[String], rows: &[Vec<String>]) -> StoreResult<()> {
        debug!(count = rows.len(), "Replacing inventory table");
        self.workbook.overwrite_table(TABLE, header, rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryWorkbook;
    use ledger_core::Money;
    use std::sync::Arc;

    fn repo() -> InventoryRepository {
        let mem = MemoryWorkbook::new().with_sheet(
            "Inventory",
            &["SKU", "Name", "Price", "StockQty", "WholesalePrice", "Cost"],
            &[
                &["T-1", "Red", "10.99", "12", "8.00", "2.5"],
                &["T-2", "Blue", "$4.00", "", "", ""],
                &["T-1", "Dup", "1.00", "1", "", "9"],
            ],
        );
        Workbook::new(Arc::new(mem)).inventory()
    }

    #[tokio::test]
    async fn test_get_reads_typed_item() {
        let repo = repo();
        let item = repo.get("T-1").await.unwrap();
        assert_eq!(item.name, "Red");
        assert_eq!(item.price, Money::from_cents(1099));
        assert_eq!(item.stock_qty, 12);
        assert_eq!(item.cost, Some(2.5));

        let blue = repo.get("T-2").await.unwrap();
        assert_eq!(blue.stock_qty, 0);
        assert_eq!(blue.cost, None);
    }

    #[tokio::test]
    async fn test_cost_index_first_row_wins() {
        let index = repo().cost_index().await.unwrap();
        assert_eq!(index.get("T-1"), Some(&Some(2.5)));
        assert_eq!(index.get("T-2"), Some(&None));
    }

    #[tokio::test]
    async fn test_insert_then_list() {
        let repo = repo();
        repo.insert(&InventoryItem {
            sku: "T-3".into(),
            name: "Green".into(),
            price: Money::from_cents(500),
            wholesale_price: Money::zero(),
            stock_qty: 4,
            cost: Some(1.25),
        })
        .await
        .unwrap();

        let items = repo.list().await.unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[3].sku, "T-3");
        assert_eq!(items[3].cost, Some(1.25));
    }
}
