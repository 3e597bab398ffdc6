//! # Inventory Engine
//!
//! Stock quantity and weighted-average cost mutation.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_item    append one row                    (SKU not deduped)     │
//! │  restock        read StockQty + Cost ─► blend ─► write StockQty, Cost   │
//! │  batch_replace  overwrite the whole table          (empty refused)      │
//! │  decrement      read StockQty ─► max(0, s − q) ─► write StockQty        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every read-modify-write here is two or three backend calls with nothing
//! held in between. A concurrent writer on the same row can be lost.

use ledger_core::costing::{blend_unit_cost, decrement_stock, StockDecrement};
use ledger_core::validation::{
    validate_name, validate_non_negative, validate_opening_stock, validate_quantity, validate_sku,
    validate_unit_cost,
};
use ledger_core::{col, format_cost, InventoryItem, Money, SaleLine, ValidationError};
use ledger_db::{StoreError, Workbook};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::config::OversellPolicy;
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Types
// =============================================================================

/// A product to add to inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub sku: String,
    pub name: String,
    pub price: Money,
    pub wholesale_price: Money,
    pub opening_stock: i64,
    /// Unit cost of the opening stock.
    pub cost: Option<f64>,
}

/// What a restock changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestockOutcome {
    pub previous_stock: i64,
    pub new_stock: i64,
    /// `None` when the Cost column is absent.
    pub previous_cost: Option<f64>,
    pub new_cost: f64,
    /// `false` when the Cost column is absent and only stock was written.
    pub cost_written: bool,
}

// =============================================================================
// Inventory Engine
// =============================================================================

/// Owns every write to `Inventory`.
#[derive(Debug, Clone)]
pub struct InventoryEngine {
    workbook: Workbook,
    oversell: OversellPolicy,
}

impl InventoryEngine {
    pub fn new(workbook: Workbook, oversell: OversellPolicy) -> Self {
        InventoryEngine { workbook, oversell }
    }

    pub fn oversell_policy(&self) -> OversellPolicy {
        self.oversell
    }

    pub async fn list(&self) -> EngineResult<Vec<InventoryItem>> {
        Ok(self.workbook.inventory().list().await?)
    }

    /// The first item with `sku`.
    pub async fn get(&self, sku: &str) -> EngineResult<InventoryItem> {
        Ok(self.workbook.inventory().get(sku).await?)
    }

    /// Appends a new item.
    ///
    /// A SKU that already exists is appended anyway; lookups keep returning
    /// the first row.
    pub async fn create_item(&self, item: NewItem) -> EngineResult<InventoryItem> {
        validate_sku(&item.sku)?;
        validate_name("name", &item.name)?;
        validate_non_negative("price", item.price)?;
        validate_non_negative("wholesale price", item.wholesale_price)?;
        validate_opening_stock(item.opening_stock)?;
        if let Some(cost) = item.cost {
            validate_unit_cost(cost)?;
        }

        let repo = self.workbook.inventory();
        if repo.probe(&item.sku).await?.is_some() {
            warn!(sku = %item.sku, "SKU already exists, appending duplicate row");
        }

        let row = InventoryItem {
            sku: item.sku.trim().to_string(),
            name: item.name.trim().to_string(),
            price: item.price,
            wholesale_price: item.wholesale_price,
            stock_qty: item.opening_stock,
            cost: item.cost,
        };
        repo.insert(&row).await?;

        info!(sku = %row.sku, stock = row.stock_qty, "Inventory item created");
        Ok(row)
    }

    /// Receives `qty_to_add` units at `new_unit_cost` each.
    ///
    /// ## Cost Blend
    /// `(s0·c0 + q·c1) / (s0 + q)`, or exactly `c1` when `s0 ≤ 0`.
    /// A blank Cost cell counts as `c0 = 0`. A negative StockQty cell counts
    /// as zero on hand, so the new stock is `max(0, s0) + q`.
    ///
    /// ## Errors
    /// - `NotFound` when the SKU is absent
    /// - `InvalidInput` when `qty_to_add ≤ 0`, the cost is negative, the
    ///   existing StockQty/Cost cell is not a number, or the new stock does
    ///   not fit in an `i64`
    /// - `RestockIncomplete` when StockQty was written but Cost was not.
    ///   Do not retry the restock in that case.
    pub async fn restock(
        &self,
        sku: &str,
        qty_to_add: i64,
        new_unit_cost: f64,
    ) -> EngineResult<RestockOutcome> {
        validate_quantity(qty_to_add)?;
        validate_unit_cost(new_unit_cost)?;

        let handle = self.workbook.inventory().locate(sku).await?;
        let record = self.workbook.read_record(&handle).await?;

        let previous_stock = record
            .quantity(col::STOCK_QTY)?
            .ok_or_else(|| missing_column(col::STOCK_QTY))?;
        let previous_cost = record.decimal(col::COST)?;

        let on_hand = previous_stock.max(0);
        if previous_stock < 0 {
            warn!(sku, previous_stock, "Negative StockQty treated as zero on hand");
        }
        let new_stock = on_hand.checked_add(qty_to_add).ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "Inventory.StockQty after restock".to_string(),
                min: 0,
                max: i64::MAX,
            }
        })?;
        let new_cost = blend_unit_cost(
            on_hand,
            previous_cost.unwrap_or(0.0),
            qty_to_add,
            new_unit_cost,
        );

        self.workbook
            .write_field(&handle, col::STOCK_QTY, &new_stock.to_string())
            .await?;
        let cost_cell = format_cost(new_cost);
        let cost_written = match self.workbook.write_field(&handle, col::COST, &cost_cell).await {
            Ok(written) => written,
            Err(source) => {
                error!(sku, new_stock, cost = %cost_cell, error = %source, "Cost write failed after StockQty was saved");
                return Err(EngineError::RestockIncomplete {
                    sku: sku.to_string(),
                    stock_written: new_stock,
                    cost: cost_cell,
                    source,
                });
            }
        };

        info!(
            sku,
            previous_stock,
            new_stock,
            new_cost,
            cost_written,
            "Item restocked"
        );

        Ok(RestockOutcome {
            previous_stock,
            new_stock,
            previous_cost,
            new_cost,
            cost_written,
        })
    }

    /// Replaces the whole inventory table; `header` becomes the schema.
    ///
    /// ## Errors
    /// - `EmptyInputRejected` when `rows` is empty (table untouched)
    /// - `InvalidInput` when `header` has no SKU column
    pub async fn batch_replace(&self, header: Vec<String>, rows: Vec<Vec<String>>) -> EngineResult<usize> {
        if rows.is_empty() {
            warn!("Refusing to replace inventory with an empty table");
            return Err(EngineError::EmptyInputRejected(
                ledger_db::LedgerTable::Inventory.sheet_name().to_string(),
            ));
        }

        let header: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();
        if !header.iter().any(|h| h == col::SKU) {
            return Err(ValidationError::Required {
                field: "SKU column".to_string(),
            }
            .into());
        }

        self.workbook.inventory().replace_all(&header, &rows).await?;
        info!(count = rows.len(), "Inventory replaced");
        Ok(rows.len())
    }

    // -------------------------------------------------------------------------
    // Sale support
    // -------------------------------------------------------------------------

    /// Refuses the cart if any SKU is short, under the reject policy.
    ///
    /// Quantities of repeated SKUs are summed. Unknown SKUs are ignored here;
    /// the decrement skips them.
    pub async fn check_availability(&self, lines: &[SaleLine]) -> EngineResult<()> {
        if self.oversell == OversellPolicy::Clamp {
            return Ok(());
        }

        let mut on_hand: HashMap<String, i64> = HashMap::new();
        for item in self.workbook.inventory().list().await? {
            on_hand.entry(item.sku).or_insert(item.stock_qty);
        }

        let mut wanted: HashMap<&str, i64> = HashMap::new();
        for line in lines {
            *wanted.entry(line.sku.trim()).or_default() += line.qty;
        }

        for (sku, requested) in wanted {
            if let Some(&available) = on_hand.get(sku) {
                if requested > available {
                    return Err(EngineError::InsufficientStock {
                        sku: sku.to_string(),
                        available,
                        requested,
                    });
                }
            }
        }
        Ok(())
    }

    /// Decrements one SKU by `qty`, clamping at zero.
    ///
    /// ## Returns
    /// * `Ok(Some(_))` - stock written
    /// * `Ok(None)` - unknown SKU, skipped
    pub async fn decrement(&self, sku: &str, qty: i64) -> EngineResult<Option<StockDecrement>> {
        let Some(handle) = self.workbook.inventory().probe(sku).await? else {
            warn!(sku, qty, "Unknown SKU, stock not decremented");
            return Ok(None);
        };

        let raw = self
            .workbook
            .read_field(&handle, col::STOCK_QTY)
            .await?
            .ok_or_else(|| missing_column(col::STOCK_QTY))?;
        let current = ledger_core::sheet::parse_quantity(&raw).ok_or_else(|| {
            EngineError::from(ValidationError::invalid_format(
                "Inventory.StockQty",
                format!("'{}' is not a number", raw.trim()),
            ))
        })?;

        let outcome = decrement_stock(current, qty);
        self.workbook
            .write_field(&handle, col::STOCK_QTY, &outcome.after.to_string())
            .await?;

        if outcome.oversold() {
            warn!(sku, before = outcome.before, qty, shortfall = outcome.shortfall, "Oversold, stock clamped at zero");
        } else {
            debug!(sku, before = outcome.before, after = outcome.after, "Stock decremented");
        }
        Ok(Some(outcome))
    }
}

fn missing_column(column: &str) -> EngineError {
    EngineError::Store(StoreError::MissingColumn {
        sheet: ledger_db::LedgerTable::Inventory.sheet_name().to_string(),
        column: column.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_db::{Fault, FaultKind, MemoryWorkbook, StoreOp};
    use std::sync::Arc;

    fn engine(oversell: OversellPolicy) -> (Arc<MemoryWorkbook>, InventoryEngine) {
        let mem = Arc::new(MemoryWorkbook::new().with_sheet(
            "Inventory",
            &["SKU", "Name", "Price", "StockQty", "WholesalePrice", "Cost"],
            &[
                &["T-1", "Red", "10.99", "10", "8.00", "2.0000"],
                &["T-2", "Blue", "4.00", "0", "", ""],
                &["T-3", "Odd", "4.00", "lots", "", ""],
            ],
        ));
        (mem.clone(), InventoryEngine::new(Workbook::new(mem), oversell))
    }

    #[tokio::test]
    async fn test_restock_blends_cost() {
        let (_, inv) = engine(OversellPolicy::Clamp);
        let outcome = inv.restock("T-1", 10, 3.0).await.unwrap();
        assert_eq!(outcome.new_stock, 20);
        assert!((outcome.new_cost - 2.5).abs() < 1e-9);
        assert!(outcome.cost_written);

        let item = inv.get("T-1").await.unwrap();
        assert_eq!(item.stock_qty, 20);
        assert_eq!(item.cost, Some(2.5));
    }

    #[tokio::test]
    async fn test_restock_from_zero_takes_new_cost() {
        let (_, inv) = engine(OversellPolicy::Clamp);
        let outcome = inv.restock("T-2", 4, 1.75).await.unwrap();
        assert_eq!(outcome.previous_cost, Some(0.0));
        assert_eq!(outcome.new_cost, 1.75);
    }

    #[tokio::test]
    async fn test_restock_errors() {
        let (_, inv) = engine(OversellPolicy::Clamp);
        assert!(inv.restock("T-9", 1, 1.0).await.unwrap_err().is_not_found());
        assert!(matches!(
            inv.restock("T-1", 0, 1.0).await,
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            inv.restock("T-3", 1, 1.0).await,
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_restock_over_negative_stock_starts_from_zero() {
        let mem = Arc::new(MemoryWorkbook::new().with_sheet(
            "Inventory",
            &["SKU", "StockQty", "Cost"],
            &[&["T-1", "-3", "10.00"]],
        ));
        let inv = InventoryEngine::new(Workbook::new(mem), OversellPolicy::Clamp);

        let outcome = inv.restock("T-1", 5, 1.0).await.unwrap();
        assert_eq!(outcome.previous_stock, -3);
        assert_eq!(outcome.new_stock, 5);
        assert_eq!(outcome.new_cost, 1.0);

        let item = inv.get("T-1").await.unwrap();
        assert_eq!(item.stock_qty, 5);
        assert_eq!(item.cost, Some(1.0));
    }

    #[tokio::test]
    async fn test_restock_rejects_stock_that_would_overflow() {
        let max = i64::MAX.to_string();
        let mem = Arc::new(MemoryWorkbook::new().with_sheet(
            "Inventory",
            &["SKU", "StockQty", "Cost"],
            &[&["BIG", max.as_str(), "1.00"], &["HUGE", "1e19", "1.00"]],
        ));
        let inv = InventoryEngine::new(Workbook::new(mem.clone()), OversellPolicy::Clamp);

        for sku in ["BIG", "HUGE"] {
            assert!(matches!(
                inv.restock(sku, 1, 1.0).await,
                Err(EngineError::InvalidInput(_))
            ));
        }
        assert_eq!(mem.call_count(StoreOp::UpdateCell), 0);
    }

    #[tokio::test]
    async fn test_cost_write_failure_reports_saved_stock() {
        let (mem, inv) = engine(OversellPolicy::Clamp);
        mem.inject(
            Fault::new(StoreOp::UpdateCell, "Inventory", FaultKind::Backend("quota".into())).after(1),
        );

        let err = inv.restock("T-1", 10, 3.0).await.unwrap_err();
        match err {
            EngineError::RestockIncomplete { sku, stock_written, cost, .. } => {
                assert_eq!(sku, "T-1");
                assert_eq!(stock_written, 20);
                assert_eq!(cost, "2.5");
            }
            other => panic!("unexpected error {:?}", other),
        }

        let item = inv.get("T-1").await.unwrap();
        assert_eq!(item.stock_qty, 20);
        assert_eq!(item.cost, Some(2.0));
    }

    #[tokio::test]
    async fn test_restock_without_cost_column() {
        let mem = Arc::new(MemoryWorkbook::new().with_sheet(
            "Inventory",
            &["SKU", "StockQty"],
            &[&["T-1", "3"]],
        ));
        let inv = InventoryEngine::new(Workbook::new(mem.clone()), OversellPolicy::Clamp);
        let outcome = inv.restock("T-1", 2, 5.0).await.unwrap();
        assert!(!outcome.cost_written);
        assert_eq!(outcome.previous_cost, None);

        let (_, rows) = mem.snapshot("Inventory").await.unwrap();
        assert_eq!(rows[0], vec!["T-1", "5"]);
    }

    #[tokio::test]
    async fn test_batch_replace_rules() {
        let (mem, inv) = engine(OversellPolicy::Clamp);
        let header = vec!["SKU".to_string(), "Name".to_string()];

        let err = inv.batch_replace(header.clone(), vec![]).await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyInputRejected(_)));
        assert_eq!(mem.snapshot("Inventory").await.unwrap().1.len(), 3);

        let err = inv
            .batch_replace(vec!["Name".into()], vec![vec!["x".into()]])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        let n = inv
            .batch_replace(header, vec![vec!["Z-1".into(), "Zed".into()]])
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(inv.list().await.unwrap()[0].sku, "Z-1");
    }

    #[tokio::test]
    async fn test_decrement_clamps_and_skips_unknown() {
        let (_, inv) = engine(OversellPolicy::Clamp);
        let d = inv.decrement("T-1", 12).await.unwrap().unwrap();
        assert_eq!((d.after, d.shortfall), (0, 2));
        assert!(inv.decrement("NOPE", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reject_policy_checks_summed_quantities() {
        let (_, inv) = engine(OversellPolicy::Reject);
        let lines = vec![
            SaleLine::new("T-1", "Red", 6, Money::from_cents(1099)),
            SaleLine::new("T-1", "Red", 6, Money::from_cents(1099)),
        ];
        let err = inv.check_availability(&lines).await.unwrap_err();
        assert!(matches!(err, EngineError::InsufficientStock { requested: 12, .. }));

        let (_, clamp) = engine(OversellPolicy::Clamp);
        assert!(clamp.check_availability(&lines).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_item_validates() {
        let (_, inv) = engine(OversellPolicy::Clamp);
        let bad = NewItem {
            sku: "".into(),
            name: "x".into(),
            price: Money::zero(),
            wholesale_price: Money::zero(),
            opening_stock: 0,
            cost: None,
        };
        assert!(matches!(inv.create_item(bad).await, Err(EngineError::InvalidInput(_))));

        let item = inv
            .create_item(NewItem {
                sku: "T-1".into(),
                name: "Red again".into(),
                price: Money::from_cents(500),
                wholesale_price: Money::zero(),
                opening_stock: 5,
                cost: Some(1.0),
            })
            .await
            .unwrap();
        assert_eq!(item.stock_qty, 5);
        // first match still wins
        assert_eq!(inv.get("T-1").await.unwrap().name, "Red");
        assert_eq!(inv.list().await.unwrap().len(), 4);
    }
}
