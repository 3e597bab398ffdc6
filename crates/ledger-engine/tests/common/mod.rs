//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use ledger_core::{InvoiceStatus, Money, SaleLine};
use ledger_db::MemoryWorkbook;
use ledger_engine::{FixedClock, Ledger, LedgerConfig, SaleRequest};

pub const ANN: &str = "C-a1b2c";
pub const BEN: &str = "C-d3e4f";

pub fn may(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

/// A workbook with three products and two customers, nothing sold yet.
pub fn shop_workbook() -> MemoryWorkbook {
    MemoryWorkbook::new()
        .with_sheet(
            "Inventory",
            &["SKU", "Name", "Price", "StockQty", "WholesalePrice", "Cost"],
            &[
                &["THR-RED", "Red Thread", "10.00", "20", "8.00", "2.50"],
                &["THR-BLU", "Blue Thread", "4.00", "3", "", "1.00"],
                &["PIN-100", "Pins (100)", "6.00", "0", "5.00", ""],
            ],
        )
        .with_sheet(
            "Customers",
            &["CustomerID", "Name", "Email", "Phone", "Joined", "Address", "Notes", "Credit"],
            &[
                &[ANN, "Ann", "ann@example.com", "", "2024-01-01", "", "", "25.00"],
                &[BEN, "Ben", "", "", "2024-02-01", "", "", "0"],
            ],
        )
}

/// A bootstrapped ledger over `mem` with the clock fixed at noon on May 1.
pub async fn ledger_over(mem: Arc<MemoryWorkbook>, config: LedgerConfig) -> Ledger {
    ledger_engine::telemetry::init_test_tracing();
    let ledger = Ledger::with_store(mem, config, Arc::new(FixedClock::on(may(1))));
    ledger.bootstrap().await.unwrap();
    ledger
}

pub async fn shop() -> (Arc<MemoryWorkbook>, Ledger) {
    let mem = Arc::new(shop_workbook());
    let ledger = ledger_over(mem.clone(), LedgerConfig::default()).await;
    (mem, ledger)
}

/// Ten red thread at 10.00 with 8% tax, paid by a guest.
pub fn ten_red() -> SaleRequest {
    SaleRequest {
        lines: vec![SaleLine::new("THR-RED", "Red Thread", 10, Money::from_cents(1_000))],
        total_amount: Money::from_cents(10_800),
        tax_amount: Money::from_cents(800),
        customer_id: None,
        payment_method: "Cash".into(),
        is_wholesale: false,
        status: InvoiceStatus::Paid,
        credit_used: Money::zero(),
    }
}

/// StockQty cell of `sku`, as written.
pub async fn stock_cell(mem: &MemoryWorkbook, sku: &str) -> String {
    let (_, rows) = mem.snapshot("Inventory").await.unwrap();
    rows.into_iter()
        .find(|r| r[0] == sku)
        .map(|r| r[3].clone())
        .unwrap()
}

pub async fn row_count(mem: &MemoryWorkbook, sheet: &str) -> usize {
    mem.snapshot(sheet).await.map(|(_, rows)| rows.len()).unwrap_or(0)
}
