//! Sale commit scenarios against the in-memory workbook.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::*;
use ledger_core::{CommitStage, InvoiceId, InvoiceStatus, Money, SaleLine};
use ledger_db::{Fault, FaultKind, StoreOp};
use ledger_engine::config::InventorySettings;
use ledger_engine::{EngineError, LedgerConfig, OversellPolicy};

#[tokio::test]
async fn sequential_ids_are_distinct_and_increasing() {
    let (_, ledger) = shop().await;

    let mut seen = Vec::new();
    for _ in 0..6 {
        match ledger.allocator.allocate().await.unwrap() {
            InvoiceId::Sequential(n) => seen.push(n),
            other => panic!("unexpected synthetic id {}", other),
        }
    }
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(seen.first(), Some(&1000));
}

#[tokio::test]
async fn same_cart_twice_makes_two_invoices() {
    let (mem, ledger) = shop().await;
    let sale = ten_red();

    let first = ledger.sales.commit_sale(&sale).await.unwrap();
    let second = ledger.sales.commit_sale(&sale).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(row_count(&mem, "Transactions").await, 2);
    assert_eq!(row_count(&mem, "TransactionItems").await, 2);
    assert_eq!(stock_cell(&mem, "THR-RED").await, "0");
}

#[tokio::test]
async fn concurrent_sales_get_distinct_ids() {
    let (mem, ledger) = shop().await;
    let ledger = Arc::new(ledger);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            let mut sale = ten_red();
            sale.lines[0].qty = 1;
            ledger.sales.commit_sale(&sale).await.unwrap()
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }
    assert_eq!(ids.len(), 8);
    assert_eq!(row_count(&mem, "Transactions").await, 8);
    assert_eq!(row_count(&mem, "TransactionItems").await, 8);
}

#[tokio::test]
async fn oversell_clamps_stock_at_zero() {
    let (mem, ledger) = shop().await;
    let mut sale = ten_red();
    sale.lines = vec![
        SaleLine::new("THR-BLU", "Blue Thread", 5, Money::from_cents(400)),
        SaleLine::new("GHOST", "Unknown", 1, Money::from_cents(100)),
    ];

    ledger.sales.commit_sale(&sale).await.unwrap();
    assert_eq!(stock_cell(&mem, "THR-BLU").await, "0");
    // unknown SKU still sold, nothing to decrement
    assert_eq!(row_count(&mem, "TransactionItems").await, 2);
}

#[tokio::test]
async fn reject_policy_refuses_before_any_write() {
    let mem = Arc::new(shop_workbook());
    let config = LedgerConfig {
        inventory: InventorySettings {
            oversell: OversellPolicy::Reject,
        },
        ..LedgerConfig::default()
    };
    let ledger = ledger_over(mem.clone(), config).await;

    let mut sale = ten_red();
    sale.lines[0].qty = 21;
    let err = ledger.sales.commit_sale(&sale).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientStock {
            available: 20,
            requested: 21,
            ..
        }
    ));
    assert_eq!(row_count(&mem, "Transactions").await, 0);
    assert_eq!(
        ledger.settings.get("NextInvoiceID").await.unwrap().as_deref(),
        Some("1000")
    );
}

#[tokio::test]
async fn credit_sale_debits_and_suffixes_payment_method() {
    let (mem, ledger) = shop().await;
    let mut sale = ten_red().for_customer(ANN);
    sale.credit_used = Money::from_cents(2_500);
    sale.total_amount = Money::from_cents(8_300);

    ledger.sales.commit_sale(&sale).await.unwrap();

    assert_eq!(ledger.credit.balance(ANN).await.unwrap(), Money::zero());
    let (_, headers) = mem.snapshot("Transactions").await.unwrap();
    assert_eq!(headers[0][2], "83.00");
    assert_eq!(headers[0][3], "Cash (+$25.00 Credit)");
}

#[tokio::test]
async fn pending_invoice_is_due_in_thirty_days() {
    let (_, ledger) = shop().await;
    let sale = ten_red().for_customer(BEN).with_status(InvoiceStatus::Pending);

    let id = ledger.sales.commit_sale(&sale).await.unwrap();
    let header = ledger.invoices.get(&id.to_string()).await.unwrap();
    assert_eq!(header.due_date, "2024-05-31");

    let owed = ledger.reports.receivables().await.unwrap();
    assert_eq!(owed.len(), 1);
    assert_eq!(owed[0].customer_name, "Ben");
    assert!(!owed[0].overdue);
}

#[tokio::test]
async fn rate_limit_during_allocation_writes_nothing() {
    let (mem, ledger) = shop().await;
    mem.inject(Fault::new(StoreOp::UpdateCell, "Settings", FaultKind::RateLimited));

    let err = ledger.sales.commit_sale(&ten_red()).await.unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(row_count(&mem, "Transactions").await, 0);
    assert_eq!(stock_cell(&mem, "THR-RED").await, "20");

    // the retry allocates the id the failed attempt never consumed
    let id = ledger.sales.commit_sale(&ten_red()).await.unwrap();
    assert_eq!(id, InvoiceId::Sequential(1000));
}

#[tokio::test]
async fn contended_counter_falls_back_to_synthetic_id() {
    let (mem, ledger) = shop().await;
    mem.inject(
        Fault::new(StoreOp::UpdateCell, "Settings", FaultKind::Clobber("1000".into())).times(5),
    );

    let id = ledger.sales.commit_sale(&ten_red()).await.unwrap();
    assert!(!id.is_sequential());
    assert!(id.to_string().starts_with("INV-20240501120000-"));

    let header = ledger.invoices.get(&id.to_string()).await.unwrap();
    assert_eq!(header.total_amount, Money::from_cents(10_800));
}

#[tokio::test]
async fn header_lands_then_items_fail_then_resume() {
    let (mem, ledger) = shop().await;
    mem.inject(Fault::new(
        StoreOp::AppendRows,
        "TransactionItems",
        FaultKind::RateLimited,
    ));

    let sale = ten_red();
    let err = ledger.sales.commit_sale(&sale).await.unwrap_err();
    let failure = err.into_partial_commit().unwrap();
    assert_eq!(failure.invoice_id, "1000");
    assert_eq!(failure.failed_at, CommitStage::ItemsWritten);
    assert_eq!(failure.last_reached(), CommitStage::HeaderWritten);
    assert!(failure.adjusted_lines().is_empty());
    assert!(failure.is_rate_limited());

    // orphan header, stock untouched
    assert_eq!(row_count(&mem, "Transactions").await, 1);
    assert_eq!(row_count(&mem, "TransactionItems").await, 0);
    assert_eq!(stock_cell(&mem, "THR-RED").await, "20");

    let id = ledger.sales.resume_commit(&sale, failure).await.unwrap();
    assert_eq!(id, InvoiceId::Sequential(1000));
    assert_eq!(row_count(&mem, "Transactions").await, 1);
    assert_eq!(row_count(&mem, "TransactionItems").await, 1);
    assert_eq!(stock_cell(&mem, "THR-RED").await, "10");
}

#[tokio::test]
async fn credit_failure_is_resumed_without_touching_stock_again() {
    let (mem, ledger) = shop().await;
    mem.inject(Fault::new(
        StoreOp::UpdateCell,
        "Customers",
        FaultKind::Backend("quota".into()),
    ));

    let mut sale = ten_red().for_customer(ANN);
    sale.lines.push(SaleLine::new("THR-BLU", "Blue Thread", 1, Money::from_cents(400)));
    sale.credit_used = Money::from_cents(1_000);

    let failure = ledger
        .sales
        .commit_sale(&sale)
        .await
        .unwrap_err()
        .into_partial_commit()
        .unwrap();
    assert_eq!(failure.failed_at, CommitStage::CreditAdjusted);
    assert_eq!(failure.last_reached(), CommitStage::InventoryAdjusted);
    assert_eq!(failure.adjusted_lines(), vec![0, 1]);

    ledger.sales.resume_commit(&sale, failure).await.unwrap();
    assert_eq!(stock_cell(&mem, "THR-RED").await, "10");
    assert_eq!(stock_cell(&mem, "THR-BLU").await, "2");
    assert_eq!(ledger.credit.balance(ANN).await.unwrap(), Money::from_cents(1_500));
}

#[tokio::test]
async fn invalid_carts_are_rejected_up_front() {
    let (mem, ledger) = shop().await;
    let appends_before = mem.call_count(StoreOp::AppendRows);

    let mut empty = ten_red();
    empty.lines.clear();
    let mut zero_qty = ten_red();
    zero_qty.lines[0].qty = 0;
    let mut negative = ten_red();
    negative.tax_amount = Money::from_cents(-1);

    for sale in [empty, zero_qty, negative] {
        assert!(matches!(
            ledger.sales.commit_sale(&sale).await,
            Err(EngineError::InvalidInput(_))
        ));
    }
    assert_eq!(mem.call_count(StoreOp::AppendRows), appends_before);
}
