//! # Credit Ledger
//!
//! Customer store credit: balance, credit, clamped debit and gift
//! certificate sales.
//!
//! ## Gift Certificate Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate: amount > 0, receiver exists            (no writes yet)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  allocate invoice id ──► header (giver, Paid, tax 0, due today)         │
//! │                     ──► one GIFT-CERT line (qty 1, cost 0)              │
//! │                     ──► receiver Credit += amount                       │
//! │                                                                         │
//! │  A failure after allocation is a PartialCommitFailure for that id.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Credit writes are read-then-write with nothing held in between. Two
//! concurrent debits on one customer can lose one of them.

use std::sync::Arc;

use ledger_core::commit::CommitProgress;
use ledger_core::costing::clamp_credit;
use ledger_core::validation::{validate_id, validate_name, validate_positive};
use ledger_core::{
    col, CommitStage, InvoiceId, InvoiceStatus, Money, Transaction, TransactionItem, ValidationError,
    DATE_FORMAT, GIFT_CERTIFICATE_SKU, TIMESTAMP_FORMAT,
};
use ledger_db::{LedgerTable, RowHandle, StoreError, Workbook};
use tracing::{debug, info, warn};

use crate::allocator::InvoiceIdAllocator;
use crate::clock::Clock;
use crate::error::{CommitFailure, EngineError, EngineResult};

/// Store credit operations.
#[derive(Clone)]
pub struct CreditLedger {
    workbook: Workbook,
    allocator: Arc<InvoiceIdAllocator>,
    clock: Arc<dyn Clock>,
}

impl CreditLedger {
    pub fn new(workbook: Workbook, allocator: Arc<InvoiceIdAllocator>, clock: Arc<dyn Clock>) -> Self {
        CreditLedger {
            workbook,
            allocator,
            clock,
        }
    }

    /// Current credit of `customer_id`. A blank cell is zero.
    pub async fn balance(&self, customer_id: &str) -> EngineResult<Money> {
        let handle = self.workbook.customers().locate(customer_id).await?;
        self.read_credit(&handle).await
    }

    /// Adds `amount` to the customer's credit. Returns the new balance.
    pub async fn credit(&self, customer_id: &str, amount: Money) -> EngineResult<Money> {
        validate_positive("credit amount", amount)?;

        let handle = self.workbook.customers().locate(customer_id).await?;
        let current = self.read_credit(&handle).await?;
        let updated = current.checked_add(amount).ok_or_else(|| ValidationError::OutOfRange {
            field: "Customers.Credit after credit".to_string(),
            min: 0,
            max: i64::MAX,
        })?;
        self.write_credit(&handle, updated).await?;

        info!(customer_id, %amount, balance = %updated, "Credit added");
        Ok(updated)
    }

    /// Subtracts `amount`, clamping the balance at zero. Returns the new
    /// balance.
    pub async fn debit(&self, customer_id: &str, amount: Money) -> EngineResult<Money> {
        validate_positive("debit amount", amount)?;

        let handle = self.workbook.customers().locate(customer_id).await?;
        let current = self.read_credit(&handle).await?;
        let updated = clamp_credit(current, amount);
        self.write_credit(&handle, updated).await?;

        if amount > current {
            warn!(customer_id, %current, %amount, "Debit exceeds credit, balance clamped at zero");
        } else {
            info!(customer_id, %amount, balance = %updated, "Credit debited");
        }
        Ok(updated)
    }

    /// Sells a gift certificate paid by `giver_id` for `receiver_id`.
    ///
    /// ## Errors
    /// - `InvalidInput` when `amount ≤ 0` or an id is blank
    /// - `NotFound` when the receiver does not exist (nothing written)
    /// - `RateLimited` from allocation (nothing written)
    /// - `PartialCommitFailure` for anything after allocation
    pub async fn sell_gift_certificate(
        &self,
        giver_id: &str,
        receiver_id: &str,
        amount: Money,
        pay_method: &str,
    ) -> EngineResult<InvoiceId> {
        validate_positive("gift certificate amount", amount)?;
        validate_id("giver", giver_id)?;
        validate_id("receiver", receiver_id)?;
        validate_name("payment method", pay_method)?;

        let receiver = self.workbook.customers().get(receiver_id).await?;

        let invoice_id = self.allocator.allocate().await?;
        let id = invoice_id.to_string();
        let mut progress = CommitProgress::new();
        progress.advance(CommitStage::AllocatingId);
        debug!(invoice_id = %id, stage = %progress.reached(), "Gift certificate commit started");

        let now = self.clock.now();
        let header = Transaction {
            transaction_id: id.clone(),
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            total_amount: amount,
            payment_method: pay_method.trim().to_string(),
            customer_id: giver_id.trim().to_string(),
            status: Some(InvoiceStatus::Paid),
            due_date: now.date().format(DATE_FORMAT).to_string(),
            tax_amount: Money::zero(),
            is_wholesale: false,
        };
        let line = TransactionItem {
            transaction_id: id.clone(),
            sku: GIFT_CERTIFICATE_SKU.to_string(),
            qty_sold: 1,
            price: amount,
            name: format!("Gift Certificate for {}", receiver.name),
            cost: Some(0.0),
        };

        if let Err(e) = self.workbook.invoices().append_header(&header).await {
            return Err(partial(&id, CommitStage::HeaderWritten, progress, e.into()));
        }
        progress.advance(CommitStage::HeaderWritten);

        if let Err(e) = self.workbook.invoices().append_items(&[line]).await {
            return Err(partial(&id, CommitStage::ItemsWritten, progress, e.into()));
        }
        progress.advance(CommitStage::ItemsWritten);
        progress.advance(CommitStage::InventoryAdjusted);

        if let Err(e) = self.credit(receiver_id, amount).await {
            return Err(partial(&id, CommitStage::CreditAdjusted, progress, e));
        }
        progress.advance(CommitStage::CreditAdjusted);
        progress.advance(CommitStage::Complete);

        info!(
            invoice_id = %id,
            giver = giver_id,
            receiver = receiver_id,
            %amount,
            "Gift certificate sold"
        );
        Ok(invoice_id)
    }

    // -------------------------------------------------------------------------
    // Cell access
    // -------------------------------------------------------------------------

    async fn read_credit(&self, handle: &RowHandle) -> EngineResult<Money> {
        let record = self.workbook.read_record(handle).await?;
        record
            .money(col::CREDIT)?
            .ok_or_else(missing_credit_column)
    }

    async fn write_credit(&self, handle: &RowHandle, value: Money) -> EngineResult<()> {
        if !self
            .workbook
            .write_field(handle, col::CREDIT, &value.to_cell())
            .await?
        {
            return Err(missing_credit_column());
        }
        Ok(())
    }
}

impl std::fmt::Debug for CreditLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreditLedger")
            .field("workbook", &self.workbook)
            .finish_non_exhaustive()
    }
}

fn missing_credit_column() -> EngineError {
    EngineError::Store(StoreError::MissingColumn {
        sheet: LedgerTable::Customers.sheet_name().to_string(),
        column: col::CREDIT.to_string(),
    })
}

pub(crate) fn partial(
    invoice_id: &str,
    failed_at: CommitStage,
    progress: CommitProgress,
    source: EngineError,
) -> EngineError {
    warn!(
        invoice_id,
        failed_at = %failed_at,
        last_reached = %progress.reached(),
        error = %source,
        "Commit stopped after invoice id allocation"
    );
    EngineError::PartialCommitFailure(Box::new(CommitFailure {
        invoice_id: invoice_id.to_string(),
        failed_at,
        progress,
        source: Box::new(source),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;
    use ledger_db::{Fault, FaultKind, MemoryWorkbook, StoreOp};

    fn setup() -> (Arc<MemoryWorkbook>, CreditLedger) {
        let mem = Arc::new(
            MemoryWorkbook::new()
                .with_sheet(
                    "Customers",
                    &["CustomerID", "Name", "Email", "Phone", "Joined", "Address", "Notes", "Credit"],
                    &[
                        &["C-aaaaa", "Ann", "", "", "2024-01-01", "", "", "10.00"],
                        &["C-bbbbb", "Ben", "", "", "2024-01-01", "", "", ""],
                    ],
                )
                .with_sheet("Settings", &["Key", "Value"], &[&["NextInvoiceID", "1000"]])
                .with_sheet(
                    "Transactions",
                    &[
                        "TransactionID", "Timestamp", "TotalAmount", "PaymentMethod", "CustomerID",
                        "Status", "DueDate", "TaxAmount", "IsWholesale",
                    ],
                    &[],
                )
                .with_sheet(
                    "TransactionItems",
                    &["TransactionID", "SKU", "QtySold", "Price", "Name", "Cost"],
                    &[],
                ),
        );
        let workbook = Workbook::new(mem.clone());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
        let allocator = Arc::new(InvoiceIdAllocator::new(workbook.clone(), clock.clone(), 3));
        (mem, CreditLedger::new(workbook, allocator, clock))
    }

    #[tokio::test]
    async fn test_credit_refuses_to_overflow_balance() {
        let (_, ledger) = setup();
        let top = ledger
            .credit("C-aaaaa", Money::from_cents(i64::MAX - 1_000))
            .await
            .unwrap();
        assert_eq!(top.cents(), i64::MAX);

        assert!(matches!(
            ledger.credit("C-aaaaa", Money::from_cents(1)).await,
            Err(EngineError::InvalidInput(_))
        ));
        assert_eq!(ledger.balance("C-aaaaa").await.unwrap().cents(), i64::MAX);
    }

    #[tokio::test]
    async fn test_credit_and_debit() {
        let (_, ledger) = setup();
        assert_eq!(ledger.balance("C-bbbbb").await.unwrap(), Money::zero());
        assert_eq!(
            ledger.credit("C-bbbbb", Money::from_cents(2_500)).await.unwrap(),
            Money::from_cents(2_500)
        );
        assert_eq!(
            ledger.debit("C-aaaaa", Money::from_cents(400)).await.unwrap(),
            Money::from_cents(600)
        );
    }

    #[tokio::test]
    async fn test_over_debit_clamps_to_zero() {
        let (_, ledger) = setup();
        let balance = ledger.debit("C-aaaaa", Money::from_cents(5_000)).await.unwrap();
        assert_eq!(balance, Money::zero());
        assert_eq!(ledger.balance("C-aaaaa").await.unwrap(), Money::zero());
    }

    #[tokio::test]
    async fn test_unknown_customer_is_not_found() {
        let (_, ledger) = setup();
        assert!(ledger.balance("C-zzzzz").await.unwrap_err().is_not_found());
        assert!(ledger
            .debit("C-zzzzz", Money::from_cents(1))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_gift_certificate() {
        let (mem, ledger) = setup();
        let id = ledger
            .sell_gift_certificate("C-aaaaa", "C-bbbbb", Money::from_cents(5_000), "Cash")
            .await
            .unwrap();
        assert_eq!(id, InvoiceId::Sequential(1000));
        assert_eq!(ledger.balance("C-bbbbb").await.unwrap(), Money::from_cents(5_000));

        let (_, headers) = mem.snapshot("Transactions").await.unwrap();
        assert_eq!(
            headers[0],
            vec!["1000", "2024-05-01 12:00:00", "50.00", "Cash", "C-aaaaa", "Paid", "2024-05-01", "0.00", "FALSE"]
        );
        let (_, items) = mem.snapshot("TransactionItems").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0][1], "GIFT-CERT");
        assert_eq!(items[0][4], "Gift Certificate for Ben");
    }

    #[tokio::test]
    async fn test_gift_certificate_rejects_before_writing() {
        let (mem, ledger) = setup();
        let err = ledger
            .sell_gift_certificate("C-aaaaa", "C-zzzzz", Money::from_cents(5_000), "Cash")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = ledger
            .sell_gift_certificate("C-aaaaa", "C-bbbbb", Money::zero(), "Cash")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        assert!(mem.snapshot("Transactions").await.unwrap().1.is_empty());
        assert_eq!(mem.call_count(StoreOp::UpdateCell), 0);
    }

    #[tokio::test]
    async fn test_gift_certificate_item_failure_is_partial() {
        let (mem, ledger) = setup();
        mem.inject(Fault::new(
            StoreOp::AppendRows,
            "TransactionItems",
            FaultKind::Backend("quota".into()),
        ));
        let err = ledger
            .sell_gift_certificate("C-aaaaa", "C-bbbbb", Money::from_cents(5_000), "Cash")
            .await
            .unwrap_err();
        let failure = err.as_partial_commit().unwrap();
        assert_eq!(failure.invoice_id, "1000");
        assert_eq!(failure.failed_at, CommitStage::ItemsWritten);
        assert_eq!(failure.last_reached(), CommitStage::HeaderWritten);
        assert_eq!(ledger.balance("C-bbbbb").await.unwrap(), Money::zero());
    }
}
