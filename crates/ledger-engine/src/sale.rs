//! # Sale Commit Engine
//!
//! Turns a cart into an invoice: header, line items, stock and credit.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate cart, totals, status, credit customer      (no writes)        │
//! │  reject policy only: stock check                     (no writes)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AllocatingId       allocator.allocate()                                │
//! │  HeaderWritten      Transactions += 1 row                               │
//! │  ItemsWritten       TransactionItems += N rows (one call, cart order)   │
//! │  InventoryAdjusted  StockQty = max(0, s − q) per line                   │
//! │  CreditAdjusted     Credit = max(0, c − credit_used)                    │
//! │  Complete                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any failure past allocation comes back as `PartialCommitFailure` holding
//! the invoice id and progress. Hand it to [`SaleCommitEngine::resume_commit`]
//! with the same request to finish the sale under the same id. Committing
//! the request again would allocate a second invoice.

use std::sync::Arc;

use chrono::Duration;
use ledger_core::commit::CommitProgress;
use ledger_core::pricing::{payment_method_with_credit, CheckoutQuote};
use ledger_core::validation::{validate_cart, validate_name, validate_non_negative};
use ledger_core::{
    CommitStage, InvoiceId, InvoiceStatus, Money, SaleLine, Transaction, TransactionItem,
    ValidationError, DATE_FORMAT, TIMESTAMP_FORMAT,
};
use ledger_db::Workbook;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::allocator::InvoiceIdAllocator;
use crate::clock::Clock;
use crate::config::SalesSettings;
use crate::credit::{partial, CreditLedger};
use crate::error::{CommitFailure, EngineResult};
use crate::inventory::InventoryEngine;

// =============================================================================
// Sale Request
// =============================================================================

/// Everything needed to commit one sale.
///
/// `total_amount` is what the customer pays after credit, as written to
/// `TotalAmount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub lines: Vec<SaleLine>,
    pub total_amount: Money,
    pub tax_amount: Money,
    /// `None` records the sale against the guest sentinel.
    pub customer_id: Option<String>,
    pub payment_method: String,
    pub is_wholesale: bool,
    pub status: InvoiceStatus,
    pub credit_used: Money,
}

impl SaleRequest {
    /// A paid guest sale with totals taken from a checkout quote.
    pub fn from_quote(lines: Vec<SaleLine>, quote: &CheckoutQuote, payment_method: impl Into<String>) -> Self {
        SaleRequest {
            lines,
            total_amount: quote.amount_due,
            tax_amount: quote.tax,
            customer_id: None,
            payment_method: payment_method.into(),
            is_wholesale: false,
            status: InvoiceStatus::Paid,
            credit_used: quote.credit_applied,
        }
    }

    pub fn for_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn wholesale(mut self, is_wholesale: bool) -> Self {
        self.is_wholesale = is_wholesale;
        self
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = status;
        self
    }

    /// Customer id with blank treated as none.
    fn customer(&self) -> Option<&str> {
        self.customer_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

// =============================================================================
// Sale Commit Engine
// =============================================================================

/// Sequences the writes of a sale.
pub struct SaleCommitEngine {
    workbook: Workbook,
    allocator: Arc<InvoiceIdAllocator>,
    inventory: InventoryEngine,
    credit: CreditLedger,
    clock: Arc<dyn Clock>,
    sales: SalesSettings,
}

impl SaleCommitEngine {
    pub fn new(
        workbook: Workbook,
        allocator: Arc<InvoiceIdAllocator>,
        inventory: InventoryEngine,
        credit: CreditLedger,
        clock: Arc<dyn Clock>,
        sales: SalesSettings,
    ) -> Self {
        SaleCommitEngine {
            workbook,
            allocator,
            inventory,
            credit,
            clock,
            sales,
        }
    }

    /// Commits a sale and returns its invoice id.
    ///
    /// ## Errors
    /// - `InvalidInput` / `InsufficientStock` / `NotFound`: rejected before
    ///   any write
    /// - `RateLimited`: throttled during allocation, nothing written
    /// - `PartialCommitFailure`: stopped after allocation, see
    ///   [`Self::resume_commit`]
    pub async fn commit_sale(&self, request: &SaleRequest) -> EngineResult<InvoiceId> {
        self.validate(request).await?;
        self.inventory.check_availability(&request.lines).await?;

        let invoice_id = self.allocator.allocate().await?;
        let id = invoice_id.to_string();

        let mut progress = CommitProgress::new();
        progress.advance(CommitStage::AllocatingId);
        info!(
            invoice_id = %id,
            lines = request.lines.len(),
            total = %request.total_amount,
            stage = %CommitStage::AllocatingId,
            "Sale commit started"
        );

        self.run_stages(request, &id, progress, false).await?;
        Ok(invoice_id)
    }

    /// Finishes a sale that stopped with `PartialCommitFailure`.
    ///
    /// Continues from the failed stage with the same invoice id. A header or
    /// line items already present for the id are not written again, and
    /// lines whose stock was already decremented are skipped.
    pub async fn resume_commit(
        &self,
        request: &SaleRequest,
        failure: CommitFailure,
    ) -> EngineResult<InvoiceId> {
        validate_cart(&request.lines)?;

        let CommitFailure {
            invoice_id,
            failed_at,
            progress,
            ..
        } = failure;
        info!(
            invoice_id = %invoice_id,
            failed_at = %failed_at,
            last_reached = %progress.reached(),
            "Resuming sale commit"
        );

        self.run_stages(request, &invoice_id, progress, true).await?;
        Ok(InvoiceId::parse(&invoice_id))
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    async fn validate(&self, request: &SaleRequest) -> EngineResult<()> {
        validate_cart(&request.lines)?;
        validate_non_negative("total amount", request.total_amount)?;
        validate_non_negative("tax amount", request.tax_amount)?;
        validate_non_negative("credit used", request.credit_used)?;
        validate_name("payment method", &request.payment_method)?;

        if request.credit_used.is_positive() {
            let customer = match request.customer() {
                Some(id) if id != self.sales.guest_customer_id => id,
                _ => {
                    return Err(ValidationError::Required {
                        field: "customer for store credit".to_string(),
                    }
                    .into())
                }
            };
            if self.workbook.customers().probe(customer).await?.is_none() {
                return Err(ValidationError::invalid_format(
                    "customer",
                    format!("'{}' does not exist", customer),
                )
                .into());
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Stages
    // -------------------------------------------------------------------------

    async fn run_stages(
        &self,
        request: &SaleRequest,
        invoice_id: &str,
        mut progress: CommitProgress,
        resuming: bool,
    ) -> EngineResult<()> {
        while !progress.has_reached(CommitStage::Complete) {
            let stage = progress.attempting();
            let result = match stage {
                CommitStage::AllocatingId | CommitStage::Complete => Ok(()),
                CommitStage::HeaderWritten => self.write_header(request, invoice_id, resuming).await,
                CommitStage::ItemsWritten => self.write_items(request, invoice_id, resuming).await,
                CommitStage::InventoryAdjusted => {
                    self.adjust_inventory(request, invoice_id, &mut progress).await
                }
                CommitStage::CreditAdjusted => self.debit_credit(request, invoice_id).await,
            };

            if let Err(e) = result {
                return Err(partial(invoice_id, stage, progress, e));
            }
            progress.advance(stage);
            debug!(invoice_id, stage = %stage, "Commit stage reached");
        }

        info!(invoice_id, "Sale committed");
        Ok(())
    }

    async fn write_header(&self, request: &SaleRequest, invoice_id: &str, resuming: bool) -> EngineResult<()> {
        let invoices = self.workbook.invoices();
        if resuming && invoices.probe_header(invoice_id).await?.is_some() {
            debug!(invoice_id, "Header already written");
            return Ok(());
        }

        let now = self.clock.now();
        let due_date = match request.status {
            InvoiceStatus::Pending => (now.date() + Duration::days(self.sales.pending_due_days))
                .format(DATE_FORMAT)
                .to_string(),
            InvoiceStatus::Paid => String::new(),
        };

        let header = Transaction {
            transaction_id: invoice_id.to_string(),
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            total_amount: request.total_amount,
            payment_method: payment_method_with_credit(request.payment_method.trim(), request.credit_used),
            customer_id: request
                .customer()
                .unwrap_or(&self.sales.guest_customer_id)
                .to_string(),
            status: Some(request.status),
            due_date,
            tax_amount: request.tax_amount,
            is_wholesale: request.is_wholesale,
        };
        invoices.append_header(&header).await?;
        Ok(())
    }

    async fn write_items(&self, request: &SaleRequest, invoice_id: &str, resuming: bool) -> EngineResult<()> {
        let invoices = self.workbook.invoices();
        if resuming && !invoices.items_for(invoice_id).await?.is_empty() {
            debug!(invoice_id, "Line items already written");
            return Ok(());
        }

        let costs = self.workbook.inventory().cost_index().await?;
        let items: Vec<TransactionItem> = request
            .lines
            .iter()
            .map(|line| TransactionItem {
                transaction_id: invoice_id.to_string(),
                sku: line.sku.trim().to_string(),
                qty_sold: line.qty,
                price: line.price,
                name: line.name.clone(),
                cost: costs.get(line.sku.trim()).copied().flatten(),
            })
            .collect();

        invoices.append_items(&items).await?;
        Ok(())
    }

    async fn adjust_inventory(
        &self,
        request: &SaleRequest,
        invoice_id: &str,
        progress: &mut CommitProgress,
    ) -> EngineResult<()> {
        for (idx, line) in request.lines.iter().enumerate() {
            if progress.is_line_adjusted(idx) {
                debug!(invoice_id, line = idx, sku = %line.sku, "Stock already decremented");
                continue;
            }
            self.inventory.decrement(line.sku.trim(), line.qty).await?;
            progress.mark_line_adjusted(idx);
        }
        Ok(())
    }

    async fn debit_credit(&self, request: &SaleRequest, invoice_id: &str) -> EngineResult<()> {
        if !request.credit_used.is_positive() {
            return Ok(());
        }
        let Some(customer) = request.customer() else {
            warn!(invoice_id, "Credit used without a customer, nothing debited");
            return Ok(());
        };
        self.credit.debit(customer, request.credit_used).await?;
        Ok(())
    }
}

impl std::fmt::Debug for SaleCommitEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaleCommitEngine")
            .field("workbook", &self.workbook)
            .field("sales", &self.sales)
            .finish_non_exhaustive()
    }
}
