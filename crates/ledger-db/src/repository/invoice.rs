//! # Invoice Repository
//!
//! `Transactions` (headers) and `TransactionItems` (line items).
//!
//! ## Invoice Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Transactions                         TransactionItems                  │
//! │  ┌────────┬─────────┬───────┐         ┌────────┬──────┬────────┐        │
//! │  │ 1042   │ 108.00  │ Paid  │ ◄────── │ 1042   │ T-1  │ 10     │        │
//! │  └────────┴─────────┴───────┘    └─── │ 1042   │ T-7  │ 2      │        │
//! │                                       └────────┴──────┴────────┘        │
//! │                                                                         │
//! │  One header per id, zero or more lines per id. No foreign keys: a       │
//! │  header without lines is an orphan invoice left by a partial commit.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use ledger_core::{col, InvoiceStatus, Transaction, TransactionItem};
use tracing::debug;

use crate::error::StoreResult;
use crate::tables::LedgerTable;
use crate::workbook::{RowHandle, Workbook};

const HEADERS: LedgerTable = LedgerTable::Transactions;
const ITEMS: LedgerTable = LedgerTable::TransactionItems;

/// Repository for invoice headers and line items.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    workbook: Workbook,
}

impl InvoiceRepository {
    pub fn new(workbook: Workbook) -> Self {
        InvoiceRepository { workbook }
    }

    // -------------------------------------------------------------------------
    // Headers
    // -------------------------------------------------------------------------

    pub async fn list_headers(&self) -> StoreResult<Vec<Transaction>> {
        let records = self.workbook.read_all(HEADERS).await?;
        Ok(records.iter().map(Transaction::from_record).collect())
    }

    /// The header for `invoice_id`, or `NotFound`.
    pub async fn get_header(&self, invoice_id: &str) -> StoreResult<Transaction> {
        let handle = self.workbook.find_row_by_key(HEADERS, invoice_id).await?;
        let record = self.workbook.read_record(&handle).await?;
        Ok(Transaction::from_record(&record))
    }

    /// Row of the header for `invoice_id`, if one was written.
    pub async fn probe_header(&self, invoice_id: &str) -> StoreResult<Option<RowHandle>> {
        self.workbook.probe(HEADERS, invoice_id).await
    }

    pub async fn append_header(&self, header: &Transaction) -> StoreResult<()> {
        debug!(invoice_id = %header.transaction_id, total = %header.total_amount, "Appending invoice header");
        self.workbook.append_record(HEADERS, &header.to_fields()).await
    }

    /// Deletes the header row. `NotFound` when absent.
    pub async fn delete_header(&self, invoice_id: &str) -> StoreResult<()> {
        let handle = self.workbook.find_row_by_key(HEADERS, invoice_id).await?;
        self.workbook.delete_row(&handle).await
    }

    /// Sets `Status` on the header. `false` when the sheet has no Status column.
    pub async fn set_status(&self, invoice_id: &str, status: InvoiceStatus) -> StoreResult<bool> {
        let handle = self.workbook.find_row_by_key(HEADERS, invoice_id).await?;
        self.workbook
            .write_field(&handle, col::STATUS, status.as_str())
            .await
    }

    // -------------------------------------------------------------------------
    // Line items
    // -------------------------------------------------------------------------

    pub async fn list_items(&self) -> StoreResult<Vec<TransactionItem>> {
        let records = self.workbook.read_all(ITEMS).await?;
        Ok(records.iter().map(TransactionItem::from_record).collect())
    }

    /// Line items of `invoice_id`, in sheet order.
    pub async fn items_for(&self, invoice_id: &str) -> StoreResult<Vec<TransactionItem>> {
        let key = invoice_id.trim();
        Ok(self
            .list_items()
            .await?
            .into_iter()
            .filter(|item| item.transaction_id.trim() == key)
            .collect())
    }

    /// Appends all lines in one backend call, preserving order.
    pub async fn append_items(&self, items: &[TransactionItem]) -> StoreResult<usize> {
        let rows: Vec<_> = items.iter().map(TransactionItem::to_fields).collect();
        self.workbook.append_records(ITEMS, &rows).await
    }

    /// Deletes every line item of `invoice_id`. Returns how many were removed.
    pub async fn delete_items(&self, invoice_id: &str) -> StoreResult<usize> {
        let mut removed = 0;
        while let Some(handle) = self
            .workbook
            .find_row_by(ITEMS, col::TRANSACTION_ID, invoice_id)
            .await?
        {
            self.workbook.delete_row(&handle).await?;
            removed += 1;
        }
        debug!(invoice_id, removed, "Line items deleted");
        Ok(removed)
    }
}
