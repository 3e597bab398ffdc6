//! # Invoice Maintenance
//!
//! Marking invoices paid, deleting them with their line items, and
//! assembling the printable document.

use ledger_core::report::{InvoiceDocument, UNKNOWN_CUSTOMER};
use ledger_core::{InvoiceStatus, Transaction};
use ledger_db::Workbook;
use tracing::{info, warn};

use crate::error::EngineResult;
use crate::settings::SettingsStore;

#[derive(Debug, Clone)]
pub struct InvoiceBook {
    workbook: Workbook,
    settings: SettingsStore,
}

impl InvoiceBook {
    pub fn new(workbook: Workbook, settings: SettingsStore) -> Self {
        InvoiceBook { workbook, settings }
    }

    pub async fn get(&self, invoice_id: &str) -> EngineResult<Transaction> {
        Ok(self.workbook.invoices().get_header(invoice_id).await?)
    }

    /// Every `Pending` invoice, in sheet order.
    pub async fn pending(&self) -> EngineResult<Vec<Transaction>> {
        let headers = self.workbook.invoices().list_headers().await?;
        Ok(headers
            .into_iter()
            .filter(|t| t.status == Some(InvoiceStatus::Pending))
            .collect())
    }

    /// Sets the invoice's status to `Paid`.
    ///
    /// ## Errors
    /// - `NotFound` when no header has this id
    pub async fn mark_invoice_paid(&self, invoice_id: &str) -> EngineResult<()> {
        let written = self
            .workbook
            .invoices()
            .set_status(invoice_id, InvoiceStatus::Paid)
            .await?;
        if written {
            info!(invoice_id, "Invoice marked paid");
        } else {
            warn!(invoice_id, "Transactions has no Status column, nothing written");
        }
        Ok(())
    }

    /// Deletes the header and every line item carrying `invoice_id`.
    ///
    /// Line items are removed even when the header is already gone, which
    /// cleans up after a commit that failed between the two appends. Stock
    /// and credit are not restored. Returns the number of line items removed.
    pub async fn delete_invoice(&self, invoice_id: &str) -> EngineResult<usize> {
        let invoices = self.workbook.invoices();
        match invoices.delete_header(invoice_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => warn!(invoice_id, "No header to delete"),
            Err(e) => return Err(e.into()),
        }
        let removed = invoices.delete_items(invoice_id).await?;

        info!(invoice_id, items = removed, "Invoice deleted");
        Ok(removed)
    }

    /// Everything a renderer needs to print the invoice.
    pub async fn invoice_document(&self, invoice_id: &str) -> EngineResult<InvoiceDocument> {
        let invoices = self.workbook.invoices();
        let header = invoices.get_header(invoice_id).await?;
        let items = invoices.items_for(invoice_id).await?;

        let customer_name = match self.workbook.customers().get(&header.customer_id).await {
            Ok(customer) => customer.name,
            Err(e) if e.is_not_found() => UNKNOWN_CUSTOMER.to_string(),
            Err(e) => return Err(e.into()),
        };
        let company = self.settings.company_profile().await?;

        Ok(InvoiceDocument::assemble(&header, &items, customer_name, company))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::Money;
    use ledger_db::MemoryWorkbook;
    use std::sync::Arc;

    const HEADER: &[&str] = &[
        "TransactionID", "Timestamp", "TotalAmount", "PaymentMethod", "CustomerID", "Status",
        "DueDate", "TaxAmount", "IsWholesale",
    ];

    fn book() -> (Arc<MemoryWorkbook>, InvoiceBook) {
        let mem = Arc::new(
            MemoryWorkbook::new()
                .with_sheet(
                    "Transactions",
                    HEADER,
                    &[
                        &["1000", "2024-05-01 10:00:00", "21.60", "Cash (+$5.00 Credit)", "C-aaaaa", "Pending", "2024-05-31", "1.60", "FALSE"],
                        &["1001", "2024-05-01 11:00:00", "5.00", "Card", "Guest", "Paid", "", "0.00", "FALSE"],
                    ],
                )
                .with_sheet(
                    "TransactionItems",
                    &["TransactionID", "SKU", "QtySold", "Price", "Name", "Cost"],
                    &[
                        &["1000", "T-1", "2", "10.00", "Red", "2.5"],
                        &["1001", "T-2", "1", "5.00", "Blue", ""],
                        &["1000", "T-3", "1", "5.00", "Green", ""],
                    ],
                )
                .with_sheet(
                    "Customers",
                    &["CustomerID", "Name", "Email", "Phone", "Joined", "Address", "Notes", "Credit"],
                    &[&["C-aaaaa", "Ann", "", "", "", "", "", "0"]],
                )
                .with_sheet(
                    "Settings",
                    &["Key", "Value"],
                    &[&["CompanyName", "Notions & Co"], &["CompanyAddress", "1 Main St"]],
                ),
        );
        let workbook = Workbook::new(mem.clone());
        let settings = SettingsStore::new(workbook.clone());
        (mem, InvoiceBook::new(workbook, settings))
    }

    #[tokio::test]
    async fn test_mark_paid() {
        let (_, book) = book();
        assert_eq!(book.pending().await.unwrap().len(), 1);
        book.mark_invoice_paid("1000").await.unwrap();
        assert!(book.pending().await.unwrap().is_empty());
        assert!(book.mark_invoice_paid("9999").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_items() {
        let (mem, book) = book();
        assert_eq!(book.delete_invoice("1000").await.unwrap(), 2);

        let (_, headers) = mem.snapshot("Transactions").await.unwrap();
        assert_eq!(headers.len(), 1);
        let (_, items) = mem.snapshot("TransactionItems").await.unwrap();
        assert_eq!(items, vec![vec!["1001", "T-2", "1", "5.00", "Blue", ""]]);
    }

    #[tokio::test]
    async fn test_delete_orphan_items() {
        let (mem, book) = book();
        book.workbook.invoices().delete_header("1000").await.unwrap();

        assert_eq!(book.delete_invoice("1000").await.unwrap(), 2);
        assert_eq!(mem.snapshot("TransactionItems").await.unwrap().1.len(), 1);
        assert_eq!(book.delete_invoice("1000").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invoice_document() {
        let (_, book) = book();
        let doc = book.invoice_document("1000").await.unwrap();
        assert_eq!(doc.customer_name, "Ann");
        assert_eq!(doc.company.company_name, "Notions & Co");
        assert_eq!(doc.lines.len(), 2);
        assert_eq!(doc.lines[1].sku, "T-3");
        assert_eq!(doc.credit_applied, Money::from_cents(500));

        let guest = book.invoice_document("1001").await.unwrap();
        assert_eq!(guest.customer_name, UNKNOWN_CUSTOMER);
    }
}
