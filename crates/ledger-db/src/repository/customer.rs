//! # Customer Repository
//!
//! Reads and writes `Customers` rows.

use ledger_core::Customer;
use tracing::debug;

use crate::error::StoreResult;
use crate::tables::LedgerTable;
use crate::workbook::{RowHandle, Workbook};

const TABLE: LedgerTable = LedgerTable::Customers;

/// Repository for customer rows.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    workbook: Workbook,
}

impl CustomerRepository {
    pub fn new(workbook: Workbook) -> Self {
        CustomerRepository { workbook }
    }

    pub async fn list(&self) -> StoreResult<Vec<Customer>> {
        let records = self.workbook.read_all(TABLE).await?;
        Ok(records.iter().map(Customer::from_record).collect())
    }

    /// The customer with `customer_id`, or `NotFound`.
    pub async fn get(&self, customer_id: &str) -> StoreResult<Customer> {
        let handle = self.locate(customer_id).await?;
        let record = self.workbook.read_record(&handle).await?;
        Ok(Customer::from_record(&record))
    }

    pub async fn locate(&self, customer_id: &str) -> StoreResult<RowHandle> {
        self.workbook.find_row_by_key(TABLE, customer_id).await
    }

    pub async fn probe(&self, customer_id: &str) -> StoreResult<Option<RowHandle>> {
        self.workbook.probe(TABLE, customer_id).await
    }

    pub async fn insert(&self, customer: &Customer) -> StoreResult<()> {
        debug!(customer_id = %customer.customer_id, "Inserting customer");
        self.workbook.append_record(TABLE, &customer.to_fields()).await
    }

    /// Deletes the customer row. `NotFound` when absent.
    pub async fn delete(&self, customer_id: &str) -> StoreResult<()> {
        let handle = self.locate(customer_id).await?;
        debug!(customer_id, row = handle.row(), "Deleting customer");
        self.workbook.delete_row(&handle).await
    }
}
