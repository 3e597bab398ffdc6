//! # Expense Repository
//!
//! `Expenses` is append-only.

use ledger_core::Expense;
use tracing::debug;

use crate::error::StoreResult;
use crate::tables::LedgerTable;
use crate::workbook::Workbook;

const TABLE: LedgerTable = LedgerTable::Expenses;

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    workbook: Workbook,
}

impl ExpenseRepository {
    pub fn new(workbook: Workbook) -> Self {
        ExpenseRepository { workbook }
    }

    pub async fn list(&self) -> StoreResult<Vec<Expense>> {
        let records = self.workbook.read_all(TABLE).await?;
        Ok(records.iter().map(Expense::from_record).collect())
    }

    pub async fn append(&self, expense: &Expense) -> StoreResult<()> {
        debug!(category = %expense.category, amount = %expense.amount, "Appending expense");
        self.workbook.append_record(TABLE, &expense.to_fields()).await
    }
}
