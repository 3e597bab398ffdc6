//! # Expenses
//!
//! Operating costs recorded against a date and category.

use chrono::NaiveDate;
use ledger_core::validation::{validate_name, validate_positive};
use ledger_core::{Expense, Money, DATE_FORMAT};
use ledger_db::Workbook;
use tracing::info;

use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct ExpenseLog {
    workbook: Workbook,
}

impl ExpenseLog {
    pub fn new(workbook: Workbook) -> Self {
        ExpenseLog { workbook }
    }

    pub async fn list(&self) -> EngineResult<Vec<Expense>> {
        Ok(self.workbook.expenses().list().await?)
    }

    /// Appends one expense row. The amount must be positive.
    pub async fn add_expense(
        &self,
        date: NaiveDate,
        category: &str,
        amount: Money,
        description: &str,
    ) -> EngineResult<Expense> {
        validate_name("category", category)?;
        validate_positive("expense amount", amount)?;

        let expense = Expense {
            date: date.format(DATE_FORMAT).to_string(),
            category: category.trim().to_string(),
            amount,
            description: description.trim().to_string(),
        };
        self.workbook.expenses().append(&expense).await?;

        info!(date = %expense.date, category = %expense.category, %amount, "Expense recorded");
        Ok(expense)
    }
}
