//! # Report Aggregator
//!
//! Reads the ledger tables and hands them to the pure report functions in
//! `ledger_core::report`.
//!
//! ```text
//! ┌────────────────────┬───────────────────────────────────────────────────┐
//! │ income_statement   │ Transactions, TransactionItems, Inventory,        │
//! │                    │ Expenses                                          │
//! │ tax_liability      │ Transactions                                      │
//! │ top_sellers        │ Transactions, TransactionItems                    │
//! │ receivables        │ Transactions, Customers                           │
//! └────────────────────┴───────────────────────────────────────────────────┘
//! ```
//!
//! Each report reads whole tables with no snapshot across them. A sale
//! committed mid-report can show up in one table and not another.

use std::sync::Arc;

use ledger_core::report::{
    self, DateRange, IncomeStatement, Receivable, TaxLiability, TopSeller,
};
use ledger_db::Workbook;
use tracing::debug;

use crate::clock::Clock;
use crate::config::ReportSettings;
use crate::error::EngineResult;

#[derive(Clone)]
pub struct ReportAggregator {
    workbook: Workbook,
    clock: Arc<dyn Clock>,
    settings: ReportSettings,
}

impl ReportAggregator {
    pub fn new(workbook: Workbook, clock: Arc<dyn Clock>, settings: ReportSettings) -> Self {
        ReportAggregator {
            workbook,
            clock,
            settings,
        }
    }

    /// Profit and loss over `range`, inclusive.
    pub async fn income_statement(&self, range: DateRange) -> EngineResult<IncomeStatement> {
        let invoices = self.workbook.invoices();
        let transactions = invoices.list_headers().await?;
        let items = invoices.list_items().await?;
        let inventory = self.workbook.inventory().list().await?;
        let expenses = self.workbook.expenses().list().await?;

        let statement =
            report::income_statement(range, &transactions, &items, &inventory, &expenses);
        debug!(
            start = %range.start,
            end = %range.end,
            transactions = statement.transaction_count,
            net_profit = %statement.net_profit,
            current_cost_lines = statement.cost_sources.current,
            missing_cost_lines = statement.cost_sources.missing,
            "Income statement built"
        );
        Ok(statement)
    }

    pub async fn tax_liability(&self, range: DateRange) -> EngineResult<TaxLiability> {
        let transactions = self.workbook.invoices().list_headers().await?;
        Ok(report::tax_liability(range, &transactions))
    }

    /// Best sellers by units. `limit` defaults to the configured one.
    pub async fn top_sellers(
        &self,
        range: DateRange,
        limit: Option<usize>,
    ) -> EngineResult<Vec<TopSeller>> {
        let invoices = self.workbook.invoices();
        let transactions = invoices.list_headers().await?;
        let items = invoices.list_items().await?;
        let limit = limit.unwrap_or(self.settings.top_sellers_limit);
        Ok(report::top_sellers(range, &transactions, &items, limit))
    }

    /// Outstanding `Pending` invoices, oldest due first.
    pub async fn receivables(&self) -> EngineResult<Vec<Receivable>> {
        let transactions = self.workbook.invoices().list_headers().await?;
        let customers = self.workbook.customers().list().await?;
        Ok(report::receivables(&transactions, &customers, self.clock.today()))
    }
}

impl std::fmt::Debug for ReportAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportAggregator")
            .field("workbook", &self.workbook)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
