//! # Report Aggregation
//!
//! Read-only joins over already-loaded rows. Nothing here touches a sheet;
//! the engine loads the tables and hands them in.
//!
//! ## Income Statement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Transactions in range ──► Revenue = Σ TotalAmount                      │
//! │                            Tax     = Σ TaxAmount                        │
//! │                            Net Sales = Revenue − Tax                    │
//! │                              ├── retail    (IsWholesale = FALSE)        │
//! │                              └── wholesale (IsWholesale = TRUE)         │
//! │                                                                         │
//! │  TransactionItems of those ─► COGS = Σ QtySold × unit cost              │
//! │                                unit cost = snapshot Cost on the line    │
//! │                                          | current Inventory.Cost       │
//! │                                          | 0 (counted as missing)       │
//! │                                                                         │
//! │  Gross Profit = Net Sales − COGS                                        │
//! │  Expenses in range, Σ by Category                                       │
//! │  Net Profit   = Gross Profit − Σ Expenses                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Known Approximation
//! Lines without a cost snapshot fall back to today's weighted-average cost.
//! After a restock moves the average, historical COGS for those lines is
//! misstated. [`CostSourceCounts`] says how many lines were priced each way.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::parse_credit_suffix;
use crate::types::{
    parse_sheet_date, CompanyProfile, Customer, Expense, InventoryItem, InvoiceStatus,
    Transaction, TransactionItem,
};

/// Category used for expenses with a blank category cell.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Customer name shown when a receivable's customer row is gone.
pub const UNKNOWN_CUSTOMER: &str = "Unknown";

// =============================================================================
// Date Range
// =============================================================================

/// An inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range; `start` after `end` is rejected.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<DateRange, ValidationError> {
        if start > end {
            return Err(ValidationError::invalid_format(
                "date range",
                format!("start {} is after end {}", start, end),
            ));
        }
        Ok(DateRange { start, end })
    }

    /// A single day.
    pub fn day(date: NaiveDate) -> DateRange {
        DateRange { start: date, end: date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Whether a timestamp/date cell falls in range. Unparseable cells never do.
    pub fn contains_cell(&self, raw: &str) -> bool {
        parse_sheet_date(raw).map(|d| self.contains(d)).unwrap_or(false)
    }
}

// =============================================================================
// Income Statement
// =============================================================================

/// How many line items were costed from each source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSourceCounts {
    /// Cost snapshotted on the line at sale time.
    pub snapshot: usize,
    /// Current `Inventory.Cost` for the SKU.
    pub current: usize,
    /// No cost anywhere; costed at zero.
    pub missing: usize,
}

/// Profit and loss for a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub range: DateRange,
    pub transaction_count: usize,
    pub revenue: Money,
    pub tax_collected: Money,
    pub net_sales: Money,
    pub retail_sales: Money,
    pub wholesale_sales: Money,
    pub cogs: Money,
    pub cost_sources: CostSourceCounts,
    pub gross_profit: Money,
    pub expenses: BTreeMap<String, Money>,
    pub total_expenses: Money,
    pub net_profit: Money,
}

/// Builds the income statement.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use ledger_core::money::Money;
/// use ledger_core::report::{income_statement, DateRange};
///
/// let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
/// let statement = income_statement(DateRange::day(day), &[], &[], &[], &[]);
/// assert_eq!(statement.net_profit, Money::zero());
/// ```
pub fn income_statement(
    range: DateRange,
    transactions: &[Transaction],
    items: &[TransactionItem],
    inventory: &[InventoryItem],
    expenses: &[Expense],
) -> IncomeStatement {
    let in_range: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.date().map(|d| range.contains(d)).unwrap_or(false))
        .collect();

    let mut revenue = Money::zero();
    let mut tax_collected = Money::zero();
    let mut retail_sales = Money::zero();
    let mut wholesale_sales = Money::zero();
    for tx in &in_range {
        revenue += tx.total_amount;
        tax_collected += tx.tax_amount;
        let net = tx.total_amount - tx.tax_amount;
        if tx.is_wholesale {
            wholesale_sales += net;
        } else {
            retail_sales += net;
        }
    }
    let net_sales = revenue - tax_collected;

    let ids: HashSet<&str> = in_range.iter().map(|t| t.transaction_id.as_str()).collect();
    let current_costs = current_cost_index(inventory);

    let mut cost_sources = CostSourceCounts::default();
    let mut cogs_exact = 0.0_f64;
    for item in items.iter().filter(|i| ids.contains(i.transaction_id.as_str())) {
        let unit_cost = match item.cost {
            Some(cost) => {
                cost_sources.snapshot += 1;
                cost
            }
            None => match current_costs.get(item.sku.as_str()) {
                Some(cost) => {
                    cost_sources.current += 1;
                    *cost
                }
                None => {
                    cost_sources.missing += 1;
                    0.0
                }
            },
        };
        cogs_exact += item.qty_sold as f64 * unit_cost;
    }
    let cogs = Money::from_f64_rounded(cogs_exact);
    let gross_profit = net_sales - cogs;

    let mut by_category: BTreeMap<String, Money> = BTreeMap::new();
    for expense in expenses.iter().filter(|e| range.contains_cell(&e.date)) {
        let category = if expense.category.trim().is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            expense.category.trim().to_string()
        };
        *by_category.entry(category).or_default() += expense.amount;
    }
    let total_expenses: Money = by_category.values().sum();

    IncomeStatement {
        range,
        transaction_count: in_range.len(),
        revenue,
        tax_collected,
        net_sales,
        retail_sales,
        wholesale_sales,
        cogs,
        cost_sources,
        gross_profit,
        expenses: by_category,
        total_expenses,
        net_profit: gross_profit - total_expenses,
    }
}

/// SKU → current cost. The first row for a SKU wins.
fn current_cost_index(inventory: &[InventoryItem]) -> HashMap<&str, f64> {
    let mut index = HashMap::new();
    for item in inventory {
        index.entry(item.sku.as_str()).or_insert(item.cost);
    }
    index
        .into_iter()
        .filter_map(|(sku, cost)| cost.map(|c| (sku, c)))
        .collect()
}

// =============================================================================
// Tax Liability
// =============================================================================

/// Sales tax owed for a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxLiability {
    pub range: DateRange,
    pub tax_collected: Money,
    pub revenue: Money,
    /// `revenue − tax_collected`.
    pub net_taxable_sales: Money,
    /// Net sales on retail invoices.
    pub retail_net_sales: Money,
    /// Net sales on wholesale invoices (reported as exempt).
    pub wholesale_net_sales: Money,
}

pub fn tax_liability(range: DateRange, transactions: &[Transaction]) -> TaxLiability {
    let mut liability = TaxLiability {
        range,
        tax_collected: Money::zero(),
        revenue: Money::zero(),
        net_taxable_sales: Money::zero(),
        retail_net_sales: Money::zero(),
        wholesale_net_sales: Money::zero(),
    };

    for tx in transactions
        .iter()
        .filter(|t| t.date().map(|d| range.contains(d)).unwrap_or(false))
    {
        liability.tax_collected += tx.tax_amount;
        liability.revenue += tx.total_amount;
        let net = tx.total_amount - tx.tax_amount;
        if tx.is_wholesale {
            liability.wholesale_net_sales += net;
        } else {
            liability.retail_net_sales += net;
        }
    }
    liability.net_taxable_sales = liability.revenue - liability.tax_collected;
    liability
}

// =============================================================================
// Top Sellers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSeller {
    pub name: String,
    pub qty_sold: i64,
}

/// Units sold per product name, highest first (ties by name), at most `limit`.
///
/// Lines whose header is missing (orphaned by a partial commit) have no date
/// and are left out.
pub fn top_sellers(
    range: DateRange,
    transactions: &[Transaction],
    items: &[TransactionItem],
    limit: usize,
) -> Vec<TopSeller> {
    let ids: HashSet<&str> = transactions
        .iter()
        .filter(|t| t.date().map(|d| range.contains(d)).unwrap_or(false))
        .map(|t| t.transaction_id.as_str())
        .collect();

    let mut totals: HashMap<&str, i64> = HashMap::new();
    for item in items.iter().filter(|i| ids.contains(i.transaction_id.as_str())) {
        *totals.entry(item.name.as_str()).or_default() += item.qty_sold;
    }

    let mut sellers: Vec<TopSeller> = totals
        .into_iter()
        .map(|(name, qty_sold)| TopSeller {
            name: name.to_string(),
            qty_sold,
        })
        .collect();
    sellers.sort_by(|a, b| b.qty_sold.cmp(&a.qty_sold).then_with(|| a.name.cmp(&b.name)));
    sellers.truncate(limit);
    sellers
}

// =============================================================================
// Accounts Receivable
// =============================================================================

/// An unpaid invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receivable {
    pub transaction_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub due_date: String,
    pub amount: Money,
    pub overdue: bool,
}

/// `Pending` invoices joined with their customer's name, oldest due first.
/// Invoices with an unreadable due date sort last.
pub fn receivables(
    transactions: &[Transaction],
    customers: &[Customer],
    today: NaiveDate,
) -> Vec<Receivable> {
    let mut names: HashMap<&str, &str> = HashMap::new();
    for customer in customers {
        names
            .entry(customer.customer_id.as_str())
            .or_insert(customer.name.as_str());
    }

    let mut pending: Vec<(Option<NaiveDate>, Receivable)> = transactions
        .iter()
        .filter(|t| t.status == Some(InvoiceStatus::Pending))
        .map(|t| {
            let due = parse_sheet_date(&t.due_date);
            let receivable = Receivable {
                transaction_id: t.transaction_id.clone(),
                customer_id: t.customer_id.clone(),
                customer_name: names
                    .get(t.customer_id.as_str())
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| UNKNOWN_CUSTOMER.to_string()),
                due_date: t.due_date.clone(),
                amount: t.total_amount,
                overdue: due.map(|d| d < today).unwrap_or(false),
            };
            (due, receivable)
        })
        .collect();

    pending.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    pending.into_iter().map(|(_, r)| r).collect()
}

// =============================================================================
// Invoice Document
// =============================================================================

/// One printed invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub sku: String,
    pub name: String,
    pub qty: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Everything the PDF renderer needs for one invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDocument {
    pub invoice_id: String,
    pub timestamp: String,
    pub due_date: String,
    pub status: Option<InvoiceStatus>,
    pub customer_id: String,
    pub customer_name: String,
    pub payment_method: String,
    pub company: CompanyProfile,
    pub lines: Vec<InvoiceLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub credit_applied: Money,
    pub amount_due: Money,
}

impl InvoiceDocument {
    /// Assembles the document from a header and its line items (cart order).
    pub fn assemble(
        header: &Transaction,
        items: &[TransactionItem],
        customer_name: impl Into<String>,
        company: CompanyProfile,
    ) -> InvoiceDocument {
        let lines: Vec<InvoiceLine> = items
            .iter()
            .map(|i| InvoiceLine {
                sku: i.sku.clone(),
                name: i.name.clone(),
                qty: i.qty_sold,
                unit_price: i.price,
                line_total: i.line_total(),
            })
            .collect();

        InvoiceDocument {
            invoice_id: header.transaction_id.clone(),
            timestamp: header.timestamp.clone(),
            due_date: header.due_date.clone(),
            status: header.status,
            customer_id: header.customer_id.clone(),
            customer_name: customer_name.into(),
            payment_method: header.payment_method.clone(),
            company,
            subtotal: lines.iter().map(|l| l.line_total).sum(),
            tax: header.tax_amount,
            credit_applied: parse_credit_suffix(&header.payment_method).unwrap_or_default(),
            amount_due: header.total_amount,
            lines,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
