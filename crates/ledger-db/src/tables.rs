//! # Ledger Tables
//!
//! The six named sheets of a ledger workbook.
//!
//! ```text
//! ┌──────────────────┬──────────────────┬──────────────────────────────────┐
//! │ Table            │ Key column       │ Default header                   │
//! ├──────────────────┼──────────────────┼──────────────────────────────────┤
//! │ Inventory        │ SKU              │ SKU Name Price StockQty          │
//! │                  │                  │ WholesalePrice Cost              │
//! │ Customers        │ CustomerID       │ CustomerID Name Email Phone ...  │
//! │ Transactions     │ TransactionID    │ TransactionID Timestamp ...      │
//! │ TransactionItems │ (none, multi)    │ TransactionID SKU QtySold ...    │
//! │ Settings         │ Key              │ Key Value                        │
//! │ Expenses         │ (none, append)   │ Date Category Amount Description │
//! └──────────────────┴──────────────────┴──────────────────────────────────┘
//! ```
//!
//! Default headers are only used when a sheet is created. An existing sheet's
//! own header row always wins.

use std::fmt;

use ledger_core::col;

/// A named table in the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerTable {
    Inventory,
    Customers,
    Transactions,
    TransactionItems,
    Settings,
    Expenses,
}

impl LedgerTable {
    pub const ALL: [LedgerTable; 6] = [
        LedgerTable::Inventory,
        LedgerTable::Customers,
        LedgerTable::Transactions,
        LedgerTable::TransactionItems,
        LedgerTable::Settings,
        LedgerTable::Expenses,
    ];

    /// Sheet name in the workbook.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            LedgerTable::Inventory => "Inventory",
            LedgerTable::Customers => "Customers",
            LedgerTable::Transactions => "Transactions",
            LedgerTable::TransactionItems => "TransactionItems",
            LedgerTable::Settings => "Settings",
            LedgerTable::Expenses => "Expenses",
        }
    }

    /// Column `find_row_by_key` matches against.
    pub fn key_column(&self) -> Option<&'static str> {
        match self {
            LedgerTable::Inventory => Some(col::SKU),
            LedgerTable::Customers => Some(col::CUSTOMER_ID),
            LedgerTable::Transactions => Some(col::TRANSACTION_ID),
            LedgerTable::Settings => Some(col::KEY),
            LedgerTable::TransactionItems | LedgerTable::Expenses => None,
        }
    }

    /// Entity name used in `NotFound` errors.
    pub fn entity(&self) -> &'static str {
        match self {
            LedgerTable::Inventory => "SKU",
            LedgerTable::Customers => "Customer",
            LedgerTable::Transactions => "Invoice",
            LedgerTable::TransactionItems => "Line item",
            LedgerTable::Settings => "Setting",
            LedgerTable::Expenses => "Expense",
        }
    }

    /// Header written when the sheet is created.
    pub fn default_header(&self) -> Vec<String> {
        let names: &[&str] = match self {
            LedgerTable::Inventory => &[
                col::SKU,
                col::NAME,
                col::PRICE,
                col::STOCK_QTY,
                col::WHOLESALE_PRICE,
                col::COST,
            ],
            LedgerTable::Customers => &[
                col::CUSTOMER_ID,
                col::NAME,
                col::EMAIL,
                col::PHONE,
                col::JOINED,
                col::ADDRESS,
                col::NOTES,
                col::CREDIT,
            ],
            LedgerTable::Transactions => &[
                col::TRANSACTION_ID,
                col::TIMESTAMP,
                col::TOTAL_AMOUNT,
                col::PAYMENT_METHOD,
                col::CUSTOMER_ID,
                col::STATUS,
                col::DUE_DATE,
                col::TAX_AMOUNT,
                col::IS_WHOLESALE,
            ],
            LedgerTable::TransactionItems => &[
                col::TRANSACTION_ID,
                col::SKU,
                col::QTY_SOLD,
                col::PRICE,
                col::NAME,
                col::COST,
            ],
            LedgerTable::Settings => &[col::KEY, col::VALUE],
            LedgerTable::Expenses => &[col::DATE, col::CATEGORY, col::AMOUNT, col::DESCRIPTION],
        };
        names.iter().map(|n| n.to_string()).collect()
    }
}

impl fmt::Display for LedgerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_column_is_in_default_header() {
        for table in LedgerTable::ALL {
            if let Some(key) = table.key_column() {
                assert!(
                    table.default_header().iter().any(|h| h == key),
                    "{} header lacks {}",
                    table,
                    key
                );
            }
        }
    }

    #[test]
    fn test_sheet_names_unique() {
        let mut names: Vec<_> = LedgerTable::ALL.iter().map(|t| t.sheet_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 6);
    }
}
