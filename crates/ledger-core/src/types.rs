//! # Domain Types
//!
//! Ledger entities and the cell formats they are written with.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Entities                                 │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ InventoryItem   │   │  Transaction    │   │ TransactionItem │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  sku (key)      │◄──│  transaction_id │◄──│  transaction_id │       │
//! │  │  stock_qty ≥ 0  │   │  total_amount   │   │  sku, qty_sold  │       │
//! │  │  cost (avg)     │   │  status         │   │  price, cost    │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │ customer_id                           │
//! │  ┌─────────────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │    Setting      │   │    Customer     │   │    Expense      │       │
//! │  │  key / value    │   │  credit ≥ 0     │   │  append-only    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity converts from a [`Record`] (lenient: bad cells read as zero or
//! blank) and to a list of `(column, cell)` pairs for
//! [`SheetSchema::build_row`](crate::sheet::SheetSchema::build_row).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::money::Money;
use crate::sheet::Record;

// =============================================================================
// Column Names
// =============================================================================

/// Header names as they appear in row 1 of each table.
pub mod col {
    pub const SKU: &str = "SKU";
    pub const NAME: &str = "Name";
    pub const PRICE: &str = "Price";
    pub const WHOLESALE_PRICE: &str = "WholesalePrice";
    pub const STOCK_QTY: &str = "StockQty";
    pub const COST: &str = "Cost";

    pub const CUSTOMER_ID: &str = "CustomerID";
    pub const EMAIL: &str = "Email";
    pub const PHONE: &str = "Phone";
    pub const JOINED: &str = "Joined";
    pub const ADDRESS: &str = "Address";
    pub const NOTES: &str = "Notes";
    pub const CREDIT: &str = "Credit";

    pub const TRANSACTION_ID: &str = "TransactionID";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const TOTAL_AMOUNT: &str = "TotalAmount";
    pub const PAYMENT_METHOD: &str = "PaymentMethod";
    pub const STATUS: &str = "Status";
    pub const DUE_DATE: &str = "DueDate";
    pub const TAX_AMOUNT: &str = "TaxAmount";
    pub const IS_WHOLESALE: &str = "IsWholesale";

    pub const QTY_SOLD: &str = "QtySold";

    pub const KEY: &str = "Key";
    pub const VALUE: &str = "Value";

    pub const DATE: &str = "Date";
    pub const CATEGORY: &str = "Category";
    pub const AMOUNT: &str = "Amount";
    pub const DESCRIPTION: &str = "Description";
}

// =============================================================================
// Cell Formats
// =============================================================================

/// Timestamp cell format (local time).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date cell format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Boolean cell text.
pub fn format_flag(value: bool) -> String {
    if value { "TRUE" } else { "FALSE" }.to_string()
}

/// Unit cost cell text, rounded to four decimals.
///
/// ```rust
/// use ledger_core::types::format_cost;
///
/// assert_eq!(format_cost(2.5), "2.5");
/// assert_eq!(format_cost(7.0 / 3.0), "2.3333");
/// ```
pub fn format_cost(cost: f64) -> String {
    let rounded = (cost * 10_000.0).round() / 10_000.0;
    // -0.0 prints as "-0"
    if rounded == 0.0 {
        return "0".to_string();
    }
    rounded.to_string()
}

/// Reads the calendar date out of a timestamp or date cell.
///
/// Accepts `2024-05-01 13:45:00`, `2024-05-01T13:45:00`, `2024-05-01` and the
/// US-style `05/01/2024` that hand-edited rows tend to use.
pub fn parse_sheet_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Some(ts.date());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(ts.date());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%m/%d/%Y") {
        return Some(date);
    }
    // "2024-05-01 13:45" and similar partial timestamps
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok())
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate held in parts per million.
///
/// ## Why PPM?
/// The `TaxRate` setting is a decimal fraction such as `0.08375`. Basis
/// points cannot hold the third decimal of a percent; ppm can.
/// 80_000 ppm = 0.08 = 8%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_ppm(ppm: u32) -> Self {
        TaxRate(ppm)
    }

    /// Creates a tax rate from a decimal fraction (0.08 = 8%).
    pub fn from_fraction(fraction: f64) -> Self {
        TaxRate((fraction * 1_000_000.0).round().max(0.0) as u32)
    }

    /// Creates a tax rate from a percentage (8.0 = 8%).
    pub fn from_percentage(pct: f64) -> Self {
        Self::from_fraction(pct / 100.0)
    }

    #[inline]
    pub const fn ppm(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a decimal fraction.
    pub fn fraction(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Returns the rate as a percentage (for display only).
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 10_000.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses the `TaxRate` setting.
    ///
    /// ## Rules
    /// - `0.08` is a decimal fraction
    /// - `8%` (trailing percent sign) is a percentage
    /// - a bare number above 1 (`8.25`) is also a percentage
    /// - the result must lie between 0 and 1 (0% and 100%)
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::types::TaxRate;
    ///
    /// assert_eq!(TaxRate::parse("0.08").unwrap(), TaxRate::from_ppm(80_000));
    /// assert_eq!(TaxRate::parse("8.375%").unwrap(), TaxRate::from_ppm(83_750));
    /// assert!(TaxRate::parse("eight").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<TaxRate, ValidationError> {
        let trimmed = raw.trim();
        let (number, is_percent) = match trimmed.strip_suffix('%') {
            Some(n) => (n.trim(), true),
            None => (trimmed, false),
        };

        let value: f64 = number.parse().map_err(|_| {
            ValidationError::invalid_format("TaxRate", format!("'{}' is not a number", trimmed))
        })?;

        let fraction = if is_percent || value > 1.0 {
            value / 100.0
        } else {
            value
        };
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(ValidationError::invalid_format(
                "TaxRate",
                "must be a fraction between 0 and 1",
            ));
        }

        Ok(TaxRate::from_fraction(fraction))
    }

    /// Setting cell text: the decimal fraction.
    pub fn to_cell(&self) -> String {
        self.fraction().to_string()
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Payment state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Paid,
    Pending,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Pending => "Pending",
        }
    }

    /// Parses a status cell (case-insensitive).
    pub fn parse(raw: &str) -> Result<InvoiceStatus, ValidationError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "paid" => Ok(InvoiceStatus::Paid),
            "pending" => Ok(InvoiceStatus::Pending),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["Paid".to_string(), "Pending".to_string()],
            }),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Invoice Id
// =============================================================================

/// An invoice number.
///
/// ```text
/// Sequential(1042)               ← from the NextInvoiceID counter
/// Synthetic("INV-20240501134500-3f9a")  ← allocator fallback, never sequential
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceId {
    Sequential(u64),
    Synthetic(String),
}

impl InvoiceId {
    /// Interprets a `TransactionID` cell.
    pub fn parse(raw: &str) -> InvoiceId {
        let raw = raw.trim();
        match raw.parse::<u64>() {
            Ok(n) => InvoiceId::Sequential(n),
            Err(_) => InvoiceId::Synthetic(raw.to_string()),
        }
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, InvoiceId::Sequential(_))
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceId::Sequential(n) => write!(f, "{}", n),
            InvoiceId::Synthetic(s) => f.write_str(s),
        }
    }
}

impl From<String> for InvoiceId {
    fn from(raw: String) -> Self {
        InvoiceId::parse(&raw)
    }
}

impl From<InvoiceId> for String {
    fn from(id: InvoiceId) -> Self {
        id.to_string()
    }
}

// =============================================================================
// Inventory Item
// =============================================================================

/// A product row in `Inventory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub sku: String,
    pub name: String,
    pub price: Money,
    pub wholesale_price: Money,
    /// Units on hand, never persisted negative by a sale.
    pub stock_qty: i64,
    /// Weighted-average unit cost. `None` when the column is absent or blank.
    pub cost: Option<f64>,
}

impl InventoryItem {
    pub fn from_record(record: &Record) -> Self {
        InventoryItem {
            sku: record.text(col::SKU),
            name: record.text(col::NAME),
            price: record.money_or_zero(col::PRICE),
            wholesale_price: record.money_or_zero(col::WHOLESALE_PRICE),
            stock_qty: record.quantity_or_zero(col::STOCK_QTY),
            cost: record.decimal_opt(col::COST),
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (col::SKU, self.sku.clone()),
            (col::NAME, self.name.clone()),
            (col::PRICE, self.price.to_cell()),
            (col::WHOLESALE_PRICE, self.wholesale_price.to_cell()),
            (col::STOCK_QTY, self.stock_qty.to_string()),
            (col::COST, self.cost.map(format_cost).unwrap_or_default()),
        ]
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A row in `Customers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub joined: String,
    pub address: String,
    pub notes: String,
    /// Store credit, never negative.
    pub credit: Money,
}

impl Customer {
    pub fn from_record(record: &Record) -> Self {
        Customer {
            customer_id: record.text(col::CUSTOMER_ID),
            name: record.text(col::NAME),
            email: record.text(col::EMAIL),
            phone: record.text(col::PHONE),
            joined: record.text(col::JOINED),
            address: record.text(col::ADDRESS),
            notes: record.text(col::NOTES),
            credit: record.money_or_zero(col::CREDIT),
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (col::CUSTOMER_ID, self.customer_id.clone()),
            (col::NAME, self.name.clone()),
            (col::EMAIL, self.email.clone()),
            (col::PHONE, self.phone.clone()),
            (col::JOINED, self.joined.clone()),
            (col::ADDRESS, self.address.clone()),
            (col::NOTES, self.notes.clone()),
            (col::CREDIT, self.credit.to_cell()),
        ]
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// An invoice header row in `Transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub timestamp: String,
    pub total_amount: Money,
    pub payment_method: String,
    pub customer_id: String,
    /// `None` when the cell holds something other than Paid/Pending.
    pub status: Option<InvoiceStatus>,
    pub due_date: String,
    pub tax_amount: Money,
    pub is_wholesale: bool,
}

impl Transaction {
    pub fn from_record(record: &Record) -> Self {
        Transaction {
            transaction_id: record.text(col::TRANSACTION_ID),
            timestamp: record.text(col::TIMESTAMP),
            total_amount: record.money_or_zero(col::TOTAL_AMOUNT),
            payment_method: record.text(col::PAYMENT_METHOD),
            customer_id: record.text(col::CUSTOMER_ID),
            status: InvoiceStatus::parse(record.get(col::STATUS).text()).ok(),
            due_date: record.text(col::DUE_DATE),
            tax_amount: record.money_or_zero(col::TAX_AMOUNT),
            is_wholesale: record.flag(col::IS_WHOLESALE),
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (col::TRANSACTION_ID, self.transaction_id.clone()),
            (col::TIMESTAMP, self.timestamp.clone()),
            (col::TOTAL_AMOUNT, self.total_amount.to_cell()),
            (col::PAYMENT_METHOD, self.payment_method.clone()),
            (col::CUSTOMER_ID, self.customer_id.clone()),
            (
                col::STATUS,
                self.status.map(|s| s.as_str().to_string()).unwrap_or_default(),
            ),
            (col::DUE_DATE, self.due_date.clone()),
            (col::TAX_AMOUNT, self.tax_amount.to_cell()),
            (col::IS_WHOLESALE, format_flag(self.is_wholesale)),
        ]
    }

    /// Calendar date of the sale.
    pub fn date(&self) -> Option<NaiveDate> {
        parse_sheet_date(&self.timestamp)
    }
}

// =============================================================================
// Transaction Item
// =============================================================================

/// A line item row in `TransactionItems`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionItem {
    pub transaction_id: String,
    pub sku: String,
    pub qty_sold: i64,
    /// Unit price charged.
    pub price: Money,
    /// Product name at sale time.
    pub name: String,
    /// Unit cost at sale time. `None` on rows written before costs were
    /// snapshotted.
    pub cost: Option<f64>,
}

impl TransactionItem {
    pub fn from_record(record: &Record) -> Self {
        TransactionItem {
            transaction_id: record.text(col::TRANSACTION_ID),
            sku: record.text(col::SKU),
            qty_sold: record.quantity_or_zero(col::QTY_SOLD),
            price: record.money_or_zero(col::PRICE),
            name: record.text(col::NAME),
            cost: record.decimal_opt(col::COST),
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (col::TRANSACTION_ID, self.transaction_id.clone()),
            (col::SKU, self.sku.clone()),
            (col::QTY_SOLD, self.qty_sold.to_string()),
            (col::PRICE, self.price.to_cell()),
            (col::NAME, self.name.clone()),
            (col::COST, self.cost.map(format_cost).unwrap_or_default()),
        ]
    }

    /// `qty_sold × price`.
    pub fn line_total(&self) -> Money {
        self.price.multiply_quantity(self.qty_sold)
    }
}

// =============================================================================
// Expense
// =============================================================================

/// A row in `Expenses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub date: String,
    pub category: String,
    pub amount: Money,
    pub description: String,
}

impl Expense {
    pub fn from_record(record: &Record) -> Self {
        Expense {
            date: record.text(col::DATE),
            category: record.text(col::CATEGORY),
            amount: record.money_or_zero(col::AMOUNT),
            description: record.text(col::DESCRIPTION),
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (col::DATE, self.date.clone()),
            (col::CATEGORY, self.category.clone()),
            (col::AMOUNT, self.amount.to_cell()),
            (col::DESCRIPTION, self.description.clone()),
        ]
    }
}

// =============================================================================
// Setting
// =============================================================================

/// A key/value row in `Settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

impl Setting {
    pub fn from_record(record: &Record) -> Self {
        Setting {
            key: record.text(col::KEY),
            value: record.text(col::VALUE),
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![(col::KEY, self.key.clone()), (col::VALUE, self.value.clone())]
    }
}

/// Company details printed on invoices, read from `Settings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub company_name: String,
    pub address: String,
    pub venmo_user: String,
}

// =============================================================================
// Sale Line
// =============================================================================

/// One line of a cart handed to the sale commit engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLine {
    pub sku: String,
    pub name: String,
    pub qty: i64,
    /// Unit price charged (retail or wholesale, already chosen).
    pub price: Money,
}

impl SaleLine {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, qty: i64, price: Money) -> Self {
        SaleLine {
            sku: sku.into(),
            name: name.into(),
            qty,
            price,
        }
    }

    pub fn line_total(&self) -> Money {
        self.price.multiply_quantity(self.qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::SheetSchema;
    use std::sync::Arc;

    #[test]
    fn test_tax_rate_parse() {
        assert_eq!(TaxRate::parse("0.08").unwrap().ppm(), 80_000);
        assert_eq!(TaxRate::parse(" 8% ").unwrap().ppm(), 80_000);
        assert_eq!(TaxRate::parse("0").unwrap(), TaxRate::zero());
        assert!(TaxRate::parse("").is_err());
        assert_eq!(TaxRate::parse("8.25").unwrap().ppm(), 82_500);
        assert!(TaxRate::parse("250").is_err());
        assert!(TaxRate::parse("-0.1").is_err());
    }

    #[test]
    fn test_invoice_status_parse() {
        assert_eq!(InvoiceStatus::parse("Paid").unwrap(), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::parse("pending").unwrap(), InvoiceStatus::Pending);
        assert!(InvoiceStatus::parse("Refunded").is_err());
    }

    #[test]
    fn test_invoice_id() {
        let id = InvoiceId::parse("1042");
        assert_eq!(id, InvoiceId::Sequential(1042));
        assert!(id.is_sequential());
        assert_eq!(id.to_string(), "1042");

        let synthetic = InvoiceId::parse("INV-20240501134500-3f9a");
        assert!(!synthetic.is_sequential());
        assert_eq!(synthetic.to_string(), "INV-20240501134500-3f9a");
    }

    #[test]
    fn test_invoice_id_serializes_as_string() {
        let json = serde_json::to_string(&InvoiceId::Sequential(7)).unwrap();
        assert_eq!(json, "\"7\"");

        let back: InvoiceId = serde_json::from_str("\"INV-1\"").unwrap();
        assert_eq!(back, InvoiceId::Synthetic("INV-1".to_string()));
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(2.5), "2.5");
        assert_eq!(format_cost(3.0), "3");
        assert_eq!(format_cost(2.123_456), "2.1235");
        assert_eq!(format_cost(-0.000_01), "0");
    }

    #[test]
    fn test_parse_sheet_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert_eq!(parse_sheet_date("2024-05-01 13:45:00"), expected);
        assert_eq!(parse_sheet_date("2024-05-01"), expected);
        assert_eq!(parse_sheet_date("05/01/2024"), expected);
        assert_eq!(parse_sheet_date("2024-05-01 13:45"), expected);
        assert_eq!(parse_sheet_date("yesterday"), None);
    }

    #[test]
    fn test_inventory_item_from_record_is_lenient() {
        let schema = Arc::new(SheetSchema::from_names(
            "Inventory",
            &["SKU", "Name", "Price", "StockQty"],
        ));
        let record = Record::new(
            2,
            schema,
            vec!["T-1".into(), "Red Thread".into(), "$4.00".into(), "".into()],
        );
        let item = InventoryItem::from_record(&record);
        assert_eq!(item.sku, "T-1");
        assert_eq!(item.price.cents(), 400);
        assert_eq!(item.stock_qty, 0);
        assert_eq!(item.cost, None);
    }

    #[test]
    fn test_transaction_fields_round_into_schema() {
        let schema = SheetSchema::from_names(
            "Transactions",
            &["TransactionID", "TotalAmount", "Status", "IsWholesale"],
        );
        let tx = Transaction {
            transaction_id: "1001".into(),
            timestamp: "2024-05-01 10:00:00".into(),
            total_amount: Money::from_cents(10_800),
            payment_method: "Cash".into(),
            customer_id: "Guest".into(),
            status: Some(InvoiceStatus::Pending),
            due_date: "2024-05-31".into(),
            tax_amount: Money::from_cents(800),
            is_wholesale: false,
        };
        let row = schema.build_row(&tx.to_fields());
        assert_eq!(row, vec!["1001", "108.00", "Pending", "FALSE"]);
    }
}
