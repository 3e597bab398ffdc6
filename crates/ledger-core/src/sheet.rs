//! # Sheet Row Model
//!
//! Header-resolved view of a spreadsheet table.
//!
//! ## Why Resolve By Name?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Row 1 (header):  SKU │ Name │ Price │ WholesalePrice │ StockQty │ Cost │
//! │  Row 2:           T-1 │ Red  │ 4.00  │ 3.00           │ 12       │ 2.5  │
//! │                                                                         │
//! │  The shop owner may insert, reorder or drop columns by hand at any      │
//! │  time. Code therefore never says "column 5", it says "StockQty" and     │
//! │  asks the live header where that is.                                    │
//! │                                                                         │
//! │  SheetSchema::column_of("StockQty") → Some(5)    (1-based)             │
//! │  SheetSchema::column_of("Cost")     → None when the column was removed │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Absent vs Empty
//! A [`Record`] distinguishes a field the table has no column for
//! ([`Field::Absent`]) from a column whose cell is blank ([`Field::Empty`]).
//! Writers skip absent fields; readers usually treat both as "no value".

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Sheet Schema
// =============================================================================

/// The ordered header row of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSchema {
    table: String,
    columns: Vec<String>,
}

impl SheetSchema {
    /// Creates a schema from a header row. Header cells are trimmed.
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        SheetSchema {
            table: table.into(),
            columns: columns.into_iter().map(|c| c.trim().to_string()).collect(),
        }
    }

    /// Convenience constructor for static headers.
    pub fn from_names(table: impl Into<String>, names: &[&str]) -> Self {
        Self::new(table, names.iter().map(|n| n.to_string()).collect())
    }

    /// Name of the table this header belongs to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Header cells in sheet order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of header cells.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Returns the 1-based column index of `name`, or `None` if the header
    /// has no such column. The first matching header cell wins.
    pub fn column_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| idx + 1)
    }

    /// Checks whether the header has a column called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.column_of(name).is_some()
    }

    /// Builds a full-width row for this header.
    ///
    /// ## Rules
    /// - Every slot starts blank
    /// - Each `(field, value)` lands in the slot its name resolves to
    /// - Fields the header does not have are skipped
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::sheet::SheetSchema;
    ///
    /// let schema = SheetSchema::from_names("Inventory", &["Name", "SKU", "Notes"]);
    /// let row = schema.build_row(&[("SKU", "T-1".to_string()), ("Cost", "2.5".to_string())]);
    /// assert_eq!(row, vec!["", "T-1", ""]);
    /// ```
    pub fn build_row(&self, fields: &[(&str, String)]) -> Vec<String> {
        let mut row = vec![String::new(); self.columns.len()];
        for (name, value) in fields {
            if let Some(col) = self.column_of(name) {
                row[col - 1] = value.clone();
            }
        }
        row
    }
}

// =============================================================================
// Field
// =============================================================================

/// The value of one named field on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    /// The table has no column with this name.
    Absent,
    /// The column exists but the cell is blank.
    Empty,
    /// The trimmed cell text.
    Value(&'a str),
}

impl<'a> Field<'a> {
    /// Returns the cell text when there is one.
    pub fn value(&self) -> Option<&'a str> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the cell text, or `""` for absent and empty fields.
    pub fn text(&self) -> &'a str {
        self.value().unwrap_or("")
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }
}

// =============================================================================
// Record
// =============================================================================

/// One data row, addressable by header name.
#[derive(Debug, Clone)]
pub struct Record {
    row: usize,
    schema: Arc<SheetSchema>,
    cells: Vec<String>,
}

impl Record {
    /// Wraps the raw cells of sheet row `row` (1-based, header is row 1).
    pub fn new(row: usize, schema: Arc<SheetSchema>, cells: Vec<String>) -> Self {
        Record { row, schema, cells }
    }

    /// The 1-based sheet row this record was read from.
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn schema(&self) -> &SheetSchema {
        &self.schema
    }

    /// Raw cells in sheet order.
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Looks up a field by header name.
    pub fn get(&self, name: &str) -> Field<'_> {
        let Some(col) = self.schema.column_of(name) else {
            return Field::Absent;
        };
        match self.cells.get(col - 1).map(|c| c.trim()) {
            Some(v) if !v.is_empty() => Field::Value(v),
            _ => Field::Empty,
        }
    }

    /// Cell text, `""` when absent or blank.
    pub fn text(&self, name: &str) -> String {
        self.get(name).text().to_string()
    }

    // -------------------------------------------------------------------------
    // Lenient readers (reports, listings)
    // -------------------------------------------------------------------------

    /// Money cell, zero when absent, blank or unparseable.
    pub fn money_or_zero(&self, name: &str) -> Money {
        Money::parse_lenient(self.get(name).text())
    }

    /// Integer cell, zero when absent, blank or unparseable.
    pub fn quantity_or_zero(&self, name: &str) -> i64 {
        self.get(name).value().and_then(parse_quantity).unwrap_or(0)
    }

    /// Decimal cell, `None` when absent, blank or unparseable.
    pub fn decimal_opt(&self, name: &str) -> Option<f64> {
        self.get(name).value().and_then(parse_decimal)
    }

    /// Boolean cell; `TRUE` in any case is true, everything else false.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).text().eq_ignore_ascii_case("true")
    }

    // -------------------------------------------------------------------------
    // Strict readers (mutations)
    // -------------------------------------------------------------------------

    /// Integer cell for a read-modify-write.
    ///
    /// `Ok(None)` when the column is absent, `Ok(Some(0))` when blank,
    /// `UnreadableCell` when the text is not a whole number.
    pub fn quantity(&self, name: &str) -> CoreResult<Option<i64>> {
        match self.get(name) {
            Field::Absent => Ok(None),
            Field::Empty => Ok(Some(0)),
            Field::Value(v) => parse_quantity(v)
                .map(Some)
                .ok_or_else(|| self.unreadable(name, v)),
        }
    }

    /// Decimal cell for a read-modify-write. Same rules as [`Record::quantity`].
    pub fn decimal(&self, name: &str) -> CoreResult<Option<f64>> {
        match self.get(name) {
            Field::Absent => Ok(None),
            Field::Empty => Ok(Some(0.0)),
            Field::Value(v) => parse_decimal(v)
                .map(Some)
                .ok_or_else(|| self.unreadable(name, v)),
        }
    }

    /// Money cell for a read-modify-write. Same rules as [`Record::quantity`].
    pub fn money(&self, name: &str) -> CoreResult<Option<Money>> {
        match self.get(name) {
            Field::Absent => Ok(None),
            Field::Empty => Ok(Some(Money::zero())),
            Field::Value(v) => Money::parse(v)
                .map(Some)
                .map_err(|_| self.unreadable(name, v)),
        }
    }

    fn unreadable(&self, column: &str, value: &str) -> CoreError {
        CoreError::UnreadableCell {
            table: self.schema.table().to_string(),
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}

// =============================================================================
// Cell Parsing
// =============================================================================

/// Parses a whole-number cell. `"12"` and `"12.0"` are both 12.
///
/// Values outside the `i64` range (`"1e19"`) are unreadable, not saturated.
pub fn parse_quantity(raw: &str) -> Option<i64> {
    let raw = raw.trim().replace(',', "");
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    // 2^63 is exactly representable; i64::MAX as f64 rounds up to it
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f >= -LIMIT && f < LIMIT => Some(f as i64),
        _ => None,
    }
}

/// Parses a decimal cell, tolerating `$` and thousands separators.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory_schema() -> Arc<SheetSchema> {
        Arc::new(SheetSchema::from_names(
            "Inventory",
            &["SKU", "Name", "Price", "StockQty"],
        ))
    }

    #[test]
    fn test_column_of_is_one_based() {
        let schema = inventory_schema();
        assert_eq!(schema.column_of("SKU"), Some(1));
        assert_eq!(schema.column_of("StockQty"), Some(4));
        assert_eq!(schema.column_of("Cost"), None);
    }

    #[test]
    fn test_header_cells_are_trimmed() {
        let schema = SheetSchema::new("Inventory", vec![" SKU ".into(), "Cost\t".into()]);
        assert_eq!(schema.column_of("Cost"), Some(2));
    }

    #[test]
    fn test_build_row_skips_unknown_fields() {
        let schema = inventory_schema();
        let row = schema.build_row(&[
            ("StockQty", "7".to_string()),
            ("SKU", "T-1".to_string()),
            ("Cost", "2.5".to_string()),
        ]);
        assert_eq!(row, vec!["T-1", "", "", "7"]);
    }

    #[test]
    fn test_absent_vs_empty() {
        let record = Record::new(
            2,
            inventory_schema(),
            vec!["T-1".into(), "".into(), "4.00".into()],
        );
        assert_eq!(record.get("SKU"), Field::Value("T-1"));
        assert_eq!(record.get("Name"), Field::Empty);
        // Short row: trailing cells are blank, not absent
        assert_eq!(record.get("StockQty"), Field::Empty);
        assert_eq!(record.get("Cost"), Field::Absent);
    }

    #[test]
    fn test_strict_quantity() {
        let schema = inventory_schema();
        let ok = Record::new(2, schema.clone(), vec!["T-1".into(), "".into(), "".into(), "12.0".into()]);
        assert_eq!(ok.quantity("StockQty").unwrap(), Some(12));
        assert_eq!(ok.quantity("Cost").unwrap(), None);

        let bad = Record::new(3, schema, vec!["T-2".into(), "".into(), "".into(), "twelve".into()]);
        let err = bad.quantity("StockQty").unwrap_err();
        assert!(matches!(err, CoreError::UnreadableCell { ref column, .. } if column == "StockQty"));
        assert_eq!(bad.quantity_or_zero("StockQty"), 0);
    }

    #[test]
    fn test_flag_is_case_insensitive() {
        let schema = Arc::new(SheetSchema::from_names("Transactions", &["IsWholesale"]));
        assert!(Record::new(2, schema.clone(), vec!["TRUE".into()]).flag("IsWholesale"));
        assert!(Record::new(3, schema.clone(), vec!["true".into()]).flag("IsWholesale"));
        assert!(!Record::new(4, schema, vec!["FALSE".into()]).flag("IsWholesale"));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_quantity("1,200"), Some(1200));
        assert_eq!(parse_quantity("1.5"), None);
        assert_eq!(parse_quantity("1e19"), None);
        assert_eq!(parse_quantity("99999999999999999999"), None);
        assert_eq!(parse_quantity("-1e19"), None);
        assert_eq!(parse_quantity("1e3"), Some(1000));
        assert_eq!(parse_decimal("$2.50"), Some(2.5));
        assert_eq!(parse_decimal("n/a"), None);
    }
}
