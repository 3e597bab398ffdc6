//! # Store Error Types
//!
//! Error types for sheet backend operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  Backend failure (sqlx::Error, quota response, missing sheet)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← categorised: RateLimited is "try later",   │
//! │       │                     NotFound is a lookup answer, the rest are  │
//! │       │                     hard failures                              │
//! │       ▼                                                                 │
//! │  EngineError (ledger-engine) ← carries commit progress when relevant   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Sheet backend errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row with the given key.
    ///
    /// ## When This Occurs
    /// - `find_row_by_key` on a SKU, customer id or invoice id that is absent
    ///
    /// Callers decide whether this is an expected probe result or fatal.
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// The backend asked us to slow down.
    ///
    /// ## When This Occurs
    /// - Remote quota exceeded
    /// - SQLite `database is locked` / pool acquire timeout
    #[error("Backend is rate limiting requests, try again later")]
    RateLimited,

    /// The named sheet does not exist.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Row index outside the sheet.
    #[error("Row {row} is out of range for sheet {sheet}")]
    RowOutOfRange { sheet: String, row: usize },

    /// Column index 0 (columns are 1-based).
    #[error("Column {column} is out of range for sheet {sheet}")]
    ColumnOutOfRange { sheet: String, column: usize },

    /// A column the operation cannot work without is missing from the header.
    #[error("Sheet {sheet} has no {column} column")]
    MissingColumn { sheet: String, column: String },

    /// A whole-table overwrite was called with no rows.
    ///
    /// The table is left untouched.
    #[error("Refusing to overwrite {0} with an empty table")]
    EmptyInputRejected(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a NotFound error for a given entity and key.
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, StoreError::RateLimited)
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::PoolTimedOut             → StoreError::RateLimited
/// sqlx::Error::Database "locked"/"busy" → StoreError::RateLimited
/// sqlx::Error::Database (other)         → StoreError::Backend
/// Other                                 → StoreError::Backend
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::RateLimited,

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if msg.contains("database is locked") || msg.contains("database is busy") {
                    StoreError::RateLimited
                } else {
                    StoreError::Backend(msg.to_string())
                }
            }

            sqlx::Error::PoolClosed => StoreError::Backend("Pool is closed".to_string()),

            _ => StoreError::Backend(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(format!("corrupt row encoding: {}", err))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
