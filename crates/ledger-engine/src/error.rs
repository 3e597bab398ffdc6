//! # Engine Error Types
//!
//! What the presentation layer sees when a ledger operation fails.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine Error Categories                            │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────────┐  │
//! │  │ Before any write │  │ Backend          │  │ After allocation     │  │
//! │  │                  │  │                  │  │                      │  │
//! │  │ InvalidInput     │  │ RateLimited      │  │ PartialCommitFailure │  │
//! │  │ InsufficientStock│  │ NotFound         │  │  (invoice id, stage, │  │
//! │  │ EmptyInputRejected│ │ Store            │  │   adjusted lines)    │  │
//! │  │ Config           │  │                  │  │ RestockIncomplete    │  │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────────┘  │
//! │                                                                         │
//! │  Nothing ledger-visible was      The ledger may hold a header,          │
//! │  written: safe to retry.         items or stock changes for the id.     │
//! │                                  Reconcile with resume_commit.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use ledger_core::commit::CommitProgress;
use ledger_core::{CommitStage, CoreError, ValidationError};
use ledger_db::StoreError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Commit Failure
// =============================================================================

/// A sale commit that stopped after its invoice id was allocated.
///
/// Carries everything [`resume_commit`](crate::SaleCommitEngine::resume_commit)
/// needs to continue with the same id.
#[derive(Debug)]
pub struct CommitFailure {
    /// The allocated invoice id. Always present.
    pub invoice_id: String,

    /// The step that failed.
    pub failed_at: CommitStage,

    /// Progress at the moment of failure.
    pub progress: CommitProgress,

    /// The underlying failure.
    pub source: Box<EngineError>,
}

impl CommitFailure {
    /// Last stage completed before the failure.
    pub fn last_reached(&self) -> CommitStage {
        self.progress.reached()
    }

    /// Cart line indices whose stock was already decremented.
    pub fn adjusted_lines(&self) -> Vec<usize> {
        self.progress.adjusted_lines().collect()
    }

    /// True when the failure was the backend asking us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        self.source.is_rate_limited()
    }
}

impl fmt::Display for CommitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invoice {} stopped at {} (last reached {}): {}",
            self.invoice_id,
            self.failed_at,
            self.last_reached(),
            self.source
        )
    }
}

// =============================================================================
// Engine Error
// =============================================================================

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A referenced SKU, customer, invoice or setting does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// The backend is throttling. Nothing was written by the failed call.
    #[error("Backend is rate limiting requests, try again later")]
    RateLimited,

    /// A whole-table replace was called with no rows. The table is untouched.
    #[error("Refusing to replace {0} with an empty table")]
    EmptyInputRejected(String),

    /// A sale commit failed after its invoice id was allocated.
    #[error("Partial commit: {0}")]
    PartialCommitFailure(Box<CommitFailure>),

    /// Input rejected before any write.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// A line asks for more than is on hand (reject oversell policy only).
    #[error("Insufficient stock for {sku}: have {available}, need {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// A restock saved the new StockQty but could not write Cost.
    ///
    /// The received units are already on the shelf; retrying the restock
    /// would count them twice. Fix the Cost cell instead.
    #[error("Restock of {sku} saved StockQty = {stock_written} but not Cost {cost}: {source}")]
    RestockIncomplete {
        sku: String,
        stock_written: i64,
        cost: String,
        source: StoreError,
    },

    /// Any other backend failure.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, EngineError::RateLimited)
    }

    /// The commit failure, if this is one.
    pub fn as_partial_commit(&self) -> Option<&CommitFailure> {
        match self {
            EngineError::PartialCommitFailure(failure) => Some(failure),
            _ => None,
        }
    }

    /// Consumes the error, returning the commit failure if this is one.
    pub fn into_partial_commit(self) -> Option<CommitFailure> {
        match self {
            EngineError::PartialCommitFailure(failure) => Some(*failure),
            _ => None,
        }
    }
}

/// Store errors keep their category; everything else is `Store`.
impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => EngineError::NotFound { entity, key },
            StoreError::RateLimited => EngineError::RateLimited,
            StoreError::EmptyInputRejected(table) => EngineError::EmptyInputRejected(table),
            other => EngineError::Store(other),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                sku,
                available,
                requested,
            } => EngineError::InsufficientStock {
                sku,
                available,
                requested,
            },
            CoreError::UnreadableCell {
                table,
                column,
                value,
            } => EngineError::InvalidInput(ValidationError::invalid_format(
                format!("{}.{}", table, column),
                format!("'{}' is not a number", value),
            )),
            CoreError::Validation(e) => EngineError::InvalidInput(e),
        }
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}
