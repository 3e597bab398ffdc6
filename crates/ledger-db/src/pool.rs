//! # SQLite Pool Management
//!
//! Connection pool for the SQLite-backed workbook.
//!
//! ## Lock Contention
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout A ──► UPDATE sheet_rows ...  (holds the write lock)           │
//! │  checkout B ──► UPDATE sheet_rows ...                                   │
//! │                   │                                                     │
//! │                   ├─ waits up to busy_timeout for the lock              │
//! │                   └─ still locked → "database is locked"                │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                              StoreError::RateLimited                    │
//! │                                                                         │
//! │  no free connection within acquire_timeout → PoolTimedOut               │
//! │                                        → StoreError::RateLimited        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both cases surface the same way a remote spreadsheet quota would, so the
//! engine only ever handles one "try again later" error.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::StoreResult;
use crate::migrations;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Workbook database settings.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use ledger_db::DbConfig;
///
/// let config = DbConfig::new("/path/to/ledger.db")
///     .max_connections(4)
///     .busy_timeout(Duration::from_millis(500));
/// assert_eq!(config.max_connections, 4);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// How long a statement waits on a locked database before failing.
    /// Default: 2 seconds
    pub busy_timeout: Duration,

    /// How long to wait for a free pooled connection.
    /// Default: 10 seconds
    pub acquire_timeout: Duration,

    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(2),
            acquire_timeout: Duration::from_secs(10),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// A private in-memory workbook.
    ///
    /// With `:memory:` every connection is its own database, so the pool is
    /// pinned to one connection that is never recycled.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            // WAL keeps report reads from blocking a checkout
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };
        options.busy_timeout(self.busy_timeout)
    }
}

// =============================================================================
// Connect
// =============================================================================

/// Opens the pool and applies pending migrations.
pub async fn connect(config: &DbConfig) -> StoreResult<SqlitePool> {
    info!(
        path = %config.database_path.display(),
        "Opening workbook database"
    );

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(config.acquire_timeout);
    if config.is_in_memory() {
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options.connect_with(config.connect_options()).await?;
    debug!(
        max_connections = config.max_connections,
        busy_timeout_ms = config.busy_timeout.as_millis() as u64,
        "Workbook pool created"
    );

    if config.run_migrations {
        migrations::run_migrations(&pool).await?;
    }

    Ok(pool)
}

// =============================================================================
// Unit Tests
// =============================================================================
