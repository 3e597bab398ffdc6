//! # Database Migrations
//!
//! Embedded SQL migrations for the SQLite workbook.
//!
//! ## Schema
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sheets                          sheet_rows                             │
//! │  ─────────────────               ──────────────────────────────         │
//! │  name   TEXT PK     ◄──────────  sheet     TEXT                         │
//! │  header TEXT (JSON)              position  INTEGER (0 = sheet row 2)    │
//! │                                  cells     TEXT (JSON array)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The workbook mirrors a spreadsheet, so columns live inside the JSON cell
//! array rather than as SQL columns: adding a header cell needs no migration.
//!
//! ## Adding New Migrations
//! 1. Create `migrations/sqlite/NNN_description.sql` with the next number
//! 2. **NEVER** modify existing migrations - always add new ones

use sqlx::SqlitePool;
use tracing::info;

use crate::error::StoreResult;

/// Embedded migrations from the `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> StoreResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns (total_migrations, applied_migrations), for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> StoreResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
