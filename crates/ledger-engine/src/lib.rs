//! # ledger-engine: Inventory / Ledger Consistency Engine
//!
//! Sequences the multi-step writes of a point-of-sale ledger against a
//! tabular store that has no transactions.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Ledger                                     │
//! │                                                                         │
//! │  sales ──────► SaleCommitEngine ──┬──► InvoiceIdAllocator               │
//! │                                   ├──► InventoryEngine ◄── inventory    │
//! │                                   └──► CreditLedger    ◄── credit       │
//! │                                                                         │
//! │  customers    CustomerDirectory      invoices   InvoiceBook             │
//! │  settings     SettingsStore          expenses   ExpenseLog              │
//! │  reports      ReportAggregator                                          │
//! │                                                                         │
//! │                    all share one ledger_db::Workbook                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`allocator`] - `NextInvoiceID` allocation with verification
//! - [`sale`] - Sale commit and resume
//! - [`inventory`] - Create, restock, batch replace, decrement
//! - [`credit`] - Store credit and gift certificates
//! - [`customers`], [`invoices`], [`settings`], [`expenses`] - Maintenance
//! - [`reports`] - Income statement, tax, top sellers, receivables
//! - [`config`] - `LedgerConfig` (TOML + env)
//! - [`telemetry`] - tracing subscriber setup
//! - [`clock`] - Wall clock abstraction
//! - [`error`] - `EngineError`, `CommitFailure`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_engine::{Ledger, LedgerConfig, SaleRequest};
//!
//! let ledger = Ledger::open(LedgerConfig::load(None)?).await?;
//! ledger.bootstrap().await?;
//!
//! let id = ledger.sales.commit_sale(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod clock;
pub mod config;
pub mod credit;
pub mod customers;
pub mod error;
pub mod expenses;
pub mod inventory;
pub mod invoices;
pub mod reports;
pub mod sale;
pub mod settings;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use allocator::InvoiceIdAllocator;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{LedgerConfig, OversellPolicy, StoreBackend};
pub use credit::CreditLedger;
pub use customers::{CustomerDetails, CustomerDirectory};
pub use error::{CommitFailure, EngineError, EngineResult};
pub use expenses::ExpenseLog;
pub use inventory::{InventoryEngine, NewItem, RestockOutcome};
pub use invoices::InvoiceBook;
pub use reports::ReportAggregator;
pub use sale::{SaleCommitEngine, SaleRequest};
pub use settings::SettingsStore;

use std::sync::Arc;

use ledger_core::NEXT_INVOICE_ID_KEY;
use ledger_db::{LedgerTable, MemoryWorkbook, SheetStore, SqliteWorkbook, Workbook};
use tracing::info;

/// Counter value written by [`Ledger::bootstrap`] when none exists.
pub const INITIAL_INVOICE_ID: &str = "1000";

// =============================================================================
// Ledger
// =============================================================================

/// Every engine, wired to one workbook.
#[derive(Debug)]
pub struct Ledger {
    pub workbook: Workbook,
    pub config: LedgerConfig,
    pub allocator: Arc<InvoiceIdAllocator>,
    pub sales: SaleCommitEngine,
    pub inventory: InventoryEngine,
    pub credit: CreditLedger,
    pub customers: CustomerDirectory,
    pub invoices: InvoiceBook,
    pub settings: SettingsStore,
    pub expenses: ExpenseLog,
    pub reports: ReportAggregator,
}

impl Ledger {
    /// Opens the backend named in `config` with the system clock.
    pub async fn open(config: LedgerConfig) -> EngineResult<Self> {
        config.validate()?;

        let store: Arc<dyn SheetStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryWorkbook::new()),
            StoreBackend::Sqlite => {
                Arc::new(SqliteWorkbook::open(&config.store.db_config()).await?)
            }
        };
        Ok(Self::with_store(store, config, Arc::new(SystemClock)))
    }

    /// Wires every engine to an existing store.
    pub fn with_store(store: Arc<dyn SheetStore>, config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        let workbook = Workbook::new(store);

        let allocator = Arc::new(InvoiceIdAllocator::new(
            workbook.clone(),
            clock.clone(),
            config.allocator.max_attempts,
        ));
        let inventory = InventoryEngine::new(workbook.clone(), config.inventory.oversell);
        let credit = CreditLedger::new(workbook.clone(), allocator.clone(), clock.clone());
        let sales = SaleCommitEngine::new(
            workbook.clone(),
            allocator.clone(),
            inventory.clone(),
            credit.clone(),
            clock.clone(),
            config.sales.clone(),
        );
        let settings = SettingsStore::new(workbook.clone());

        info!(
            backend = workbook.backend_name(),
            oversell = ?config.inventory.oversell,
            "Ledger ready"
        );

        Ledger {
            customers: CustomerDirectory::new(workbook.clone(), clock.clone()),
            invoices: InvoiceBook::new(workbook.clone(), settings.clone()),
            expenses: ExpenseLog::new(workbook.clone()),
            reports: ReportAggregator::new(workbook.clone(), clock, config.reports.clone()),
            workbook,
            config,
            allocator,
            sales,
            inventory,
            credit,
            settings,
        }
    }

    /// Creates missing tables with default headers and seeds the invoice
    /// counter when it is absent. Returns the tables created.
    pub async fn bootstrap(&self) -> EngineResult<Vec<LedgerTable>> {
        let created = self.workbook.ensure_all().await?;

        let settings = self.workbook.settings();
        if settings.probe(NEXT_INVOICE_ID_KEY).await?.is_none() {
            settings.upsert(NEXT_INVOICE_ID_KEY, INITIAL_INVOICE_ID).await?;
            info!(value = INITIAL_INVOICE_ID, "Invoice counter seeded");
        }

        info!(created = created.len(), "Workbook bootstrapped");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let ledger = Ledger::open(LedgerConfig::default()).await.unwrap();
        assert_eq!(ledger.bootstrap().await.unwrap().len(), LedgerTable::ALL.len());
        assert!(ledger.bootstrap().await.unwrap().is_empty());

        assert_eq!(
            ledger.settings.get(NEXT_INVOICE_ID_KEY).await.unwrap().as_deref(),
            Some(INITIAL_INVOICE_ID)
        );
    }
}
