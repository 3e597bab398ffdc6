//! # Ledger Configuration
//!
//! Runtime configuration for the ledger engines.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     LEDGER_BACKEND=sqlite                                              │
//! │     LEDGER_DB_PATH=/srv/ledger.db                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/sheet-ledger/ledger.toml (Linux)                         │
//! │     ~/Library/Application Support/com.sheet-ledger.ledger/ (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     memory backend, 5 allocation attempts, clamp oversells             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # ledger.toml
//! [store]
//! backend = "sqlite"       # memory | sqlite
//! database_path = "./ledger.db"
//! max_connections = 5
//!
//! [allocator]
//! max_attempts = 5
//!
//! [sales]
//! guest_customer_id = "Guest"
//! pending_due_days = 30
//!
//! [inventory]
//! oversell = "clamp"       # clamp | reject
//!
//! [reports]
//! top_sellers_limit = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use ledger_core::{DEFAULT_PENDING_DUE_DAYS, GUEST_CUSTOMER_ID};
use ledger_db::DbConfig;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Store Settings
// =============================================================================

/// Which backend holds the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local tables. Lost on exit.
    #[default]
    Memory,

    /// SQLite file through a sqlx pool.
    Sqlite,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(EngineError::Config(format!(
                "Unknown store backend: '{}'. Valid options: memory, sqlite",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,

    /// SQLite file. `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,

    pub max_connections: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            backend: StoreBackend::Memory,
            database_path: None,
            max_connections: 5,
        }
    }
}

impl StoreSettings {
    /// Pool settings for the SQLite backend.
    pub fn db_config(&self) -> DbConfig {
        let path = self
            .database_path
            .clone()
            .or_else(default_database_path)
            .unwrap_or_else(|| PathBuf::from("ledger.db"));
        DbConfig::new(path).max_connections(self.max_connections)
    }
}

// =============================================================================
// Engine Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorSettings {
    /// Read/write/verify rounds before falling back to a synthetic id.
    pub max_attempts: u32,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        AllocatorSettings { max_attempts: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesSettings {
    /// Customer reference written when a sale has no customer.
    pub guest_customer_id: String,

    /// Days from sale to due date for `Pending` invoices.
    pub pending_due_days: i64,
}

impl Default for SalesSettings {
    fn default() -> Self {
        SalesSettings {
            guest_customer_id: GUEST_CUSTOMER_ID.to_string(),
            pending_due_days: DEFAULT_PENDING_DUE_DAYS,
        }
    }
}

/// What a sale does when a line asks for more than is on hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversellPolicy {
    /// Sell anyway and clamp stock at zero.
    #[default]
    Clamp,

    /// Refuse the sale with `InsufficientStock` before any write.
    Reject,
}

impl std::str::FromStr for OversellPolicy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clamp" => Ok(OversellPolicy::Clamp),
            "reject" | "block" => Ok(OversellPolicy::Reject),
            other => Err(EngineError::Config(format!(
                "Unknown oversell policy: '{}'. Valid options: clamp, reject",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySettings {
    pub oversell: OversellPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub top_sellers_limit: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            top_sellers_limit: 10,
        }
    }
}

// =============================================================================
// Ledger Configuration
// =============================================================================

/// Complete ledger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub store: StoreSettings,
    pub allocator: AllocatorSettings,
    pub sales: SalesSettings,
    pub inventory: InventorySettings,
    pub reports: ReportSettings,
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`ledger.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file without applying the environment.
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> EngineResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.allocator.max_attempts == 0 {
            return Err(EngineError::Config(
                "allocator.max_attempts must be greater than 0".into(),
            ));
        }

        if self.sales.guest_customer_id.trim().is_empty() {
            return Err(EngineError::Config(
                "sales.guest_customer_id must not be empty".into(),
            ));
        }

        if self.sales.pending_due_days < 0 {
            return Err(EngineError::Config(
                "sales.pending_due_days must not be negative".into(),
            ));
        }

        if self.store.backend == StoreBackend::Sqlite && self.store.max_connections == 0 {
            return Err(EngineError::Config(
                "store.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `LEDGER_*` environment overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var("LEDGER_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding store backend from environment");
                    self.store.backend = parsed;
                }
                Err(_) => warn!(backend = %backend, "Unknown store backend in environment"),
            }
        }

        if let Ok(path) = std::env::var("LEDGER_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.database_path = Some(PathBuf::from(path));
        }

        if let Ok(attempts) = std::env::var("LEDGER_ALLOCATOR_MAX_ATTEMPTS") {
            if let Ok(n) = attempts.parse::<u32>() {
                self.allocator.max_attempts = n;
            }
        }

        if let Ok(guest) = std::env::var("LEDGER_GUEST_CUSTOMER_ID") {
            self.sales.guest_customer_id = guest;
        }

        if let Ok(policy) = std::env::var("LEDGER_OVERSELL") {
            match policy.parse() {
                Ok(parsed) => self.inventory.oversell = parsed,
                Err(_) => warn!(policy = %policy, "Unknown oversell policy in environment"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "sheet-ledger", "ledger")
            .map(|dirs| dirs.config_dir().join("ledger.toml"))
    }
}

/// Platform data directory location of `ledger.db`.
fn default_database_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "sheet-ledger", "ledger")
        .map(|dirs| dirs.data_dir().join("ledger.db"))
}
