//! # Settings Repository
//!
//! `Settings` is a key/value sheet. Keys are matched trimmed and
//! case-sensitively; the first row with a key wins.

use ledger_core::{col, Setting};
use tracing::debug;

use crate::error::StoreResult;
use crate::tables::LedgerTable;
use crate::workbook::{RowHandle, Workbook};

const TABLE: LedgerTable = LedgerTable::Settings;

/// Repository for settings rows.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    workbook: Workbook,
}

impl SettingsRepository {
    pub fn new(workbook: Workbook) -> Self {
        SettingsRepository { workbook }
    }

    pub async fn all(&self) -> StoreResult<Vec<Setting>> {
        let records = self.workbook.read_all(TABLE).await?;
        Ok(records.iter().map(Setting::from_record).collect())
    }

    /// Value of `key`, or `None` if the key has no row.
    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.probe(key).await? {
            Some(handle) => self.workbook.read_field(&handle, col::VALUE).await,
            None => Ok(None),
        }
    }

    pub async fn probe(&self, key: &str) -> StoreResult<Option<RowHandle>> {
        self.workbook.probe(TABLE, key).await
    }

    /// Updates `key` in place, or appends it. Returns `true` when appended.
    pub async fn upsert(&self, key: &str, value: &str) -> StoreResult<bool> {
        match self.probe(key).await? {
            Some(handle) => {
                self.workbook.write_field(&handle, col::VALUE, value).await?;
                debug!(key, "Setting updated");
                Ok(false)
            }
            None => {
                let setting = Setting {
                    key: key.trim().to_string(),
                    value: value.to_string(),
                };
                self.workbook.append_record(TABLE, &setting.to_fields()).await?;
                debug!(key, "Setting added");
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryWorkbook;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_upsert_updates_or_appends() {
        let mem = MemoryWorkbook::new().with_sheet(
            "Settings",
            &["Key", "Value"],
            &[&["TaxRate", "0.08"], &["CompanyName", "Acme"]],
        );
        let repo = Workbook::new(Arc::new(mem)).settings();

        assert!(!repo.upsert("TaxRate", "0.0825").await.unwrap());
        assert!(repo.upsert("VenmoUser", "@acme").await.unwrap());

        assert_eq!(repo.get("TaxRate").await.unwrap().as_deref(), Some("0.0825"));
        assert_eq!(repo.get("VenmoUser").await.unwrap().as_deref(), Some("@acme"));
        assert_eq!(repo.get("Missing").await.unwrap(), None);
        assert_eq!(repo.all().await.unwrap().len(), 3);
    }
}
