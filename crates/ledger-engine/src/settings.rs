//! # Settings
//!
//! Key/value rows in `Settings`: tax rate, company profile, the invoice
//! counter and anything else the shop stores there.
//!
//! ## Known Keys
//! ```text
//! ┌──────────────────┬─────────────────────────────────────────────────────┐
//! │ TaxRate          │ 0.08, 8%, or 8 (a bare value above 1 is percent)    │
//! │ CompanyName      │ invoice letterhead                                  │
//! │ CompanyAddress   │ invoice letterhead, may span lines                  │
//! │ VenmoUser        │ payment instructions                                │
//! │ NextInvoiceID    │ owned by the allocator, do not edit by hand         │
//! └──────────────────┴─────────────────────────────────────────────────────┘
//! ```

use ledger_core::{CompanyProfile, Setting, TaxRate, ValidationError, NEXT_INVOICE_ID_KEY};
use ledger_db::Workbook;
use tracing::{info, warn};

use crate::error::EngineResult;

pub const TAX_RATE_KEY: &str = "TaxRate";
pub const COMPANY_NAME_KEY: &str = "CompanyName";
pub const COMPANY_ADDRESS_KEY: &str = "CompanyAddress";
pub const VENMO_USER_KEY: &str = "VenmoUser";

/// Rate used when `TaxRate` is missing.
pub const DEFAULT_TAX_RATE_PPM: u32 = 80_000;

#[derive(Debug, Clone)]
pub struct SettingsStore {
    workbook: Workbook,
}

impl SettingsStore {
    pub fn new(workbook: Workbook) -> Self {
        SettingsStore { workbook }
    }

    pub async fn all(&self) -> EngineResult<Vec<Setting>> {
        Ok(self.workbook.settings().all().await?)
    }

    pub async fn get(&self, key: &str) -> EngineResult<Option<String>> {
        Ok(self.workbook.settings().get(key).await?)
    }

    /// The configured tax rate, 8% when the key is missing or blank.
    ///
    /// ## Errors
    /// - `InvalidInput` when the cell holds something that is not a rate
    pub async fn tax_rate(&self) -> EngineResult<TaxRate> {
        match self.get(TAX_RATE_KEY).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(TaxRate::parse(&raw)?),
            _ => Ok(TaxRate::from_ppm(DEFAULT_TAX_RATE_PPM)),
        }
    }

    pub async fn company_profile(&self) -> EngineResult<CompanyProfile> {
        let mut profile = CompanyProfile::default();
        for setting in self.all().await? {
            match setting.key.as_str() {
                COMPANY_NAME_KEY => profile.company_name = setting.value,
                COMPANY_ADDRESS_KEY => profile.address = setting.value,
                VENMO_USER_KEY => profile.venmo_user = setting.value,
                _ => {}
            }
        }
        Ok(profile)
    }

    /// Writes each pair, appending keys that do not exist yet.
    ///
    /// Pairs are applied in order; a failure leaves earlier pairs written.
    /// Returns how many keys were appended.
    pub async fn update_settings(&self, updates: &[(String, String)]) -> EngineResult<usize> {
        for (key, _) in updates {
            if key.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "setting key".to_string(),
                }
                .into());
            }
        }
        if let Some((_, raw)) = updates.iter().find(|(k, _)| k.trim() == TAX_RATE_KEY) {
            TaxRate::parse(raw)?;
        }

        let repo = self.workbook.settings();
        let mut appended = 0;
        for (key, value) in updates {
            if key.trim() == NEXT_INVOICE_ID_KEY {
                warn!(value = %value, "Invoice counter changed by hand");
            }
            if repo.upsert(key.trim(), value).await? {
                appended += 1;
            }
        }

        info!(count = updates.len(), appended, "Settings updated");
        Ok(appended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use ledger_db::MemoryWorkbook;
    use std::sync::Arc;

    fn store(rows: &[&[&str]]) -> (Arc<MemoryWorkbook>, SettingsStore) {
        let mem = Arc::new(MemoryWorkbook::new().with_sheet("Settings", &["Key", "Value"], rows));
        (mem.clone(), SettingsStore::new(Workbook::new(mem)))
    }

    #[tokio::test]
    async fn test_tax_rate_default_and_parse() {
        let (_, empty) = store(&[]);
        assert_eq!(empty.tax_rate().await.unwrap(), TaxRate::from_fraction(0.08));

        let (_, pct) = store(&[&["TaxRate", "6.5%"]]);
        assert_eq!(pct.tax_rate().await.unwrap(), TaxRate::from_fraction(0.065));

        let (_, bad) = store(&[&["TaxRate", "lots"]]);
        assert!(matches!(bad.tax_rate().await, Err(EngineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_update_settings_upserts() {
        let (mem, settings) = store(&[&["TaxRate", "0.08"], &["CompanyName", "Old"]]);
        let appended = settings
            .update_settings(&[
                ("CompanyName".into(), "Notions & Co".into()),
                ("VenmoUser".into(), "@notions".into()),
            ])
            .await
            .unwrap();
        assert_eq!(appended, 1);

        let (_, rows) = mem.snapshot("Settings").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["CompanyName", "Notions & Co"]);

        let profile = settings.company_profile().await.unwrap();
        assert_eq!(profile.company_name, "Notions & Co");
        assert_eq!(profile.venmo_user, "@notions");
    }

    #[tokio::test]
    async fn test_bad_tax_rate_rejected_before_writing() {
        let (mem, settings) = store(&[&["TaxRate", "0.08"]]);
        let err = settings
            .update_settings(&[
                ("CompanyName".into(), "Shop".into()),
                ("TaxRate".into(), "abc".into()),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert_eq!(mem.snapshot("Settings").await.unwrap().1.len(), 1);
    }
}
