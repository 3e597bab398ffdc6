//! # Invoice ID Allocator
//!
//! Issues invoice ids from the `NextInvoiceID` setting.
//!
//! ## Allocation Round
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  attempt 1..=max_attempts                                               │
//! │                                                                         │
//! │   read NextInvoiceID ──► n                                              │
//! │   write n + 1                                                           │
//! │   verify:                                                               │
//! │     re-read NextInvoiceID == n + 1 ?     (our write survived)           │
//! │     Transactions has no row "n" ?        (n not already issued)         │
//! │        │ yes                    │ no                                    │
//! │        ▼                        ▼                                       │
//! │   Sequential(n)            next attempt                                 │
//! │                                                                         │
//! │  counter missing / unreadable / write failed / attempts exhausted       │
//! │        ▼                                                                │
//! │   Synthetic("INV-<yyyymmddHHMMSS>-<4 hex>")                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Calls from the same process are serialised by a mutex. Two processes can
//! still read the same `n` and both pass verification if neither has written
//! its header yet; the verification only narrows that window.
//!
//! `RateLimited` at any point aborts the allocation. Nothing ledger-visible
//! has been written at that point, so the caller can retry the whole sale.

use std::sync::Arc;

use ledger_core::{col, InvoiceId, NEXT_INVOICE_ID_KEY};
use ledger_db::{StoreError, Workbook};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};

/// Why a round did not produce a sequential id.
enum RoundOutcome {
    Issued(u64),
    Retry,
    Fallback(&'static str),
}

/// Sequential invoice id allocator with a synthetic fallback.
pub struct InvoiceIdAllocator {
    workbook: Workbook,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    lock: Mutex<()>,
}

impl InvoiceIdAllocator {
    pub fn new(workbook: Workbook, clock: Arc<dyn Clock>, max_attempts: u32) -> Self {
        InvoiceIdAllocator {
            workbook,
            clock,
            max_attempts: max_attempts.max(1),
            lock: Mutex::new(()),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Allocates the next invoice id.
    ///
    /// ## Returns
    /// * `Ok(InvoiceId::Sequential(n))` - counter advanced and verified
    /// * `Ok(InvoiceId::Synthetic(_))` - counter unusable or contended
    /// * `Err(RateLimited)` - backend throttled, nothing written
    pub async fn allocate(&self) -> EngineResult<InvoiceId> {
        let _guard = self.lock.lock().await;

        for attempt in 1..=self.max_attempts {
            match self.round().await? {
                RoundOutcome::Issued(id) => {
                    info!(invoice_id = id, attempt, "Invoice id allocated");
                    return Ok(InvoiceId::Sequential(id));
                }
                RoundOutcome::Retry => {
                    warn!(attempt, max = self.max_attempts, "Invoice id verification failed, retrying");
                }
                RoundOutcome::Fallback(reason) => {
                    return Ok(self.synthetic(reason));
                }
            }
        }

        Ok(self.synthetic("attempts exhausted"))
    }

    /// One read / write / verify round.
    async fn round(&self) -> EngineResult<RoundOutcome> {
        let settings = self.workbook.settings();

        let Some(handle) = settings.probe(NEXT_INVOICE_ID_KEY).await? else {
            return Ok(RoundOutcome::Fallback("counter missing"));
        };

        let raw = self
            .workbook
            .read_field(&handle, col::VALUE)
            .await?
            .unwrap_or_default();
        let Some(current) = parse_counter(&raw) else {
            return Ok(RoundOutcome::Fallback("counter unreadable"));
        };
        let next = current + 1;

        match self
            .workbook
            .write_field(&handle, col::VALUE, &next.to_string())
            .await
        {
            Ok(true) => {}
            Ok(false) => return Ok(RoundOutcome::Fallback("counter has no Value column")),
            Err(StoreError::RateLimited) => return Err(EngineError::RateLimited),
            Err(e) => {
                warn!(error = %e, "Invoice counter write-back failed");
                return Ok(RoundOutcome::Fallback("write-back failed"));
            }
        }

        // Verification
        let reread = self
            .workbook
            .read_field(&handle, col::VALUE)
            .await?
            .and_then(|v| parse_counter(&v));
        if reread != Some(next) {
            debug!(expected = next, found = ?reread, "Counter changed under us");
            return Ok(RoundOutcome::Retry);
        }

        let used = self
            .workbook
            .invoices()
            .probe_header(&current.to_string())
            .await?;
        if used.is_some() {
            debug!(invoice_id = current, "Counter value already issued");
            return Ok(RoundOutcome::Retry);
        }

        Ok(RoundOutcome::Issued(current))
    }

    fn synthetic(&self, reason: &str) -> InvoiceId {
        let suffix = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
        let id = format!("INV-{}-{}", self.clock.now().format("%Y%m%d%H%M%S"), suffix);
        warn!(invoice_id = %id, reason, "Falling back to synthetic invoice id");
        InvoiceId::Synthetic(id)
    }
}

impl std::fmt::Debug for InvoiceIdAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvoiceIdAllocator")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Counter cell as a non-negative integer. `"1042.0"` is accepted.
fn parse_counter(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    trimmed.parse::<u64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;
    use ledger_db::{Fault, FaultKind, MemoryWorkbook, StoreOp};

    fn setup(counter: Option<&str>) -> (Arc<MemoryWorkbook>, InvoiceIdAllocator) {
        let tax_row = ["TaxRate", "0.08"];
        let counter_row = [NEXT_INVOICE_ID_KEY, counter.unwrap_or_default()];
        let mut settings: Vec<&[&str]> = vec![&tax_row];
        if counter.is_some() {
            settings.push(&counter_row);
        }
        let mem = Arc::new(
            MemoryWorkbook::new()
                .with_sheet("Settings", &["Key", "Value"], &settings)
                .with_sheet("Transactions", &["TransactionID", "TotalAmount"], &[&["900", "1.00"]]),
        );
        let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
        let alloc = InvoiceIdAllocator::new(Workbook::new(mem.clone()), clock, 3);
        (mem, alloc)
    }

    #[tokio::test]
    async fn test_sequential_allocations_increase() {
        let (_, alloc) = setup(Some("1000"));
        let mut last = 0;
        for _ in 0..5 {
            match alloc.allocate().await.unwrap() {
                InvoiceId::Sequential(n) => {
                    assert!(n > last || last == 0);
                    last = n;
                }
                other => panic!("expected sequential id, got {}", other),
            }
        }
        assert_eq!(last, 1004);
    }

    #[tokio::test]
    async fn test_missing_counter_falls_back() {
        let (_, alloc) = setup(None);
        let id = alloc.allocate().await.unwrap();
        assert!(!id.is_sequential());
        assert!(id.to_string().starts_with("INV-20240501120000-"));
        assert_eq!(id.to_string().len(), "INV-20240501120000-ABCD".len());
    }

    #[tokio::test]
    async fn test_used_id_is_skipped() {
        let (_, alloc) = setup(Some("900"));
        assert_eq!(alloc.allocate().await.unwrap(), InvoiceId::Sequential(901));
    }

    #[tokio::test]
    async fn test_one_lost_write_is_retried() {
        let (mem, alloc) = setup(Some("1000"));
        mem.inject(Fault::new(
            StoreOp::UpdateCell,
            "Settings",
            FaultKind::Clobber("1000".into()),
        ));
        assert_eq!(alloc.allocate().await.unwrap(), InvoiceId::Sequential(1000));
        assert_eq!(mem.call_count(StoreOp::UpdateCell), 2);
    }

    #[tokio::test]
    async fn test_contended_counter_exhausts_to_synthetic() {
        let (mem, alloc) = setup(Some("1000"));
        mem.inject(
            Fault::new(StoreOp::UpdateCell, "Settings", FaultKind::Clobber("1000".into())).times(3),
        );
        let id = alloc.allocate().await.unwrap();
        assert!(!id.is_sequential());
        assert_eq!(mem.call_count(StoreOp::UpdateCell), 3);
    }

    #[tokio::test]
    async fn test_failed_write_back_falls_back() {
        let (mem, alloc) = setup(Some("1000"));
        mem.inject(Fault::new(
            StoreOp::UpdateCell,
            "Settings",
            FaultKind::Backend("quota".into()),
        ));
        assert!(!alloc.allocate().await.unwrap().is_sequential());
    }

    #[tokio::test]
    async fn test_rate_limit_propagates() {
        let (mem, alloc) = setup(Some("1000"));
        mem.inject(Fault::new(StoreOp::UpdateCell, "Settings", FaultKind::RateLimited));
        assert!(alloc.allocate().await.unwrap_err().is_rate_limited());
    }

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter(" 1042 "), Some(1042));
        assert_eq!(parse_counter("1042.0"), Some(1042));
        assert_eq!(parse_counter("1042.5"), None);
        assert_eq!(parse_counter("abc"), None);
        assert_eq!(parse_counter(""), None);
    }
}
