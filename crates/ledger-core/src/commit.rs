//! # Sale Commit State Machine
//!
//! A checkout is five dependent writes against a store with no transactions.
//! The stages make "how far did we get" explicit so a failure can be reported
//! and resumed instead of guessed at.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌───────────────────┐
//! │ AllocatingId │──►│ HeaderWritten│──►│ ItemsWritten │──►│ InventoryAdjusted │
//! └──────────────┘   └──────────────┘   └──────────────┘   └─────────┬─────────┘
//!        │                                                            │
//!        │ failure here: nothing ledger-visible           ┌───────────▼────────┐
//!        │ was written, plain error                        │   CreditAdjusted   │
//!        ▼                                                 └───────────┬────────┘
//!                                                                      ▼
//!   failure after allocation: PartialCommitFailure            ┌────────────────┐
//!   (invoice id + last reached stage), resumable              │    Complete    │
//!                                                             └────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// Commit Stage
// =============================================================================

/// A stage of the sale commit, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CommitStage {
    AllocatingId,
    HeaderWritten,
    ItemsWritten,
    InventoryAdjusted,
    CreditAdjusted,
    Complete,
}

impl CommitStage {
    /// The stage after this one (`Complete` stays `Complete`).
    pub fn next(self) -> CommitStage {
        match self {
            CommitStage::AllocatingId => CommitStage::HeaderWritten,
            CommitStage::HeaderWritten => CommitStage::ItemsWritten,
            CommitStage::ItemsWritten => CommitStage::InventoryAdjusted,
            CommitStage::InventoryAdjusted => CommitStage::CreditAdjusted,
            CommitStage::CreditAdjusted | CommitStage::Complete => CommitStage::Complete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitStage::AllocatingId => "allocating_id",
            CommitStage::HeaderWritten => "header_written",
            CommitStage::ItemsWritten => "items_written",
            CommitStage::InventoryAdjusted => "inventory_adjusted",
            CommitStage::CreditAdjusted => "credit_adjusted",
            CommitStage::Complete => "complete",
        }
    }
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Commit Progress
// =============================================================================

/// How far one commit got, including which cart lines already had their
/// stock decremented.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitProgress {
    reached: Option<CommitStage>,
    adjusted_lines: BTreeSet<usize>,
}

impl CommitProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a known stage (used when resuming).
    pub fn at(stage: CommitStage) -> Self {
        CommitProgress {
            reached: Some(stage),
            adjusted_lines: BTreeSet::new(),
        }
    }

    /// Last stage completed, `AllocatingId` when none has been.
    pub fn reached(&self) -> CommitStage {
        self.reached.unwrap_or(CommitStage::AllocatingId)
    }

    /// The stage the commit is currently working towards.
    pub fn attempting(&self) -> CommitStage {
        match self.reached {
            None => CommitStage::AllocatingId,
            Some(stage) => stage.next(),
        }
    }

    /// Records that `stage` was reached. Stages never move backwards.
    pub fn advance(&mut self, stage: CommitStage) {
        self.reached = Some(match self.reached {
            Some(current) => current.max(stage),
            None => stage,
        });
    }

    pub fn has_reached(&self, stage: CommitStage) -> bool {
        self.reached.map(|r| r >= stage).unwrap_or(false)
    }

    pub fn mark_line_adjusted(&mut self, line: usize) {
        self.adjusted_lines.insert(line);
    }

    pub fn is_line_adjusted(&self, line: usize) -> bool {
        self.adjusted_lines.contains(&line)
    }

    /// Cart line indices whose stock was already decremented.
    pub fn adjusted_lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.adjusted_lines.iter().copied()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert!(CommitStage::AllocatingId < CommitStage::HeaderWritten);
        assert!(CommitStage::InventoryAdjusted < CommitStage::CreditAdjusted);
        assert_eq!(CommitStage::CreditAdjusted.next(), CommitStage::Complete);
        assert_eq!(CommitStage::Complete.next(), CommitStage::Complete);
    }

    #[test]
    fn test_progress_advances_monotonically() {
        let mut progress = CommitProgress::new();
        assert_eq!(progress.attempting(), CommitStage::AllocatingId);
        assert!(!progress.has_reached(CommitStage::AllocatingId));

        progress.advance(CommitStage::AllocatingId);
        progress.advance(CommitStage::HeaderWritten);
        assert_eq!(progress.attempting(), CommitStage::ItemsWritten);

        progress.advance(CommitStage::AllocatingId);
        assert_eq!(progress.reached(), CommitStage::HeaderWritten);
    }

    #[test]
    fn test_adjusted_lines() {
        let mut progress = CommitProgress::at(CommitStage::ItemsWritten);
        progress.mark_line_adjusted(2);
        progress.mark_line_adjusted(0);
        assert!(progress.is_line_adjusted(0));
        assert!(!progress.is_line_adjusted(1));
        assert_eq!(progress.adjusted_lines().collect::<Vec<_>>(), vec![0, 2]);
    }
}
