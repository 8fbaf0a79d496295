//! Progress tracking for ledger synchronization.
//!
//! This module provides the `SyncProgressTracker`, which records persisted block indices, counts
//! transactions, outputs, settlement edges and skipped spend references, and reports gaps in the
//! processed index range. Its `SyncStats` snapshot is the report returned by a sync run.

use crate::sync::resolver::{ResolutionOutcome, SkipReason};

use itertools::Itertools;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

/// Service for tracking synchronization progress
#[derive(Debug, Clone)]
pub struct SyncProgressTracker {
    /// Index the run resumed from
    start_index: u64,
    /// The highest block index persisted
    highest_processed_index: u64,
    /// All block indices persisted in this run
    processed_indices: HashSet<u64>,
    transactions_persisted: usize,
    outputs_persisted: usize,
    settlements_matched: usize,
    /// Skipped spend references per reason
    settlements_skipped: BTreeMap<SkipReason, usize>,
    /// Failed fetches per block index
    retries_per_index: BTreeMap<u64, usize>,
    /// Last index at which we logged progress
    last_logged_index: u64,
    /// Log every N blocks
    log_interval: u64,
}

impl SyncProgressTracker {
    /// Create a new progress tracker for a run resuming after `start_index`.
    pub fn new(start_index: u64, log_interval: u64) -> Self {
        Self {
            start_index,
            highest_processed_index: start_index,
            processed_indices: HashSet::new(),
            transactions_persisted: 0,
            outputs_persisted: 0,
            settlements_matched: 0,
            settlements_skipped: BTreeMap::new(),
            retries_per_index: BTreeMap::new(),
            last_logged_index: start_index,
            log_interval: log_interval.max(1),
        }
    }

    /// Record a fully persisted block
    pub fn record_block(&mut self, index: u64, transactions: usize, outputs: usize) {
        self.highest_processed_index = self.highest_processed_index.max(index);
        self.processed_indices.insert(index);
        self.transactions_persisted += transactions;
        self.outputs_persisted += outputs;
    }

    /// Record the outcome of resolving one spend reference
    pub fn record_resolution(&mut self, outcome: &ResolutionOutcome) {
        match outcome {
            ResolutionOutcome::Matched { .. } => self.settlements_matched += 1,
            ResolutionOutcome::Skipped(reason) => {
                *self.settlements_skipped.entry(*reason).or_default() += 1;
            }
        }
    }

    /// Record a failed fetch that will be retried
    pub fn record_retry(&mut self, index: u64) {
        *self.retries_per_index.entry(index).or_default() += 1;
    }

    /// Check for gaps in processed indices
    ///
    /// Returns a list of (start, end) pairs bracketing missing index ranges.
    pub fn check_for_gaps(&self) -> Vec<(u64, u64)> {
        self.processed_indices
            .iter()
            .copied()
            .chain(
                // The resume point counts as processed when this run persisted anything
                (!self.processed_indices.is_empty() && self.start_index > 0)
                    .then_some(self.start_index),
            )
            .sorted()
            .dedup()
            .tuple_windows()
            .filter(|(a, b)| b - a > 1)
            .collect()
    }

    /// Log progress at regular intervals or when forced
    pub fn log_progress(&mut self, force: bool) {
        let blocks_since_last_log = self
            .highest_processed_index
            .saturating_sub(self.last_logged_index);
        let should_log = force || blocks_since_last_log >= self.log_interval;

        if should_log && !self.processed_indices.is_empty() {
            info!(
                "Sync progress: block {}, {} transactions, {} outputs, {} settlements ({} skipped)",
                self.highest_processed_index,
                self.transactions_persisted,
                self.outputs_persisted,
                self.settlements_matched,
                self.settlements_skipped.values().sum::<usize>()
            );
            self.last_logged_index = self.highest_processed_index;
        }
    }

    /// Get sync statistics as a SyncStats struct
    pub fn get_stats(&self) -> SyncStats {
        SyncStats {
            start_index: self.start_index,
            highest_processed_index: self.highest_processed_index,
            blocks_persisted: self.processed_indices.len() as u64,
            transactions_persisted: self.transactions_persisted,
            outputs_persisted: self.outputs_persisted,
            settlements_matched: self.settlements_matched,
            settlements_skipped: self.settlements_skipped.clone(),
            fetch_retries: self.retries_per_index.values().sum(),
            retries_per_index: self.retries_per_index.clone(),
            gaps: self.check_for_gaps(),
        }
    }

    /// Warn about every gap found in the processed range
    pub fn validate_completion(&self) {
        for (start, end) in self.check_for_gaps() {
            warn!(
                "Gap detected: missing block indices between {} and {}",
                start, end
            );
        }
    }
}

/// Statistics about a sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStats {
    pub start_index: u64,
    pub highest_processed_index: u64,
    pub blocks_persisted: u64,
    pub transactions_persisted: usize,
    pub outputs_persisted: usize,
    pub settlements_matched: usize,
    pub settlements_skipped: BTreeMap<SkipReason, usize>,
    pub fetch_retries: usize,
    pub retries_per_index: BTreeMap<u64, usize>,
    pub gaps: Vec<(u64, u64)>,
}

impl SyncStats {
    /// Total spend references that produced no settlement edge
    pub fn skipped_total(&self) -> usize {
        self.settlements_skipped.values().sum()
    }

    /// Get a human-readable summary of the sync statistics
    pub fn summary(&self) -> String {
        format!(
            "Sync from {} to {}: {} blocks, {} transactions, {} outputs, {} settlements, {} skipped references, {} fetch retries{}",
            self.start_index,
            self.highest_processed_index,
            self.blocks_persisted,
            self.transactions_persisted,
            self.outputs_persisted,
            self.settlements_matched,
            self.skipped_total(),
            self.fetch_retries,
            if self.gaps.is_empty() {
                String::new()
            } else {
                format!(" ({} gaps)", self.gaps.len())
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_summary() {
        let mut tracker = SyncProgressTracker::new(4, 100);
        tracker.record_block(5, 3, 7);
        tracker.record_block(6, 1, 1);
        tracker.record_resolution(&ResolutionOutcome::Skipped(SkipReason::TransactionNotFound));
        tracker.record_resolution(&ResolutionOutcome::Skipped(SkipReason::TransactionNotFound));
        tracker.record_resolution(&ResolutionOutcome::Skipped(SkipReason::AlreadySettled));
        tracker.record_retry(6);
        tracker.record_retry(6);
        tracker.record_retry(7);

        let stats = tracker.get_stats();
        assert_eq!(stats.blocks_persisted, 2);
        assert_eq!(stats.highest_processed_index, 6);
        assert_eq!(stats.transactions_persisted, 4);
        assert_eq!(stats.outputs_persisted, 8);
        assert_eq!(stats.skipped_total(), 3);
        assert_eq!(
            stats.settlements_skipped.get(&SkipReason::TransactionNotFound),
            Some(&2)
        );
        assert_eq!(stats.fetch_retries, 3);
        assert_eq!(stats.retries_per_index, BTreeMap::from([(6, 2), (7, 1)]));
        assert!(stats.gaps.is_empty());
        assert!(stats.summary().starts_with("Sync from 4 to 6: 2 blocks"));
    }

    #[test]
    fn test_gap_detection() {
        let mut tracker = SyncProgressTracker::new(0, 100);
        for index in [1, 2, 5, 6, 9] {
            tracker.record_block(index, 0, 0);
        }
        assert_eq!(tracker.check_for_gaps(), vec![(2, 5), (6, 9)]);
        assert!(tracker.get_stats().summary().ends_with("(2 gaps)"));
    }

    #[test]
    fn test_gap_after_resume_point() {
        let mut tracker = SyncProgressTracker::new(10, 100);
        assert!(tracker.check_for_gaps().is_empty());
        tracker.record_block(12, 0, 0);
        assert_eq!(tracker.check_for_gaps(), vec![(10, 12)]);
    }
}
