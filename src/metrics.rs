//! Metrics describing the evolution of the training process.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reason a training run terminated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// The configured target vocabulary size was reached.
    TargetVocabReached,
    /// The sequence collapsed to fewer than two tokens, so no pair remains.
    NoPairsRemaining,
    /// The most frequent pair fell below the configured minimum frequency.
    BelowMinFrequency,
}

/// Metrics captured for each merge iteration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationMetrics {
    /// Sequential iteration number (1-indexed).
    pub iteration: usize,
    /// Frequency of the pair merged in this iteration.
    pub best_frequency: usize,
    /// Number of occurrences replaced in the token stream.
    pub merges_applied: usize,
    /// Count of distinct pairs observed before the merge.
    pub distinct_pairs: usize,
    /// Length of the token stream after the merge.
    pub sequence_len: usize,
    /// Execution time for the iteration.
    pub elapsed_iteration: Duration,
    /// Total time elapsed since training started.
    pub elapsed_total: Duration,
}

/// Aggregate metrics produced by a training session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingMetrics {
    /// Per-iteration snapshots accrued during training.
    pub iterations: Vec<IterationMetrics>,
    /// Merges implied by the target vocabulary size.
    pub requested_merges: usize,
    /// Total duration of the training session.
    pub total_duration: Duration,
    /// Reason training terminated.
    pub stop_reason: StopReason,
}

impl TrainingMetrics {
    /// Creates an empty metrics container for a run targeting `requested_merges`.
    #[must_use]
    pub fn new(requested_merges: usize) -> Self {
        Self {
            iterations: Vec::with_capacity(requested_merges.min(16_384)),
            requested_merges,
            total_duration: Duration::ZERO,
            stop_reason: StopReason::TargetVocabReached,
        }
    }

    /// Compression ratio of the final stream relative to the corpus length.
    #[must_use]
    pub fn compression_ratio(&self, corpus_len: usize) -> f64 {
        match self.iterations.last() {
            Some(last) if last.sequence_len > 0 => corpus_len as f64 / last.sequence_len as f64,
            _ => 1.0,
        }
    }
}
