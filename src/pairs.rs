//! Adjacent pair frequency counting.

use std::cmp::Ordering;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::model::{Pair, TokenId};

/// Occurrence count for each adjacent pair in a token sequence.
pub type PairCounts = FxHashMap<Pair, usize>;

/// Counts every adjacent `(seq[i], seq[i + 1])` pair in `tokens`.
///
/// Sequences shorter than two tokens yield an empty table.
#[must_use]
pub fn count_pairs(tokens: &[TokenId]) -> PairCounts {
    let mut counts = PairCounts::default();
    for window in tokens.windows(2) {
        *counts.entry((window[0], window[1])).or_insert(0) += 1;
    }
    counts
}

/// Parallel variant of [`count_pairs`].
///
/// Windows are split across the rayon pool and the partial tables summed, so the
/// result is identical to the sequential scan.
#[must_use]
pub fn par_count_pairs(tokens: &[TokenId]) -> PairCounts {
    tokens
        .par_windows(2)
        .fold(PairCounts::default, |mut local, window| {
            *local.entry((window[0], window[1])).or_insert(0) += 1;
            local
        })
        .reduce(PairCounts::default, |acc, local| {
            if acc.len() < local.len() {
                return merge_counts(local, acc);
            }
            merge_counts(acc, local)
        })
}

fn merge_counts(mut into: PairCounts, from: PairCounts) -> PairCounts {
    for (pair, count) in from {
        *into.entry(pair).or_insert(0) += count;
    }
    into
}

/// Candidate pair ranked by frequency, ties going to the smallest pair.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct PairScore {
    pub(crate) frequency: usize,
    pub(crate) pair: Pair,
}

impl PairScore {
    pub(crate) fn new(pair: Pair, frequency: usize) -> Self {
        Self { frequency, pair }
    }
}

impl Ord for PairScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frequency
            .cmp(&other.frequency)
            .then_with(|| other.pair.cmp(&self.pair))
    }
}

impl PartialOrd for PairScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Selects the most frequent pair; among equal counts the lexicographically
/// smallest `(left, right)` wins. Independent of the table's iteration order.
#[must_use]
pub fn most_frequent(counts: &PairCounts) -> Option<(Pair, usize)> {
    counts
        .iter()
        .map(|(&pair, &count)| PairScore::new(pair, count))
        .max()
        .map(|score| (score.pair, score.frequency))
}
