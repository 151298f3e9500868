//! Replacement of a single pair throughout a token sequence.

use crate::model::{Pair, TokenId};

/// Returns a copy of `tokens` with every occurrence of `pair` replaced by `new_token`.
///
/// Matches are taken greedily from the left and never overlap: in `a a a` merging
/// `(a, a)` yields `new a`, not `a new`.
#[must_use]
pub fn merge_pair(tokens: &[TokenId], pair: Pair, new_token: TokenId) -> Vec<TokenId> {
    let mut merged = Vec::with_capacity(tokens.len());
    let mut idx = 0usize;
    while idx < tokens.len() {
        if idx + 1 < tokens.len() && tokens[idx] == pair.0 && tokens[idx + 1] == pair.1 {
            merged.push(new_token);
            idx += 2;
        } else {
            merged.push(tokens[idx]);
            idx += 1;
        }
    }
    merged
}

/// In-place form of [`merge_pair`], compacting `tokens` and returning the number of
/// occurrences replaced.
pub fn merge_pair_in_place(tokens: &mut Vec<TokenId>, pair: Pair, new_token: TokenId) -> usize {
    let original_len = tokens.len();
    let mut read = 0usize;
    let mut write = 0usize;
    let mut merges = 0usize;

    while read < original_len {
        if read + 1 < original_len && tokens[read] == pair.0 && tokens[read + 1] == pair.1 {
            tokens[write] = new_token;
            read += 2;
            merges += 1;
        } else {
            if write != read {
                tokens[write] = tokens[read];
            }
            read += 1;
        }
        write += 1;
    }

    tokens.truncate(write);
    merges
}
