//! Applying learned merge rules to new input.

use crate::merge::merge_pair_in_place;
use crate::model::{MergeRules, Pair, TokenId};

/// Encodes `data` by repeatedly merging the present pair with the lowest rule id.
///
/// Selection is by learn order, not by how often a pair occurs in `data`, so any
/// substring seen during training is merged in the same order the trainer used.
/// Stops when one token remains or no adjacent pair has a rule.
#[must_use]
pub fn encode_bytes(merges: &MergeRules, data: &[u8]) -> Vec<TokenId> {
    let mut tokens: Vec<TokenId> = data.iter().map(|&b| TokenId::from(b)).collect();
    if merges.is_empty() {
        return tokens;
    }
    while tokens.len() > 1 {
        let Some((pair, id)) = highest_priority_pair(merges, &tokens) else {
            break;
        };
        merge_pair_in_place(&mut tokens, pair, id);
    }
    tokens
}

/// Finds the adjacent pair in `tokens` whose merge rule was learned first.
fn highest_priority_pair(merges: &MergeRules, tokens: &[TokenId]) -> Option<(Pair, TokenId)> {
    tokens
        .windows(2)
        .filter_map(|window| {
            let pair = (window[0], window[1]);
            merges.get(&pair).map(|id| (pair, id))
        })
        .min_by_key(|&(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rules_yields_raw_bytes() {
        assert_eq!(encode_bytes(&MergeRules::new(), b"hey"), vec![104, 101, 121]);
        assert!(encode_bytes(&MergeRules::new(), b"").is_empty());
    }

    #[test]
    fn earliest_rule_wins_over_local_frequency() {
        // (98, 99) learned first; (97, 98) occurs more often in the input but must wait.
        let rules = MergeRules::from_pairs([(98, 99), (97, 98)]).unwrap();
        let tokens = encode_bytes(&rules, b"ababc");
        // "bc" -> 256 first, then "ab" -> 257 on what is left.
        assert_eq!(tokens, vec![257, 97, 256]);
    }

    #[test]
    fn applies_rules_until_fixed_point() {
        let rules = MergeRules::from_pairs([(97, 97), (256, 256), (257, 257)]).unwrap();
        assert_eq!(encode_bytes(&rules, b"aaaaaaaa"), vec![258]);
        assert_eq!(encode_bytes(&rules, b"aaaaa"), vec![257, 97]);
    }

    #[test]
    fn reencoding_is_idempotent() {
        let rules = MergeRules::from_pairs([(104, 101), (256, 108)]).unwrap();
        let once = encode_bytes(&rules, b"hello hello");
        assert_eq!(highest_priority_pair(&rules, &once), None);
        let mut again = once.clone();
        while let Some((pair, id)) = highest_priority_pair(&rules, &again) {
            merge_pair_in_place(&mut again, pair, id);
        }
        assert_eq!(again, once);
    }
}
