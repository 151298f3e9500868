//! Model types and helpers for working with trained BPE tokenizers.

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::decoder;
use crate::encoder;
use crate::error::{BpeError, Result};
use crate::vocab::Vocabulary;

/// Token identifier used throughout the crate.
pub type TokenId = u32;
/// Merge pair encoded as `(left, right)` token identifiers.
pub type Pair = (TokenId, TokenId);

/// Number of tokens reserved for raw byte values; merged tokens start at this id.
pub const BASE_VOCAB_SIZE: usize = 256;

/// Ordered merge table mapping each learned pair to the token id it produces.
///
/// Rule `i` always produces token `256 + i`, so insertion order doubles as merge
/// priority: a lower id was learned earlier and wins during encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeRules {
    pairs: Vec<Pair>,
    ids: FxHashMap<Pair, TokenId>,
}

impl MergeRules {
    /// Creates an empty merge table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a merge table from pairs listed in learn order, validating that each
    /// pair only references ids defined before it and appears once.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = Pair>,
    {
        let mut rules = Self::new();
        for pair in pairs {
            rules.push(pair)?;
        }
        Ok(rules)
    }

    /// Appends a rule and returns the id assigned to it.
    pub fn push(&mut self, pair: Pair) -> Result<TokenId> {
        let next = self.next_id()?;
        let (left, right) = pair;
        if left >= next || right >= next {
            return Err(BpeError::malformed(format!(
                "rule {next} references ({left}, {right}) before it is defined"
            )));
        }
        if self.ids.contains_key(&pair) {
            return Err(BpeError::malformed(format!(
                "pair ({left}, {right}) is merged more than once"
            )));
        }
        self.pairs.push(pair);
        self.ids.insert(pair, next);
        Ok(next)
    }

    /// Returns the token id produced by merging `pair`, if a rule exists.
    #[inline]
    #[must_use]
    pub fn get(&self, pair: &Pair) -> Option<TokenId> {
        self.ids.get(pair).copied()
    }

    /// Returns the pair merged into `id`, if `id` is a merged token.
    #[must_use]
    pub fn pair_for(&self, id: TokenId) -> Option<Pair> {
        (id as usize)
            .checked_sub(BASE_VOCAB_SIZE)
            .and_then(|idx| self.pairs.get(idx).copied())
    }

    /// Iterates `(pair, id)` entries in learn order.
    pub fn iter(
        &self,
    ) -> impl DoubleEndedIterator<Item = (Pair, TokenId)> + ExactSizeIterator + '_ {
        self.pairs
            .iter()
            .enumerate()
            .map(|(idx, &pair)| (pair, (BASE_VOCAB_SIZE + idx) as TokenId))
    }

    /// Returns the merged pairs in learn order.
    #[must_use]
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Number of learned rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` when no rule has been learned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Id the next pushed rule will receive.
    fn next_id(&self) -> Result<TokenId> {
        TokenId::try_from(BASE_VOCAB_SIZE + self.pairs.len())
            .map_err(|_| BpeError::malformed("vocabulary size exceeded u32::MAX"))
    }
}

/// Trained tokenizer: the merge table plus the vocabulary resolved from it.
///
/// The model is immutable once built; encoders and decoders borrow it, so one
/// instance can be shared across threads.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerModel {
    merges: MergeRules,
    vocabulary: Vocabulary,
}

impl TokenizerModel {
    /// Builds a model from a merge table, resolving its vocabulary.
    pub fn from_merges(merges: MergeRules) -> Result<Self> {
        let vocabulary = Vocabulary::from_merges(&merges)?;
        Ok(Self { merges, vocabulary })
    }

    /// Assembles a model from separately loaded parts, rejecting any vocabulary that
    /// does not match the one implied by the merge table.
    pub fn from_parts(merges: MergeRules, vocabulary: Vocabulary) -> Result<Self> {
        let expected = Vocabulary::from_merges(&merges)?;
        if vocabulary.len() != expected.len() {
            return Err(BpeError::malformed(format!(
                "vocabulary has {} entries but merge table implies {}",
                vocabulary.len(),
                expected.len()
            )));
        }
        for ((id, want), (_, got)) in expected.iter().zip(vocabulary.iter()) {
            if want != got {
                return Err(BpeError::malformed(format!(
                    "vocabulary entry {id} does not match its merge rule"
                )));
            }
        }
        Ok(Self { merges, vocabulary })
    }

    /// Model containing only the 256 byte tokens.
    pub fn byte_level() -> Self {
        Self {
            merges: MergeRules::new(),
            vocabulary: Vocabulary::base(),
        }
    }

    /// Returns the merge table.
    #[must_use]
    pub fn merges(&self) -> &MergeRules {
        &self.merges
    }

    /// Returns the resolved vocabulary.
    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Total number of tokens: 256 byte tokens plus one per merge rule.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Encodes UTF-8 text into token ids.
    #[must_use]
    pub fn encode(&self, text: &str) -> Vec<TokenId> {
        encoder::encode_bytes(&self.merges, text.as_bytes())
    }

    /// Encodes raw bytes into token ids.
    #[must_use]
    pub fn encode_bytes(&self, data: &[u8]) -> Vec<TokenId> {
        encoder::encode_bytes(&self.merges, data)
    }

    /// Encodes independent inputs in parallel against this model.
    #[must_use]
    pub fn encode_batch<S>(&self, inputs: &[S]) -> Vec<Vec<TokenId>>
    where
        S: AsRef<[u8]> + Sync,
    {
        inputs
            .par_iter()
            .map(|data| self.encode_bytes(data.as_ref()))
            .collect()
    }

    /// Decodes token ids into text, substituting U+FFFD for invalid UTF-8.
    pub fn decode(&self, tokens: &[TokenId]) -> Result<String> {
        decoder::decode(&self.vocabulary, tokens)
    }

    /// Decodes token ids back into raw bytes.
    pub fn decode_to_bytes(&self, tokens: &[TokenId]) -> Result<Vec<u8>> {
        decoder::decode_to_bytes(&self.vocabulary, tokens)
    }
}
