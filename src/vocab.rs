//! Resolution of merge rules into concrete token byte sequences.

use crate::error::{BpeError, Result};
use crate::model::{MergeRules, TokenId, BASE_VOCAB_SIZE};

/// Mapping from every token id to the bytes it stands for.
///
/// Ids `0..256` are the raw bytes; each merged id holds the concatenation of its
/// two operands, fully resolved down to bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    token_bytes: Vec<Vec<u8>>,
}

impl Vocabulary {
    /// Vocabulary containing only the 256 single-byte tokens.
    #[must_use]
    pub fn base() -> Self {
        Self {
            token_bytes: (0u8..=u8::MAX).map(|b| vec![b]).collect(),
        }
    }

    /// Expands `merges` in learn order into a full vocabulary.
    ///
    /// Fails with [`BpeError::MalformedModel`] if a rule does not produce the next
    /// sequential id or references an id that has not been resolved yet.
    pub fn from_merges(merges: &MergeRules) -> Result<Self> {
        let mut vocab = Self::base();
        vocab.token_bytes.reserve(merges.len());
        for ((left, right), id) in merges.iter() {
            if id as usize != vocab.token_bytes.len() {
                return Err(BpeError::malformed(format!(
                    "merge rule id {id} is out of sequence (expected {})",
                    vocab.token_bytes.len()
                )));
            }
            let (Some(left_bytes), Some(right_bytes)) = (vocab.get(left), vocab.get(right))
            else {
                return Err(BpeError::malformed(format!(
                    "merge rule {id} references unresolved token ({left}, {right})"
                )));
            };
            let mut combined = Vec::with_capacity(left_bytes.len() + right_bytes.len());
            combined.extend_from_slice(left_bytes);
            combined.extend_from_slice(right_bytes);
            vocab.token_bytes.push(combined);
        }
        Ok(vocab)
    }

    /// Builds a vocabulary from raw entries indexed by token id.
    ///
    /// Only the shape is checked here; [`crate::TokenizerModel::from_parts`] checks
    /// the entries against a merge table.
    pub fn from_entries(token_bytes: Vec<Vec<u8>>) -> Result<Self> {
        if token_bytes.len() < BASE_VOCAB_SIZE {
            return Err(BpeError::malformed(format!(
                "vocabulary has {} entries, fewer than the {BASE_VOCAB_SIZE} byte tokens",
                token_bytes.len()
            )));
        }
        Ok(Self { token_bytes })
    }

    /// Returns the bytes for `id`, or `None` if the id is not in the vocabulary.
    #[inline]
    #[must_use]
    pub fn get(&self, id: TokenId) -> Option<&[u8]> {
        self.token_bytes.get(id as usize).map(Vec::as_slice)
    }

    /// Iterates `(id, bytes)` entries in id order.
    pub fn iter(
        &self,
    ) -> impl DoubleEndedIterator<Item = (TokenId, &[u8])> + ExactSizeIterator + '_ {
        self.token_bytes
            .iter()
            .enumerate()
            .map(|(idx, bytes)| (idx as TokenId, bytes.as_slice()))
    }

    /// Number of tokens in the vocabulary.
    #[must_use]
    pub fn len(&self) -> usize {
        self.token_bytes.len()
    }

    /// Always `false` for a well-formed vocabulary.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token_bytes.is_empty()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::base()
    }
}
