//! Mapping token ids back to bytes and text.

use crate::error::{BpeError, Result};
use crate::model::TokenId;
use crate::vocab::Vocabulary;

/// Concatenates the vocabulary bytes for each token in order.
pub fn decode_to_bytes(vocabulary: &Vocabulary, tokens: &[TokenId]) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(tokens.len() * 2);
    for &id in tokens {
        let token = vocabulary.get(id).ok_or(BpeError::UnknownToken(id))?;
        bytes.extend_from_slice(token);
    }
    Ok(bytes)
}

/// Decodes tokens into text.
///
/// Byte runs that are not valid UTF-8 become U+FFFD rather than an error, so
/// decoding a slice that splits a multi-byte character still succeeds.
pub fn decode(vocabulary: &Vocabulary, tokens: &[TokenId]) -> Result<String> {
    let bytes = decode_to_bytes(vocabulary, tokens)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}
