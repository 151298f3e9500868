//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::TokenId;

/// Convenient result type used throughout the crate.
pub type Result<T, E = BpeError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during training, inference, or model IO.
#[derive(Debug, Error)]
pub enum BpeError {
    /// Requested vocabulary size cannot hold the byte alphabet or does not fit a [`TokenId`].
    #[error("invalid vocabulary size {requested}: must be at least 256 and fit a 32-bit token id")]
    InvalidVocabSize {
        /// Vocabulary size supplied by the caller.
        requested: usize,
    },
    /// Training configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Training was invoked on a corpus with no bytes.
    #[error("training corpus is empty")]
    EmptyCorpus,
    /// Fewer merge rules were learned than requested.
    #[error("training stopped early: learned {learned} of {requested} requested merges")]
    EarlyStop {
        /// Number of merge rules actually learned.
        learned: usize,
        /// Number of merge rules requested through the target vocabulary size.
        requested: usize,
    },
    /// Decoding encountered a token id absent from the vocabulary.
    #[error("unknown token id {0}")]
    UnknownToken(TokenId),
    /// A model is missing data or is internally inconsistent.
    #[error("malformed model: {0}")]
    MalformedModel(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for BpeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl BpeError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }

    /// Shorthand for [`BpeError::MalformedModel`].
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedModel(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_include_context() {
        let err = BpeError::EarlyStop {
            learned: 3,
            requested: 10,
        };
        assert_eq!(
            err.to_string(),
            "training stopped early: learned 3 of 10 requested merges"
        );
        let err = BpeError::InvalidVocabSize { requested: 12 };
        assert!(err.to_string().contains("invalid vocabulary size 12"));
        assert_eq!(BpeError::UnknownToken(999).to_string(), "unknown token id 999");
    }

    #[test]
    fn json_errors_convert_to_serialization() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        assert!(matches!(BpeError::from(err), BpeError::Serialization(_)));
    }
}
