//! Configuration builder controlling training.

use serde::{Deserialize, Serialize};

use crate::error::{BpeError, Result};
use crate::model::{TokenId, BASE_VOCAB_SIZE};

/// Configuration for byte-level BPE training.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainerConfig {
    /// Target vocabulary size including the 256 base byte tokens.
    pub target_vocab_size: usize,
    /// Minimum count the best pair must reach for training to continue.
    pub min_frequency: usize,
    /// Enables per-iteration logging through the `log` facade.
    pub show_progress: bool,
    /// Token streams at least this long are pair-counted on the rayon pool.
    pub parallel_threshold: usize,
}

impl TrainerConfig {
    /// Returns a builder initialised with [`TrainerConfig::default`].
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    /// Number of merge rules implied by the target vocabulary size.
    #[must_use]
    pub fn requested_merges(&self) -> usize {
        self.target_vocab_size.saturating_sub(BASE_VOCAB_SIZE)
    }

    /// Validates the invariants required for training.
    pub fn validate(&self) -> Result<()> {
        let max_vocab = usize::try_from(TokenId::MAX).unwrap_or(usize::MAX);
        if self.target_vocab_size < BASE_VOCAB_SIZE || self.target_vocab_size > max_vocab {
            return Err(BpeError::InvalidVocabSize {
                requested: self.target_vocab_size,
            });
        }
        if self.min_frequency == 0 {
            return Err(BpeError::InvalidConfig(
                "min_frequency must be greater than zero".into(),
            ));
        }
        if self.parallel_threshold < 2 {
            return Err(BpeError::InvalidConfig(
                "parallel_threshold must be at least 2".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            target_vocab_size: 300,
            min_frequency: 1,
            show_progress: true,
            parallel_threshold: 1 << 16,
        }
    }
}

/// Builder for [`TrainerConfig`].
#[derive(Debug, Default, Clone)]
pub struct TrainerBuilder {
    cfg: TrainerConfig,
}

impl TrainerBuilder {
    /// Creates a builder with [`TrainerConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the desired vocabulary size (including base byte tokens).
    #[must_use]
    pub fn target_vocab_size(mut self, value: usize) -> Self {
        self.cfg.target_vocab_size = value;
        self
    }

    /// Sets the minimum merge frequency.
    #[must_use]
    pub fn min_frequency(mut self, value: usize) -> Self {
        self.cfg.min_frequency = value;
        self
    }

    /// Enables or disables per-iteration logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Sets the stream length from which pair counting runs in parallel.
    #[must_use]
    pub fn parallel_threshold(mut self, value: usize) -> Self {
        self.cfg.parallel_threshold = value;
        self
    }

    /// Finalises the builder, returning a validated [`TrainerConfig`].
    pub fn build(self) -> Result<TrainerConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = TrainerConfig::default();
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg.requested_merges(), 44);
    }

    #[test]
    fn rejects_vocab_smaller_than_byte_alphabet() {
        let err = TrainerConfig::builder()
            .target_vocab_size(255)
            .build()
            .expect_err("255 is too small");
        assert!(matches!(err, BpeError::InvalidVocabSize { requested: 255 }));
    }

    #[test]
    fn accepts_exactly_byte_alphabet() {
        let cfg = TrainerConfig::builder()
            .target_vocab_size(256)
            .build()
            .expect("256 is allowed");
        assert_eq!(cfg.requested_merges(), 0);
    }

    #[test]
    fn rejects_zero_min_frequency() {
        let cfg = TrainerConfig {
            min_frequency: 0,
            ..TrainerConfig::default()
        };
        let err = cfg.validate().expect_err("validation should fail");
        assert!(matches!(
            err,
            BpeError::InvalidConfig(message) if message.contains("min_frequency")
        ));
    }
}
