//! Core training loop responsible for learning merge rules.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use log::{info, warn};

use crate::config::{TrainerBuilder, TrainerConfig};
use crate::corpus::read_corpus;
use crate::error::{BpeError, Result};
use crate::merge::merge_pair_in_place;
use crate::metrics::{IterationMetrics, StopReason, TrainingMetrics};
use crate::model::{MergeRules, TokenId, TokenizerModel, BASE_VOCAB_SIZE};
use crate::pairs::{count_pairs, most_frequent, par_count_pairs, PairCounts};

/// High-level façade configuring and executing BPE training runs.
#[derive(Debug, Clone)]
pub struct Trainer {
    cfg: TrainerConfig,
}

/// Artifacts returned after a training session completes.
#[must_use]
#[derive(Debug, Clone)]
pub struct TrainerArtifacts {
    /// Trained tokenizer model.
    pub model: TokenizerModel,
    /// Detailed metrics captured during training.
    pub metrics: TrainingMetrics,
}

impl TrainerArtifacts {
    /// Number of merge rules actually learned.
    #[must_use]
    pub fn learned_merges(&self) -> usize {
        self.model.merges().len()
    }

    /// Number of merge rules the target vocabulary size asked for.
    #[must_use]
    pub fn requested_merges(&self) -> usize {
        self.metrics.requested_merges
    }

    /// Returns `true` when every requested merge was learned.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.learned_merges() == self.requested_merges()
    }

    /// Turns an early stop into [`BpeError::EarlyStop`] for callers that need the
    /// full vocabulary.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(BpeError::EarlyStop {
                learned: self.learned_merges(),
                requested: self.requested_merges(),
            })
        }
    }
}

impl Trainer {
    /// Creates a new trainer for the supplied configuration.
    #[must_use]
    pub fn new(cfg: TrainerConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`TrainerBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.cfg
    }

    /// Trains a model on the contents of a single file.
    pub fn train_from_path<P: AsRef<Path>>(&self, path: P) -> Result<TrainerArtifacts> {
        let corpus = read_corpus(path)?;
        self.train(&corpus)
    }

    /// Trains a model on UTF-8 text.
    pub fn train_from_text(&self, text: &str) -> Result<TrainerArtifacts> {
        self.train(text.as_bytes())
    }

    /// Trains a model on a raw byte corpus.
    ///
    /// Each iteration recounts every adjacent pair, merges the most frequent one
    /// (ties to the smallest pair) into the next id, and rewrites the stream. If the
    /// stream runs out of pairs first, fewer rules than requested are returned and
    /// the stop reason is recorded in the metrics.
    pub fn train(&self, corpus: &[u8]) -> Result<TrainerArtifacts> {
        self.cfg.validate()?;
        if corpus.is_empty() {
            return Err(BpeError::EmptyCorpus);
        }

        let requested = self.cfg.requested_merges();
        let mut tokens: Vec<TokenId> = corpus.iter().map(|&b| TokenId::from(b)).collect();
        let mut merges = MergeRules::new();
        let mut metrics = TrainingMetrics::new(requested);
        let training_start = Instant::now();

        while merges.len() < requested {
            let iteration_start = Instant::now();
            let pair_counts = self.count(&tokens);

            let Some((best_pair, frequency)) = most_frequent(&pair_counts) else {
                metrics.stop_reason = StopReason::NoPairsRemaining;
                break;
            };
            if frequency < self.cfg.min_frequency {
                metrics.stop_reason = StopReason::BelowMinFrequency;
                break;
            }

            let new_token_id = merges.push(best_pair)?;
            let merges_applied = merge_pair_in_place(&mut tokens, best_pair, new_token_id);
            let iteration = merges.len();

            if self.cfg.show_progress {
                info!(
                    "iter {:>6} merge ({}, {}) -> {} freq {:>8} merges {:>8} distinct_pairs {:>8} tokens {:>10}",
                    iteration,
                    best_pair.0,
                    best_pair.1,
                    new_token_id,
                    frequency,
                    merges_applied,
                    pair_counts.len(),
                    tokens.len()
                );
            }

            metrics.iterations.push(IterationMetrics {
                iteration,
                best_frequency: frequency,
                merges_applied,
                distinct_pairs: pair_counts.len(),
                sequence_len: tokens.len(),
                elapsed_iteration: iteration_start.elapsed(),
                elapsed_total: training_start.elapsed(),
            });
        }

        if merges.len() == requested {
            metrics.stop_reason = StopReason::TargetVocabReached;
        } else {
            warn!(
                "training stopped early ({:?}): learned {} of {} requested merges",
                metrics.stop_reason,
                merges.len(),
                requested
            );
        }
        metrics.total_duration = training_start.elapsed();

        let model = TokenizerModel::from_merges(merges)?;
        if self.cfg.show_progress {
            info!(
                "completed {} merges in {:.2?}; vocab size {}",
                model.merges().len(),
                metrics.total_duration,
                model.vocab_size()
            );
        }
        debug_assert_eq!(model.vocab_size(), BASE_VOCAB_SIZE + model.merges().len());

        Ok(TrainerArtifacts { model, metrics })
    }

    fn count(&self, tokens: &[TokenId]) -> PairCounts {
        if tokens.len() >= self.cfg.parallel_threshold {
            par_count_pairs(tokens)
        } else {
            count_pairs(tokens)
        }
    }
}

impl fmt::Display for TrainerArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BPE model with vocab size {}", self.model.vocab_size())?;
        writeln!(
            f,
            "Merges learned: {} of {}",
            self.learned_merges(),
            self.requested_merges()
        )?;
        writeln!(f, "Stop reason: {:?}", self.metrics.stop_reason)?;
        writeln!(f, "Total duration: {:?}", self.metrics.total_duration)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn trainer(vocab_size: usize) -> Trainer {
        let cfg = TrainerConfig::builder()
            .target_vocab_size(vocab_size)
            .show_progress(false)
            .build()
            .unwrap();
        Trainer::new(cfg)
    }

    #[test]
    fn learns_most_frequent_pair_first() {
        let artefacts = trainer(257).train_from_text("aaab").unwrap();
        let rules: Vec<_> = artefacts.model.merges().iter().collect();
        assert_eq!(rules, vec![((97, 97), 256)]);
        assert_eq!(artefacts.metrics.iterations[0].sequence_len, 3);
        assert_eq!(artefacts.metrics.iterations[0].best_frequency, 2);
        assert_eq!(artefacts.metrics.iterations[0].merges_applied, 1);
        assert!(artefacts.is_complete());
        assert_eq!(artefacts.metrics.stop_reason, StopReason::TargetVocabReached);
    }

    #[test]
    fn continues_until_stream_collapses() {
        // [256, 97, 98] -> ties at 1: (97, 98) < (256, 97) -> [256, 257] -> [258].
        let artefacts = trainer(300).train_from_text("aaab").unwrap();
        let rules: Vec<_> = artefacts.model.merges().iter().collect();
        assert_eq!(
            rules,
            vec![((97, 97), 256), ((97, 98), 257), ((256, 257), 258)]
        );
        assert_eq!(artefacts.metrics.stop_reason, StopReason::NoPairsRemaining);
        assert!(!artefacts.is_complete());
        assert_eq!(artefacts.requested_merges(), 44);
        assert!(matches!(
            artefacts.ensure_complete(),
            Err(BpeError::EarlyStop {
                learned: 3,
                requested: 44
            })
        ));
        assert_eq!(artefacts.model.vocabulary().get(258), Some(&b"aaab"[..]));
    }

    #[test]
    fn base_vocab_size_learns_nothing() {
        let artefacts = trainer(256).train_from_text("hello world").unwrap();
        assert!(artefacts.model.merges().is_empty());
        assert_eq!(artefacts.model.vocab_size(), 256);
        assert!(artefacts.is_complete());
        assert!(artefacts.metrics.iterations.is_empty());
    }

    #[test]
    fn single_byte_corpus_stops_immediately() {
        let artefacts = trainer(260).train(b"x").unwrap();
        assert_eq!(artefacts.learned_merges(), 0);
        assert_eq!(artefacts.metrics.stop_reason, StopReason::NoPairsRemaining);
    }

    #[test]
    fn empty_corpus_is_rejected() {
        let err = trainer(260).train(b"").expect_err("empty corpus");
        assert!(matches!(err, BpeError::EmptyCorpus));
    }

    #[test]
    fn invalid_vocab_size_is_rejected_before_training() {
        let cfg = TrainerConfig {
            target_vocab_size: 100,
            ..TrainerConfig::default()
        };
        let err = Trainer::new(cfg).train(b"abc").expect_err("too small");
        assert!(matches!(err, BpeError::InvalidVocabSize { requested: 100 }));
    }

    #[test]
    fn min_frequency_stops_on_rare_pairs() {
        let cfg = TrainerConfig::builder()
            .target_vocab_size(300)
            .min_frequency(2)
            .show_progress(false)
            .build()
            .unwrap();
        let artefacts = Trainer::new(cfg).train_from_text("abababcd").unwrap();
        assert_eq!(artefacts.metrics.stop_reason, StopReason::BelowMinFrequency);
        assert!(artefacts
            .metrics
            .iterations
            .iter()
            .all(|it| it.best_frequency >= 2));
        assert_eq!(artefacts.model.merges().get(&(97, 98)), Some(256));
    }

    #[test]
    fn parallel_counting_gives_identical_rules() {
        let corpus: Vec<u8> = (0..20_000u32)
            .map(|i| b"the quick brown fox "[(i as usize * 3) % 20])
            .collect();
        let sequential = trainer(320).train(&corpus).unwrap();
        let cfg = TrainerConfig::builder()
            .target_vocab_size(320)
            .parallel_threshold(2)
            .show_progress(false)
            .build()
            .unwrap();
        let parallel = Trainer::new(cfg).train(&corpus).unwrap();
        assert_eq!(sequential.model, parallel.model);
    }

    #[test]
    fn train_from_path_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        fs::write(&path, "low lower lowest").unwrap();
        let artefacts = trainer(260).train_from_path(&path).unwrap();
        assert_eq!(artefacts.learned_merges(), 4);
        let tokens = artefacts.model.encode("lowest");
        assert!(tokens.len() < 6);
        assert_eq!(artefacts.model.decode(&tokens).unwrap(), "lowest");
    }
}
