//! Byte-level byte pair encoding (BPE) tokenizer library and CLI.
//!
//! The crate learns an ordered table of merge rules from a raw byte corpus and
//! uses it to map text to token ids and back. Ids `0..256` are the raw bytes;
//! each learned rule adds one id that stands for the concatenation of two
//! earlier tokens. Encoding replays the rules in learn order, and decoding
//! concatenates token bytes, substituting U+FFFD for invalid UTF-8.
//!
//! ```no_run
//! use bytepair::{Trainer, TrainerConfig};
//!
//! # fn main() -> bytepair::Result<()> {
//! let cfg = TrainerConfig::builder()
//!     .target_vocab_size(512)
//!     .show_progress(false)
//!     .build()?;
//! let artifacts = Trainer::new(cfg).train_from_path("train.txt")?;
//! let model = artifacts.model;
//! let ids = model.encode("hello world");
//! assert_eq!(model.decode(&ids)?, "hello world");
//! bytepair::serialization::save_model(&model, "tokenizer_model.json", false)?;
//! # Ok(())
//! # }
//! ```
//!
//! The `bytepair` CLI is enabled by default through the `cli` feature. Library
//! users can opt out with `default-features = false`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown
)]

pub mod bytes;
pub mod config;
pub mod corpus;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod model;
pub mod pairs;
pub mod serialization;
pub mod trainer;
pub mod vocab;

pub use config::{TrainerBuilder, TrainerConfig};
pub use error::{BpeError, Result};
pub use metrics::{IterationMetrics, StopReason, TrainingMetrics};
pub use model::{MergeRules, Pair, TokenId, TokenizerModel, BASE_VOCAB_SIZE};
pub use trainer::{Trainer, TrainerArtifacts};
pub use vocab::Vocabulary;
