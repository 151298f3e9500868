//! Helpers for persisting and loading tokenizer models.

pub mod json;

pub use json::{
    from_json, load_model, save_model, to_json, validate_model_path, MODEL_EXTENSION,
};
