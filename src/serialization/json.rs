//! JSON model format.
//!
//! A model file is a single object with exactly two fields:
//!
//! ```json
//! {
//!   "merging_rules": [{"left": 97, "right": 97, "id": 256}],
//!   "vocabulary": {"0": "Ā", "97": "a", "256": "aa"}
//! }
//! ```
//!
//! `merging_rules` is an array so learn order survives the round trip.
//! Vocabulary entries use the byte-level alphabet from [`crate::bytes`].

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::bytes::{bytes_to_string, string_to_bytes};
use crate::error::{BpeError, Result};
use crate::model::{MergeRules, TokenId, TokenizerModel, BASE_VOCAB_SIZE};
use crate::vocab::Vocabulary;

/// File extension required for persisted models.
pub const MODEL_EXTENSION: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    merging_rules: Vec<RuleRecord>,
    vocabulary: BTreeMap<TokenId, String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleRecord {
    left: TokenId,
    right: TokenId,
    id: TokenId,
}

/// Rejects paths that do not carry the [`MODEL_EXTENSION`] extension.
pub fn validate_model_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext == MODEL_EXTENSION => Ok(()),
        _ => Err(BpeError::InvalidConfig(format!(
            "model file {path:?} must have a .{MODEL_EXTENSION} extension"
        ))),
    }
}

/// Serialises the model to a JSON string.
pub fn to_json(model: &TokenizerModel, pretty: bool) -> Result<String> {
    let file = ModelFile {
        merging_rules: model
            .merges()
            .iter()
            .map(|((left, right), id)| RuleRecord { left, right, id })
            .collect(),
        vocabulary: model
            .vocabulary()
            .iter()
            .map(|(id, bytes)| (id, bytes_to_string(bytes)))
            .collect(),
    };
    let json = if pretty {
        serde_json::to_string_pretty(&file)?
    } else {
        serde_json::to_string(&file)?
    };
    Ok(json)
}

/// Parses and validates a model from a JSON string.
///
/// Missing or unknown fields, rule ids out of sequence, rules referencing
/// undefined ids, and vocabulary entries that disagree with the rules all fail
/// with [`BpeError::MalformedModel`].
pub fn from_json(json: &str) -> Result<TokenizerModel> {
    let file: ModelFile = serde_json::from_str(json).map_err(|err| {
        if err.is_data() {
            BpeError::malformed(err.to_string())
        } else {
            BpeError::from(err)
        }
    })?;

    let mut merges = MergeRules::new();
    for (idx, record) in file.merging_rules.iter().enumerate() {
        let expected = BASE_VOCAB_SIZE + idx;
        if record.id as usize != expected {
            return Err(BpeError::malformed(format!(
                "merge rule #{idx} has id {} (expected {expected})",
                record.id
            )));
        }
        merges.push((record.left, record.right))?;
    }

    let mut entries = Vec::with_capacity(file.vocabulary.len());
    for (position, (id, rendered)) in file.vocabulary.iter().enumerate() {
        if *id as usize != position {
            return Err(BpeError::malformed(format!(
                "vocabulary is missing token id {position}"
            )));
        }
        let bytes = string_to_bytes(rendered).ok_or_else(|| {
            BpeError::malformed(format!("vocabulary entry {id} is not byte-level encoded"))
        })?;
        entries.push(bytes);
    }

    TokenizerModel::from_parts(merges, Vocabulary::from_entries(entries)?)
}

/// Writes the model to `path`, replacing any existing file atomically.
pub fn save_model<P: AsRef<Path>>(model: &TokenizerModel, path: P, pretty: bool) -> Result<()> {
    let path = path.as_ref();
    validate_model_path(path)?;
    let json = to_json(model, pretty)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged =
        NamedTempFile::new_in(dir).map_err(|err| BpeError::io(err, Some(dir.to_path_buf())))?;
    staged
        .write_all(json.as_bytes())
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|err| BpeError::io(err, Some(staged.path().to_path_buf())))?;
    staged
        .persist(path)
        .map_err(|err| BpeError::io(err.error, Some(path.to_path_buf())))?;

    debug!(
        "saved model with {} merges ({} bytes) to {}",
        model.merges().len(),
        json.len(),
        path.display()
    );
    Ok(())
}

/// Loads and validates a model written by [`save_model`].
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<TokenizerModel> {
    let path = path.as_ref();
    validate_model_path(path)?;
    let json =
        fs::read_to_string(path).map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?;
    let model = from_json(&json)?;
    debug!(
        "loaded model with {} merges from {}",
        model.merges().len(),
        path.display()
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    fn sample_model() -> TokenizerModel {
        let rules = MergeRules::from_pairs([(32, 116), (256, 104), (0xE2, 0x82)]).unwrap();
        TokenizerModel::from_merges(rules).unwrap()
    }

    #[test]
    fn json_has_exactly_two_fields_in_rule_order() {
        let json = to_json(&sample_model(), false).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        let rules = value["merging_rules"].as_array().unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[1]["left"], 256);
        assert_eq!(rules[1]["right"], 104);
        assert_eq!(rules[1]["id"], 257);
        assert_eq!(value["vocabulary"]["257"], "\u{120}th");
        assert_eq!(value["vocabulary"].as_object().unwrap().len(), 259);
    }

    #[test]
    fn save_and_load_preserve_model() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokenizer_model.json");
        let model = sample_model();
        save_model(&model, &path, true).unwrap();
        let loaded = load_model(&path).unwrap();
        assert_eq!(loaded, model);
        assert_eq!(loaded.vocabulary().get(258), Some(&[0xE2, 0x82][..]));
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "stale").unwrap();
        save_model(&TokenizerModel::byte_level(), &path, false).unwrap();
        assert_eq!(load_model(&path).unwrap(), TokenizerModel::byte_level());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn wrong_extension_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let err = save_model(&sample_model(), &path, false).expect_err("bad extension");
        assert!(matches!(err, BpeError::InvalidConfig(message) if message.contains(".json")));
        assert!(!path.exists());
        assert!(validate_model_path("model.json").is_ok());
        assert!(validate_model_path("model").is_err());
    }

    #[test]
    fn missing_field_is_malformed() {
        let err = from_json(r#"{"merging_rules": []}"#).expect_err("no vocabulary");
        assert!(matches!(err, BpeError::MalformedModel(message) if message.contains("vocabulary")));
    }

    #[test]
    fn extra_field_is_malformed() {
        let mut value: Value =
            serde_json::from_str(&to_json(&sample_model(), false).unwrap()).unwrap();
        value["extra"] = Value::Bool(true);
        let err = from_json(&value.to_string()).expect_err("unknown field");
        assert!(matches!(err, BpeError::MalformedModel(_)));
    }

    #[test]
    fn invalid_json_is_a_serialization_error() {
        assert!(matches!(
            from_json("{not json"),
            Err(BpeError::Serialization(_))
        ));
    }

    #[test]
    fn out_of_sequence_rule_id_is_malformed() {
        let mut value: Value =
            serde_json::from_str(&to_json(&sample_model(), false).unwrap()).unwrap();
        value["merging_rules"][1]["id"] = Value::from(300);
        let err = from_json(&value.to_string()).expect_err("bad id");
        assert!(matches!(err, BpeError::MalformedModel(message) if message.contains("expected 257")));
    }

    #[test]
    fn forward_reference_is_malformed() {
        let mut value: Value =
            serde_json::from_str(&to_json(&sample_model(), false).unwrap()).unwrap();
        value["merging_rules"][0]["left"] = Value::from(258);
        let err = from_json(&value.to_string()).expect_err("undefined operand");
        assert!(matches!(err, BpeError::MalformedModel(_)));
    }

    #[test]
    fn tampered_vocabulary_is_malformed() {
        let mut value: Value =
            serde_json::from_str(&to_json(&sample_model(), false).unwrap()).unwrap();
        value["vocabulary"]["256"] = Value::from("xx");
        let err = from_json(&value.to_string()).expect_err("entry mismatch");
        assert!(matches!(err, BpeError::MalformedModel(message) if message.contains("256")));

        let mut value: Value =
            serde_json::from_str(&to_json(&sample_model(), false).unwrap()).unwrap();
        value["vocabulary"]
            .as_object_mut()
            .unwrap()
            .remove("10");
        let err = from_json(&value.to_string()).expect_err("gap in ids");
        assert!(matches!(err, BpeError::MalformedModel(message) if message.contains("10")));

        let mut value: Value =
            serde_json::from_str(&to_json(&sample_model(), false).unwrap()).unwrap();
        value["vocabulary"]["65"] = Value::from("\u{2603}");
        let err = from_json(&value.to_string()).expect_err("outside alphabet");
        assert!(matches!(err, BpeError::MalformedModel(_)));
    }
}
