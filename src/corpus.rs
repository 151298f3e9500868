//! Facilities for loading training corpora and inference input from disk.

use std::fs;
use std::path::Path;

use crate::error::{BpeError, Result};

/// Reads an entire file as the training corpus.
///
/// The file is treated as one contiguous byte stream; an empty file is rejected
/// with [`BpeError::EmptyCorpus`].
pub fn read_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?;
    if bytes.is_empty() {
        return Err(BpeError::EmptyCorpus);
    }
    Ok(bytes)
}

/// Resolves an inference argument to text.
///
/// When `arg` names an existing file, its UTF-8 contents are returned; otherwise
/// the argument itself is taken as the text to tokenize.
pub fn read_text_or_literal(arg: &str) -> Result<String> {
    let path = Path::new(arg);
    if !path.is_file() {
        return Ok(arg.to_owned());
    }
    fs::read_to_string(path).map_err(|err| BpeError::io(err, Some(path.to_path_buf())))
}
