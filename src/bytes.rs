//! Reversible rendering of token bytes as printable strings.
//!
//! Vocabulary entries are arbitrary bytes, often not valid UTF-8 on their own.
//! The GPT-2 byte-level alphabet maps each byte to one printable code point so
//! entries can be stored in text formats with exact byte fidelity.

use std::sync::OnceLock;

use rustc_hash::FxHashMap;

struct ByteAlphabet {
    forward: [char; 256],
    reverse: FxHashMap<char, u8>,
}

fn alphabet() -> &'static ByteAlphabet {
    static ALPHABET: OnceLock<ByteAlphabet> = OnceLock::new();
    ALPHABET.get_or_init(|| {
        let mut forward = ['\0'; 256];
        let mut reverse = FxHashMap::default();
        let mut unprintable = 0u32;
        for byte in 0u8..=u8::MAX {
            let printable = matches!(byte, b'!'..=b'~' | 0xA1..=0xAC | 0xAE..=0xFF);
            let codepoint = if printable {
                u32::from(byte)
            } else {
                unprintable += 1;
                255 + unprintable
            };
            // Code points 0x21..=0x143 are all assigned scalar values.
            let ch = char::from_u32(codepoint).unwrap_or(char::REPLACEMENT_CHARACTER);
            forward[byte as usize] = ch;
            reverse.insert(ch, byte);
        }
        ByteAlphabet { forward, reverse }
    })
}

/// Renders raw bytes as a byte-level string.
#[must_use]
pub fn bytes_to_string(bytes: &[u8]) -> String {
    let table = &alphabet().forward;
    bytes.iter().map(|&b| table[b as usize]).collect()
}

/// Converts a string produced by [`bytes_to_string`] back to raw bytes.
///
/// Returns `None` if the string contains a character outside the alphabet.
#[must_use]
pub fn string_to_bytes(text: &str) -> Option<Vec<u8>> {
    let reverse = &alphabet().reverse;
    text.chars().map(|c| reverse.get(&c).copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_byte() {
        let bytes: Vec<u8> = (0..=u8::MAX).collect();
        let rendered = bytes_to_string(&bytes);
        assert_eq!(rendered.chars().count(), 256);
        assert_eq!(string_to_bytes(&rendered), Some(bytes));
    }

    #[test]
    fn printable_ascii_is_unchanged() {
        assert_eq!(bytes_to_string(b"Hello!"), "Hello!");
        assert_eq!(bytes_to_string(b" "), "\u{120}");
        assert_eq!(bytes_to_string(&[0]), "\u{100}");
    }

    #[test]
    fn rendered_strings_contain_no_control_characters() {
        let bytes: Vec<u8> = (0..=u8::MAX).collect();
        assert!(bytes_to_string(&bytes)
            .chars()
            .all(|c| !c.is_control() && !c.is_whitespace()));
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        assert_eq!(string_to_bytes("ok\u{2603}"), None);
        assert_eq!(string_to_bytes(" "), None);
    }
}
