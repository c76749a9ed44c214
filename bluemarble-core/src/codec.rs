//! Text encodings used by the persisted template document.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::CoreError;

/// Alphabet used to encode author ids into storage keys (base 92).
pub const AUTHOR_ALPHABET: &str =
    "!#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[]^_`abcdefghijklmnopqrstuvwxyz{|}~";

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Standard (padded, non-URL-safe) base64 with no line wrapping.
pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn decode_base64(text: &str) -> crate::Result<Vec<u8>> {
    Ok(BASE64.decode(text.trim())?)
}

/// Wrap PNG bytes as a `data:image/png;base64,` URL.
pub fn encode_png_data_url(png_bytes: &[u8]) -> String {
    format!("{PNG_DATA_URL_PREFIX}{}", encode_base64(png_bytes))
}

/// Decode a data URL (any media type) or a bare base64 payload.
pub fn decode_data_url(text: &str) -> crate::Result<Vec<u8>> {
    let text = text.trim();
    let payload = match text.strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((_, payload)) => payload,
            None => return Err(CoreError::InvalidDataUrl),
        },
        None => text,
    };
    decode_base64(payload)
}

/// Positional base-K encoding of `n`, where K is the number of characters in
/// `alphabet`. Most significant digit first; zero encodes as `alphabet[0]`.
pub fn encode_number(mut n: u64, alphabet: &str) -> crate::Result<String> {
    let digits: Vec<char> = alphabet.chars().collect();
    if digits.len() < 2 {
        return Err(CoreError::InvalidAlphabet {
            reason: format!("need at least 2 characters, got {}", digits.len()),
        });
    }
    for (i, c) in digits.iter().enumerate() {
        if digits[i + 1..].contains(c) {
            return Err(CoreError::InvalidAlphabet {
                reason: format!("duplicate character {c:?}"),
            });
        }
    }

    if n == 0 {
        return Ok(digits[0].to_string());
    }

    let base = digits.len() as u64;
    let mut out = Vec::new();
    while n > 0 {
        out.push(digits[(n % base) as usize]);
        n /= base;
    }
    Ok(out.into_iter().rev().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trip_edge_buffers() {
        let cases: [Vec<u8>; 4] = [
            Vec::new(),
            vec![0xFF; 257],
            vec![0u8; 3],
            (0..=255u8).collect(),
        ];
        for bytes in cases {
            assert_eq!(decode_base64(&encode_base64(&bytes)).unwrap(), bytes);
        }
    }

    #[test]
    fn base64_uses_standard_alphabet_without_wrapping() {
        let encoded = encode_base64(&[0xFB, 0xFF, 0xBF].repeat(40));
        assert!(encoded.contains('+') || encoded.contains('/'));
        assert!(!encoded.contains('\n'));
    }

    #[test]
    fn bad_base64_is_an_error() {
        assert!(decode_base64("not base64!").is_err());
    }

    #[test]
    fn data_url_round_trip() {
        let bytes = b"\x89PNG\r\n\x1a\n";
        let url = encode_png_data_url(bytes);
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_url(&url).unwrap(), bytes);
        assert_eq!(decode_data_url(&encode_base64(bytes)).unwrap(), bytes);
    }

    #[test]
    fn encode_number_matches_documented_examples() {
        let alphabet = "012abcABC";
        assert_eq!(encode_number(0, alphabet).unwrap(), "0");
        assert_eq!(encode_number(5, alphabet).unwrap(), "c");
        assert_eq!(encode_number(15, alphabet).unwrap(), "1A");
        assert_eq!(encode_number(12345, alphabet).unwrap(), "1BCaA");
    }

    #[test]
    fn encode_number_length_grows_at_powers_of_base() {
        let base = AUTHOR_ALPHABET.chars().count() as u64;
        assert_eq!(encode_number(base - 1, AUTHOR_ALPHABET).unwrap().chars().count(), 1);
        assert_eq!(encode_number(base, AUTHOR_ALPHABET).unwrap().chars().count(), 2);
        assert_eq!(encode_number(base * base - 1, AUTHOR_ALPHABET).unwrap().chars().count(), 2);
        assert_eq!(encode_number(base * base, AUTHOR_ALPHABET).unwrap().chars().count(), 3);
    }

    #[test]
    fn encode_number_is_collision_free() {
        let mut seen = std::collections::HashSet::new();
        for n in 0..5000 {
            assert!(seen.insert(encode_number(n, "ab").unwrap()));
        }
    }

    #[test]
    fn encode_number_rejects_bad_alphabets() {
        assert!(encode_number(1, "").is_err());
        assert!(encode_number(1, "a").is_err());
        assert!(encode_number(1, "abca").is_err());
    }
}
