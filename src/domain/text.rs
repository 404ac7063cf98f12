//! Wire text decoding for human-readable payloads.
//!
//! Headlines, bodies and issue names arrive as Shift_JIS bytes, wrapped
//! in Base64 (NS / EC) or hex (FD `x`-prefixed row fields).

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use encoding_rs::SHIFT_JIS;

use crate::error::{EventError, EventResult};

/// Decode Shift_JIS bytes into a string.
///
/// Malformed sequences become U+FFFD.
pub fn decode_shift_jis(bytes: &[u8]) -> String {
    let (text, _had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Base64 (padded or unpadded) then Shift_JIS.
///
/// Blank input decodes to an empty string.
///
/// # Errors
/// `TextDecode` when the value is not Base64 in either alphabet.
pub fn decode_base64_shift_jis(value: &str) -> EventResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }
    let bytes = STANDARD
        .decode(value)
        .or_else(|_| STANDARD_NO_PAD.decode(value))
        .map_err(|e| EventError::TextDecode(format!("base64: {e}")))?;
    Ok(decode_shift_jis(&bytes))
}

/// Hex then Shift_JIS, keeping the original text on any failure.
pub fn decode_hex_shift_jis(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    match hex::decode(trimmed) {
        Ok(bytes) => decode_shift_jis(&bytes),
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // "テスト" in Shift_JIS
    const TEST_SJIS: [u8; 6] = [0x83, 0x65, 0x83, 0x58, 0x83, 0x67];

    #[test]
    fn base64_padded_and_unpadded() {
        let padded = STANDARD.encode(TEST_SJIS);
        let unpadded = STANDARD_NO_PAD.encode(b"\x83\x65\x83");
        assert_eq!(decode_base64_shift_jis(&padded).unwrap(), "テスト");
        assert!(decode_base64_shift_jis(&unpadded).unwrap().starts_with('テ'));
    }

    #[test]
    fn base64_garbage_is_an_error() {
        let err = decode_base64_shift_jis("not base64 !!").unwrap_err();
        assert!(matches!(err, EventError::TextDecode(_)));
    }

    #[test]
    fn blank_base64_is_empty() {
        assert_eq!(decode_base64_shift_jis("   ").unwrap(), "");
    }

    #[test]
    fn hex_round_trip_and_fallback() {
        assert_eq!(decode_hex_shift_jis(&hex::encode("TPM")), "TPM");
        assert_eq!(decode_hex_shift_jis(&hex::encode(TEST_SJIS)), "テスト");
        assert_eq!(decode_hex_shift_jis("zz-not-hex"), "zz-not-hex");
    }
}
