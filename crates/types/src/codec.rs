// Path: crates/types/src/codec.rs

//! Base64url encoding helpers.
//!
//! Every identifier on the weave (transaction ids, data roots, chunk
//! digests) travels as unpadded base64url text. Centralizing the engine
//! here keeps the alphabet and padding rules identical everywhere a digest
//! is printed or parsed.
//!
//! Decoding is deliberately permissive about the final character's unused
//! bits: a 43-character id carries 258 bits for 32 bytes, and clients in
//! the wild send non-canonical encodings. Encoding always produces the
//! canonical unpadded form.

use base64::alphabet::URL_SAFE;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine as _;

const B64URL: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encodes bytes as canonical unpadded base64url.
pub fn b64url_encode(bytes: &[u8]) -> String {
    B64URL.encode(bytes)
}

/// Decodes base64url text into bytes.
///
/// Fails fast with a descriptive message so malformed identifiers never
/// propagate past the parsing boundary.
pub fn b64url_decode(s: &str) -> Result<Vec<u8>, String> {
    B64URL
        .decode(s)
        .map_err(|e| format!("invalid base64url: {}", e))
}

/// Decodes base64url text that must represent exactly 32 bytes.
pub fn b64url_decode_32(s: &str) -> Result<[u8; 32], String> {
    let bytes = b64url_decode(s)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| format!("expected 32 bytes, got {}", len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_without_padding() {
        let raw = [0u8; 32];
        let text = b64url_encode(&raw);
        assert_eq!(text.len(), 43);
        assert!(!text.contains('='));
        assert_eq!(b64url_decode(&text).unwrap(), raw);
    }

    #[test]
    fn rejects_standard_alphabet() {
        assert!(b64url_decode("a+b/c").is_err());
    }

    #[test]
    fn tolerates_noncanonical_trailing_bits() {
        // 43 chars carry 258 bits; the last two are dropped on decode
        // and zeroed on re-encode.
        let noncanonical = "B".repeat(43);
        let raw = b64url_decode(&noncanonical).unwrap();
        assert_eq!(raw.len(), 32);
        let canonical = b64url_encode(&raw);
        assert_eq!(&canonical[..42], &noncanonical[..42]);
        assert_eq!(canonical.as_bytes()[42], b'A');
    }

    #[test]
    fn decode_32_enforces_length() {
        assert!(b64url_decode_32(&b64url_encode(&[1u8; 31])).is_err());
        assert!(b64url_decode_32(&b64url_encode(&[1u8; 32])).is_ok());
    }
}
