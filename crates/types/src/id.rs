// Path: crates/types/src/id.rs

//! Content-addressed identifiers.
//!
//! A transaction or data item id is the base64url rendering of a 32-byte
//! digest, which is always exactly 43 characters from the
//! `[A-Za-z0-9_-]` alphabet. Ids are stored decoded so lookups and key
//! derivations work on raw bytes; the textual form is reproduced on
//! `Display`.

use crate::codec::{b64url_decode_32, b64url_encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The textual length of every id and digest on the weave.
pub const ID_LENGTH: usize = 43;

macro_rules! digest_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Returns the raw 32-byte digest.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Renders the digest as unpadded base64url text.
            pub fn to_b64url(&self) -> String {
                b64url_encode(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_b64url())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.to_b64url())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.len() != ID_LENGTH {
                    return Err(format!(
                        "expected {} base64url characters, got {}",
                        ID_LENGTH,
                        s.len()
                    ));
                }
                Ok(Self(b64url_decode_32(s)?))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_b64url())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

digest_newtype! {
    /// A transaction or data item identifier (43-char base64url, 32 bytes).
    TxId
}

digest_newtype! {
    /// The merkle root over a transaction's chunk leaves.
    DataRoot
}

digest_newtype! {
    /// The SHA-256 digest of a chunk's bytes.
    ChunkHash
}

digest_newtype! {
    /// The SHA-256 digest of a full contiguous object, used as its cache key.
    DataHash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_ids() {
        let id: TxId = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".parse().unwrap();
        assert_eq!(id.0, [0u8; 32]);
        assert_eq!(id.to_string().len(), ID_LENGTH);
    }

    #[test]
    fn rejects_bad_length_and_alphabet() {
        assert!("short".parse::<TxId>().is_err());
        assert!("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA+".parse::<TxId>().is_err());
        // 44 chars
        assert!("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".parse::<TxId>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let root = DataRoot([7u8; 32]);
        let text = root.to_string();
        assert_eq!(text.parse::<DataRoot>().unwrap(), root);
    }

    #[test]
    fn noncanonical_ids_parse_and_canonicalize() {
        let id: TxId = "B".repeat(43).parse().unwrap();
        let text = id.to_string();
        assert!(text[..42].bytes().all(|c| c == b'B'));
        assert_eq!(text.as_bytes()[42], b'A');
    }
}
