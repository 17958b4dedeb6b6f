//! Canonical JSON serialization: the byte-exact pre-image over which every
//! signature in this crate is computed.
//!
//! Serializing through [`serde_json::Value`] (a `BTreeMap`-backed object,
//! since this workspace does not enable `serde_json/preserve_order`) sorts
//! object keys lexicographically at every depth for free; `to_string`
//! already emits the compact `","`/`":"` separators with no insignificant
//! whitespace. Any deviation here invalidates every signature produced by
//! this crate — see [`crate::error::LicenseError`] and the round-trip tests
//! in `tests/`.

use crate::error::{LicenseError, Result};
use serde::Serialize;

/// Serializes `value` to its canonical (sorted-key, whitespace-free) JSON string.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let as_value = serde_json::to_value(value).map_err(LicenseError::from)?;
    serde_json::to_string(&as_value).map_err(LicenseError::from)
}

/// Serializes `value` to the canonical JSON pre-image as raw bytes.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(to_canonical_json(value)?.into_bytes())
}

/// Transparent Base64 (standard alphabet, no padding) encoding for byte buffers.
///
/// Used for `pubkey`, `signature`, and `salt`-adjacent fields that §4.1 marks
/// as base64 rather than hex.
pub mod bytes_as_base64 {
    use base64::{Engine as _, engine::general_purpose};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: impl AsRef<[u8]>, s: S) -> std::result::Result<S::Ok, S::Error> {
        let mut buf = String::new();
        general_purpose::STANDARD.encode_string(v, &mut buf);
        String::serialize(&buf, s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        general_purpose::STANDARD
            .decode(&text)
            .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(&text))
            .map_err(|e| serde::de::Error::custom(format!("invalid base64: {e}")))
    }

    pub mod fixed32 {
        use super::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(v: &[u8; 32], s: S) -> std::result::Result<S::Ok, S::Error> {
            super::serialize(v, s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<[u8; 32], D::Error> {
            let bytes = super::deserialize(d)?;
            <[u8; 32]>::try_from(bytes)
                .map_err(|b| serde::de::Error::custom(format!("expected 32 bytes, got {}", b.len())))
        }
    }

    pub mod fixed64 {
        use super::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(v: &[u8; 64], s: S) -> std::result::Result<S::Ok, S::Error> {
            super::serialize(v, s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<[u8; 64], D::Error> {
            let bytes = super::deserialize(d)?;
            <[u8; 64]>::try_from(bytes)
                .map_err(|b| serde::de::Error::custom(format!("expected 64 bytes, got {}", b.len())))
        }
    }
}

/// Transparent lowercase-hex encoding, used for `salt` and `ciphertext` per §4.1.
pub mod bytes_as_hex {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: impl AsRef<[u8]>, s: S) -> std::result::Result<S::Ok, S::Error> {
        String::serialize(&hex::encode(v), s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<u8>, D::Error> {
        hex::decode(String::deserialize(d)?).map_err(|e| serde::de::Error::custom(format!("invalid hex: {e}")))
    }
}

/// Decodes a byte buffer that may be encoded as either hex or Base64, per
/// the `into_bytes` tolerant-decoding behavior carried over from the
/// original implementation's keypair-plaintext loader.
pub fn decode_tolerant(text: &str) -> Result<Vec<u8>> {
    use base64::{Engine as _, engine::general_purpose};

    if let Ok(bytes) = hex::decode(text) {
        return Ok(bytes);
    }
    general_purpose::STANDARD
        .decode(text)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(text))
        .map_err(|e| LicenseError::InvalidField {
            field: "bytes".into(),
            detail: format!("neither valid hex nor base64: {e}").into(),
            context: None,
        })
}
