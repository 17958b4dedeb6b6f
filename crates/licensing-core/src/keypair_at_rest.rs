//! Keypair-at-rest formats (§3 "KeypairPlaintext", "KeypairEncrypted", §4.6):
//! storing an Ed25519 signing keypair either bare or encrypted with a
//! username/password-derived symmetric key.

use crate::canonical::{bytes_as_base64, bytes_as_hex, decode_tolerant};
use crate::error::{LicenseError, Result};
use crate::keys::keypair_from_seed;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A bare Ed25519 keypair, serialized as base64 `sk`/`vk` (§4.1).
///
/// `sk` accepts either the 32-byte seed or the full 64-byte `seed || vk`
/// concatenation; when both `sk` and `vk` are given they must agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeypairPlaintext {
    #[serde(with = "bytes_as_base64")]
    sk: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default, with = "optional_vk")]
    vk: Option<[u8; 32]>,
}

mod optional_vk {
    use crate::canonical::bytes_as_base64;
    use base64::{Engine as _, engine::general_purpose};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<[u8; 32]>, s: S) -> std::result::Result<S::Ok, S::Error> {
        match v {
            Some(bytes) => bytes_as_base64::fixed32::serialize(bytes, s),
            None => unreachable!("skip_serializing_if filters None"),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<[u8; 32]>, D::Error> {
        let Some(text) = Option::<String>::deserialize(d)? else {
            return Ok(None);
        };
        let bytes = general_purpose::STANDARD
            .decode(&text)
            .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(&text))
            .map_err(|e| serde::de::Error::custom(format!("invalid base64: {e}")))?;
        let array = <[u8; 32]>::try_from(bytes)
            .map_err(|b| serde::de::Error::custom(format!("expected 32 bytes, got {}", b.len())))?;
        Ok(Some(array))
    }
}

impl KeypairPlaintext {
    /// Builds and validates a plaintext keypair from raw `sk` (32 or 64
    /// bytes, hex or base64) and an optional `vk` to cross-check.
    pub fn new(sk: &str, vk: Option<&str>) -> Result<Self> {
        let sk_bytes = decode_tolerant(sk)?;
        if sk_bytes.len() != 32 && sk_bytes.len() != 64 {
            return Err(LicenseError::InvalidField {
                field: "sk".into(),
                detail: format!("expected 32 or 64 bytes, got {}", sk_bytes.len()).into(),
                context: None,
            });
        }
        let vk_bytes = vk.map(decode_tolerant).transpose()?;
        if let Some(vk_bytes) = &vk_bytes {
            if vk_bytes.len() != 32 {
                return Err(LicenseError::InvalidField {
                    field: "vk".into(),
                    detail: format!("expected 32 bytes, got {}", vk_bytes.len()).into(),
                    context: None,
                });
            }
            if sk_bytes.len() == 64 && sk_bytes[32..] != vk_bytes[..] {
                return Err(LicenseError::InvalidField {
                    field: "vk".into(),
                    detail: "inconsistent Ed25519 signing / public keys in supplied data".into(),
                    context: None,
                });
            }
        }

        let seed = <[u8; 32]>::try_from(&sk_bytes[..32]).expect("length checked");
        let (derived_vk, derived_sk) = keypair_from_seed(seed);
        if let Some(vk_bytes) = &vk_bytes {
            if vk_bytes.as_slice() != derived_vk {
                return Err(LicenseError::InvalidField {
                    field: "vk".into(),
                    detail: "failed to derive matching Ed25519 public key from supplied private key data"
                        .into(),
                    context: None,
                });
            }
        }

        Ok(Self { sk: derived_sk.to_vec(), vk: Some(derived_vk) })
    }

    /// Returns the `(verifying_key, signing_key)` pair this plaintext record encodes.
    pub fn into_keypair(self) -> Result<([u8; 32], [u8; 64])> {
        let seed = <[u8; 32]>::try_from(&self.sk[..32]).map_err(|_| LicenseError::InvalidField {
            field: "sk".into(),
            detail: "malformed signing key material".into(),
            context: None,
        })?;
        let (vk, sk) = keypair_from_seed(seed);
        if let Some(expected_vk) = self.vk {
            if expected_vk != vk {
                return Err(LicenseError::InvalidField {
                    field: "vk".into(),
                    detail: "failed to derive matching Ed25519 public key from supplied private key data"
                        .into(),
                    context: None,
                });
            }
        }
        Ok((vk, sk))
    }
}

/// An Ed25519 signing-key seed encrypted with ChaCha20-Poly1305, keyed by
/// `sha256(salt || lowercase(username) || password)` (§4.6).
///
/// `salt` doubles as the ChaCha20-Poly1305 nonce (96 bits); `ciphertext` is
/// the 32-byte encrypted seed plus its 16-byte authentication tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeypairEncrypted {
    #[serde(with = "bytes_as_hex")]
    salt: Vec<u8>,
    #[serde(with = "bytes_as_hex")]
    ciphertext: Vec<u8>,
}

impl KeypairEncrypted {
    /// Encrypts `seed` under a key derived from `username`/`password`,
    /// generating a fresh random salt/nonce.
    pub fn encrypt(seed: [u8; 32], username: &str, password: &str) -> Result<Self> {
        let mut salt = [0u8; 12];
        getrandom::fill(&mut salt).map_err(|e| LicenseError::Internal {
            message: e.to_string().into(),
            context: Some("generating a fresh keypair-encryption salt".into()),
        })?;

        let key = derive_key(&salt, username, password);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let ciphertext = cipher.encrypt(Nonce::from_slice(&salt), seed.as_slice()).map_err(|_| {
            LicenseError::Internal { message: "ChaCha20Poly1305 encryption failed".into(), context: None }
        })?;

        Ok(Self { salt: salt.to_vec(), ciphertext })
    }

    /// Recovers `(verifying_key, signing_key)` by decrypting with
    /// `username`/`password`. A failed authentication tag check, or any
    /// other decryption failure, is [`LicenseError::KeypairCredentialError`].
    pub fn into_keypair(&self, username: &str, password: &str) -> Result<([u8; 32], [u8; 64])> {
        if self.salt.len() != 12 {
            return Err(LicenseError::InvalidField {
                field: "salt".into(),
                detail: format!("expected a 96-bit salt, got {} bytes", self.salt.len()).into(),
                context: None,
            });
        }

        let key = derive_key(&self.salt, username, password);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let nonce = Nonce::from_slice(&self.salt);
        let seed_bytes = cipher
            .decrypt(nonce, self.ciphertext.as_slice())
            .map_err(|_| LicenseError::KeypairCredentialError { context: Some(format!("decrypting for {username}").into()) })?;

        let seed = <[u8; 32]>::try_from(seed_bytes).map_err(|_| LicenseError::KeypairCredentialError {
            context: Some("decrypted seed had unexpected length".into()),
        })?;
        Ok(keypair_from_seed(seed))
    }
}

fn derive_key(salt: &[u8], username: &str, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(username.to_lowercase().as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_round_trips_from_seed_only() {
        let (vk, sk) = keypair_from_seed([4u8; 32]);
        let text = hex::encode(sk);
        let plaintext = KeypairPlaintext::new(&text, None).unwrap();
        let (round_vk, round_sk) = plaintext.into_keypair().unwrap();
        assert_eq!(round_vk, vk);
        assert_eq!(round_sk, sk);
    }

    #[test]
    fn plaintext_rejects_mismatched_vk() {
        let (_, sk) = keypair_from_seed([4u8; 32]);
        let (other_vk, _) = keypair_from_seed([5u8; 32]);
        let sk_hex = hex::encode(sk);
        let vk_hex = hex::encode(other_vk);
        assert!(KeypairPlaintext::new(&sk_hex, Some(&vk_hex)).is_err());
    }

    #[test]
    fn encrypted_round_trips_with_correct_credentials() {
        let (vk, sk) = keypair_from_seed([6u8; 32]);
        let seed: [u8; 32] = sk[..32].try_into().unwrap();
        let encrypted = KeypairEncrypted::encrypt(seed, "User@Example.com", "hunter2").unwrap();

        let (round_vk, round_sk) = encrypted.into_keypair("user@example.com", "hunter2").unwrap();
        assert_eq!(round_vk, vk);
        assert_eq!(round_sk, sk);
    }

    #[test]
    fn encrypted_rejects_wrong_password() {
        let (_, sk) = keypair_from_seed([6u8; 32]);
        let seed: [u8; 32] = sk[..32].try_into().unwrap();
        let encrypted = KeypairEncrypted::encrypt(seed, "user@example.com", "hunter2").unwrap();
        assert!(matches!(
            encrypted.into_keypair("user@example.com", "wrong"),
            Err(LicenseError::KeypairCredentialError { .. })
        ));
    }

    /// §8 scenario 5: a zero salt, `username="a@b.c"`, `password="password"`
    /// recovers the original seed; the same ciphertext under a
    /// differently-cased password (`"Password"`) is rejected — usernames
    /// fold to lowercase before hashing, passwords do not.
    #[test]
    fn scenario_5_zero_salt_credentials() {
        let salt = [0u8; 12];
        let seed = [42u8; 32];
        let key = derive_key(&salt, "a@b.c", "password");
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let ciphertext = cipher.encrypt(Nonce::from_slice(&salt), seed.as_slice()).unwrap();
        let encrypted = KeypairEncrypted { salt: salt.to_vec(), ciphertext };

        let (vk, sk) = encrypted.into_keypair("a@b.c", "password").unwrap();
        let (expected_vk, expected_sk) = keypair_from_seed(seed);
        assert_eq!(vk, expected_vk);
        assert_eq!(sk, expected_sk);

        // Username case-folds, so this still succeeds.
        assert!(encrypted.into_keypair("A@B.C", "password").is_ok());

        // Password does not case-fold.
        assert!(matches!(
            encrypted.into_keypair("a@b.c", "Password"),
            Err(LicenseError::KeypairCredentialError { .. })
        ));
    }
}
