//! Ed25519 primitives (§4.3): seed-derived keypairs, signing, and verification.

use crate::error::{LicenseError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroize;

/// Derives `(verifying_key, signing_key_bytes)` from a 32-byte seed, where
/// `signing_key_bytes` is the standard `seed || vk` 64-byte concatenation.
#[must_use]
pub fn keypair_from_seed(seed: [u8; 32]) -> ([u8; 32], [u8; 64]) {
    let signing_key = SigningKey::from_bytes(&seed);
    let verifying_key = signing_key.verifying_key();

    let mut sk = [0u8; 64];
    sk[..32].copy_from_slice(&seed);
    sk[32..].copy_from_slice(verifying_key.as_bytes());

    (*verifying_key.as_bytes(), sk)
}

/// Generates a fresh 32-byte seed from the operating system's CSPRNG.
pub fn register() -> Result<[u8; 32]> {
    let mut seed = [0u8; 32];
    getrandom::fill(&mut seed).map_err(|e| LicenseError::Internal {
        message: e.to_string().into(),
        context: Some("generating a fresh Ed25519 seed".into()),
    })?;
    Ok(seed)
}

/// Signs `message` with a 32- or 64-byte `sk`. When `sk` is 64 bytes, its
/// upper half must already equal the corresponding `vk` (§4.3) — this
/// function only needs the first 32 bytes (the seed) to sign.
pub fn sign(message: &[u8], sk: &[u8]) -> Result<[u8; 64]> {
    let seed = extract_seed(sk)?;
    let mut signing_key = SigningKey::from_bytes(&seed);
    let signature = signing_key.sign(message);
    seed_zeroize(&mut signing_key);
    Ok(signature.to_bytes())
}

fn seed_zeroize(signing_key: &mut SigningKey) {
    let mut bytes = signing_key.to_bytes();
    bytes.zeroize();
}

/// Verifies a 64-byte Ed25519 signature over `message` under `vk`.
pub fn verify(sig: &[u8; 64], message: &[u8], vk: &[u8; 32]) -> Result<bool> {
    let verifying_key = VerifyingKey::from_bytes(vk).map_err(|e| LicenseError::SignatureMismatch {
        source: e,
        context: Some("parsing verifying key bytes".into()),
    })?;
    let signature = Signature::from_bytes(sig);
    Ok(verifying_key.verify(message, &signature).is_ok())
}

/// Verifies, returning an error rather than `Ok(false)` on rejection — used
/// where the license format's own explicit signature check (§4.5 step 3)
/// must produce a `SignatureMismatch`.
pub fn verify_strict(sig: &[u8; 64], message: &[u8], vk: &[u8; 32]) -> Result<()> {
    let verifying_key = VerifyingKey::from_bytes(vk).map_err(|e| LicenseError::SignatureMismatch {
        source: e,
        context: Some("parsing verifying key bytes".into()),
    })?;
    let signature = Signature::from_bytes(sig);
    verifying_key.verify(message, &signature).map_err(|e| LicenseError::SignatureMismatch {
        source: e,
        context: Some("license signature verification".into()),
    })
}

/// Extracts the 32-byte seed from a 32- or 64-byte `sk`, per §4.3: when 64
/// bytes, the upper half must equal the derived `vk`.
fn extract_seed(sk: &[u8]) -> Result<[u8; 32]> {
    match sk.len() {
        32 => Ok(<[u8; 32]>::try_from(sk).expect("length checked")),
        64 => {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&sk[..32]);
            let vk = SigningKey::from_bytes(&seed).verifying_key();
            if vk.as_bytes() != &sk[32..] {
                return Err(LicenseError::InvalidField {
                    field: "sk".into(),
                    detail: "upper half of 64-byte sk does not match its derived vk".into(),
                    context: None,
                });
            }
            Ok(seed)
        },
        other => Err(LicenseError::InvalidField {
            field: "sk".into(),
            detail: format!("expected 32 or 64 bytes, got {other}").into(),
            context: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_round_trips_through_signing() {
        let seed = [7u8; 32];
        let (vk, sk) = keypair_from_seed(seed);
        assert_eq!(&sk[..32], &seed);
        let sig = sign(b"hello", &sk).unwrap();
        assert!(verify(&sig, b"hello", &vk).unwrap());
        assert!(!verify(&sig, b"tampered", &vk).unwrap());
    }

    #[test]
    fn rejects_mismatched_64_byte_sk() {
        let (_, mut sk) = keypair_from_seed([1u8; 32]);
        sk[63] ^= 0xff;
        assert!(sign(b"m", &sk).is_err());
    }
}
