//! Resolver (`check`/`authorize`, §4.7): matches discovered keypairs against
//! discovered licenses, yielding either a license already issued to a
//! keypair, a freshly issued sub-license, or nothing (with reasons).
//!
//! Two-pass resolution — match an already-issued license first, then try to
//! issue a new sub-license from an upstream dependency — lets the same
//! on-disk state serve both end-users who were directly granted a license
//! and end-users who hold only a sub-licensable upstream license.
//!
//! This module performs no I/O: raw file contents are handed in as
//! `(origin_name, utf8_json)` pairs (spec external collaborator i), and
//! `authorize`'s persistence step goes through the injected [`Discovery`]
//! trait. `apps/cli` supplies the `walkdir`-backed implementation.

use crate::agent::Agent;
use crate::canonical::to_canonical_json;
use crate::dkim::TxtResolver;
use crate::error::{LicenseError, Result};
use crate::keypair_at_rest::{KeypairEncrypted, KeypairPlaintext};
use crate::keys::{self, keypair_from_seed};
use crate::license::{License, LicenseSigned, VerifyContext};
use crate::machine::{MachineIdProvider, MachineSpec};
use crate::timestamp::Timespan;
use base64::Engine as _;
use std::collections::HashSet;
use zeroize::Zeroize;

/// A loaded Ed25519 keypair, ready for signing and verification.
///
/// The secret key is zeroized on drop (§5 "Keypair decryption leaves
/// plaintext only on the call stack"); this is the one long-lived holder of
/// it, so it carries that responsibility for its whole lifetime rather than
/// just a single call frame.
pub struct Keypair {
    vk: [u8; 32],
    sk: [u8; 64],
}

impl Keypair {
    #[must_use]
    pub const fn vk(&self) -> [u8; 32] {
        self.vk
    }

    #[must_use]
    pub const fn sk(&self) -> &[u8; 64] {
        &self.sk
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self { vk: self.vk, sk: self.sk }
    }
}

impl Drop for Keypair {
    fn drop(&mut self) {
        self.sk.zeroize();
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair").field("vk", &base64_vk(self.vk)).finish_non_exhaustive()
    }
}

/// Raw discovered file content: `(origin_name, utf8_json)`.
pub type RawCandidate = (String, String);

/// Collaborators and caller-supplied constraints `check`/`authorize` need,
/// beyond the raw file candidates themselves.
#[derive(Default, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    /// `None` defaults to performing DKIM confirmation; `Some(false)` skips it.
    pub confirm: Option<bool>,
    pub timespan_constraint: Option<Timespan>,
    pub machine_constraint: Option<MachineSpec>,
    pub resolver: Option<&'a dyn TxtResolver>,
    pub machine: Option<&'a dyn MachineIdProvider>,
}

impl<'a> ResolveContext<'a> {
    fn verify_ctx(&self, author_pubkey: Option<[u8; 32]>) -> VerifyContext<'a> {
        VerifyContext {
            author_pubkey,
            confirm: self.confirm,
            timespan_constraint: self.timespan_constraint,
            machine_constraint: self.machine_constraint,
            resolver: self.resolver,
            machine: self.machine,
        }
    }
}

/// Outcome of matching a single keypair against the discovered licenses.
#[derive(Debug, Clone)]
pub enum Match {
    /// A license already verifies with `author_pubkey == keypair.vk()` — it
    /// was previously issued directly to this keypair.
    Existing(LicenseSigned),
    /// No license was already ours, but one was sub-licensable; a new
    /// sub-license was issued and signed by this keypair.
    Issued(LicenseSigned),
    /// Every candidate license failed both attempts.
    None { reasons: Vec<String> },
}

impl Match {
    #[must_use]
    pub const fn license(&self) -> Option<&LicenseSigned> {
        match self {
            Match::Existing(lic) | Match::Issued(lic) => Some(lic),
            Match::None { .. } => None,
        }
    }
}

/// External persistence collaborator for `authorize` (§4.7): supplies fresh
/// candidate reads and writes a newly created keypair back to storage.
///
/// `apps/cli`'s implementation walks the configured search paths with
/// `walkdir`, matching the `crypto-key*`/`crypto-lic*` glob patterns (§6) and
/// skipping editor backup files (`*~`); write-order for newly created
/// material defaults to the reverse of the read order (most general
/// location first), per §9's restored `reverse_save` behavior.
pub trait Discovery {
    fn keypair_candidates(&self) -> Result<Vec<RawCandidate>>;
    fn license_candidates(&self) -> Result<Vec<RawCandidate>>;
    /// Persists freshly created keypair JSON, returning the origin it landed at.
    fn persist_keypair(&self, content: &str) -> Result<String>;
}

/// Loads every keypair candidate, dispatching to [`KeypairEncrypted`] or
/// [`KeypairPlaintext`] by field presence (`salt`+`ciphertext` vs. `sk`) per
/// §9 "Exception-for-control-flow" — no schema-probing fallback between the
/// two once the field set picks one. Results are deduped by public key.
///
/// A credential failure against a recognized `KeypairEncrypted` record is
/// logged and the candidate is dropped; it is never retried as plaintext.
#[must_use]
pub fn load_keypairs(candidates: &[RawCandidate], username: &str, password: &str) -> Vec<(String, Keypair)> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for (origin, content) in candidates {
        let value: serde_json::Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(error) => {
                tracing::debug!(origin, %error, "keypair candidate is not valid JSON");
                continue;
            },
        };
        let Some(obj) = value.as_object() else {
            tracing::debug!(origin, "keypair candidate is not a JSON object");
            continue;
        };

        let loaded = if obj.contains_key("salt") && obj.contains_key("ciphertext") {
            serde_json::from_value::<KeypairEncrypted>(value)
                .map_err(LicenseError::from)
                .and_then(|encrypted| encrypted.into_keypair(username, password))
        } else if obj.contains_key("sk") {
            serde_json::from_value::<KeypairPlaintext>(value)
                .map_err(LicenseError::from)
                .and_then(KeypairPlaintext::into_keypair)
        } else {
            tracing::debug!(origin, "keypair candidate has neither sk nor salt/ciphertext fields");
            continue;
        };

        match loaded {
            Ok((vk, sk)) => {
                if seen.insert(vk) {
                    out.push((origin.clone(), Keypair { vk, sk }));
                }
            },
            Err(error) => tracing::info!(origin, %error, "keypair candidate rejected"),
        }
    }
    out
}

/// Parses and verifies every license candidate (§4.7 step 2); candidates
/// that fail to parse or fail §4.5 verification are logged and dropped.
#[must_use]
pub fn load_licenses(candidates: &[RawCandidate], ctx: &ResolveContext<'_>) -> Vec<(String, LicenseSigned)> {
    let mut out = Vec::new();
    for (origin, content) in candidates {
        let signed: LicenseSigned = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(error) => {
                tracing::debug!(origin, %error, "license candidate failed to parse");
                continue;
            },
        };
        if let Err(error) = signed.verify(&ctx.verify_ctx(None)) {
            tracing::info!(origin, %error, "license candidate failed verification");
            continue;
        }
        out.push((origin.clone(), signed));
    }
    out
}

/// Matches one keypair against the discovered, already-verified licenses
/// (§4.7 step 3).
#[must_use]
pub fn match_keypair(keypair: &Keypair, licenses: &[(String, LicenseSigned)], ctx: &ResolveContext<'_>) -> Match {
    let mut reasons = Vec::new();

    for (origin, lic) in licenses {
        match lic.verify(&ctx.verify_ctx(Some(keypair.vk()))) {
            Ok(_) => return Match::Existing(lic.clone()),
            Err(error) => reasons.push(format!("{origin}: not already issued to this keypair: {error}")),
        }

        let verified = match lic.verify_collecting(&ctx.verify_ctx(None)) {
            Ok(v) => v,
            Err(error) => {
                reasons.push(format!("{origin}: not sub-licensable: {error}"));
                continue;
            },
        };

        let author = lic.license.client.clone().unwrap_or_else(|| {
            let encoded = base64_vk(keypair.vk());
            Agent::new(encoded.clone(), None, None, None, Some(keypair.vk()))
                .expect("pubkey-only Agent is always constructible")
        });

        let sub_ctx = ctx.verify_ctx(None);
        let issued = License::new(author, None, Some(verified.dependencies), None, verified.timespan, None, &sub_ctx)
            .and_then(|(license, _)| license.sign(keypair.sk()));

        match issued {
            Ok(signed) => return Match::Issued(signed),
            Err(error) => reasons.push(format!("{origin}: issuing sub-license failed: {error}")),
        }
    }

    Match::None { reasons }
}

/// Runs the full two-pass match for every unique discovered keypair (§4.7).
#[must_use]
pub fn check(
    keypair_candidates: &[RawCandidate],
    license_candidates: &[RawCandidate],
    ctx: &ResolveContext<'_>,
) -> Vec<(Keypair, Match)> {
    let username = ctx.username.unwrap_or_default();
    let password = ctx.password.unwrap_or_default();
    let keypairs = load_keypairs(keypair_candidates, username, password);
    let licenses = load_licenses(license_candidates, ctx);

    keypairs
        .into_iter()
        .map(|(origin, keypair)| {
            tracing::debug!(origin, vk = %base64_vk(keypair.vk()), "matching keypair against discovered licenses");
            let outcome = match_keypair(&keypair, &licenses, ctx);
            (keypair, outcome)
        })
        .collect()
}

/// Wraps [`check`]: if it yields nothing, registers a new Ed25519 keypair
/// (encrypted when `username`+`password` are both set, plaintext otherwise),
/// persists it via `discovery`, then re-runs `check` (§4.7 `authorize`,
/// reworked per §9 "Resolver state machine" as `Start -> Test -> Create`
/// rather than open-ended recursion: exactly one creation attempt).
pub fn authorize(discovery: &dyn Discovery, ctx: &ResolveContext<'_>) -> Result<Vec<(Keypair, Match)>> {
    let results = check(&discovery.keypair_candidates()?, &discovery.license_candidates()?, ctx);
    if !results.is_empty() {
        return Ok(results);
    }

    tracing::info!("no existing keypair found; registering a new one");
    let seed = keys::register()?;
    let content = match (ctx.username, ctx.password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            to_canonical_json(&KeypairEncrypted::encrypt(seed, username, password)?)?
        },
        _ => {
            let (_, sk) = keypair_from_seed(seed);
            to_canonical_json(&KeypairPlaintext::new(&hex::encode(sk), None)?)?
        },
    };
    let origin = discovery.persist_keypair(&content)?;
    tracing::info!(origin, "wrote newly registered keypair");

    Ok(check(&discovery.keypair_candidates()?, &discovery.license_candidates()?, ctx))
}

fn base64_vk(vk: [u8; 32]) -> String {
    base64::engine::general_purpose::STANDARD.encode(vk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::canonical::to_canonical_json;
    use crate::grant::Grant;

    struct NoSecretsDiscovery {
        keypairs: std::cell::RefCell<Vec<RawCandidate>>,
        licenses: Vec<RawCandidate>,
    }

    impl Discovery for NoSecretsDiscovery {
        fn keypair_candidates(&self) -> Result<Vec<RawCandidate>> {
            Ok(self.keypairs.borrow().clone())
        }
        fn license_candidates(&self) -> Result<Vec<RawCandidate>> {
            Ok(self.licenses.clone())
        }
        fn persist_keypair(&self, content: &str) -> Result<String> {
            let origin = format!("memory://keypair-{}", self.keypairs.borrow().len());
            self.keypairs.borrow_mut().push((origin.clone(), content.to_owned()));
            Ok(origin)
        }
    }

    fn no_client_parent_fixture() -> (RawCandidate, [u8; 32]) {
        let (vk, sk) = keypair_from_seed([1u8; 32]);
        let author = Agent::new("Vendor", None, None, None, Some(vk)).unwrap();
        let mut grant_map = serde_json::Map::new();
        grant_map.insert("some".to_owned(), serde_json::json!({"capability": 1}));
        let grant = Grant::try_from_value(grant_map).unwrap();

        let ctx = VerifyContext::new().no_confirm();
        let (license, _) = License::new(author, None, None, None, None, Some(grant), &ctx).unwrap();
        let signed = license.sign(&sk).unwrap();
        let content = to_canonical_json(&signed).unwrap();
        (("parent.crypto-license".to_owned(), content), vk)
    }

    #[test]
    fn check_issues_sub_license_for_unclaimed_parent() {
        let (parent, _parent_vk) = no_client_parent_fixture();
        let (_, client_sk) = keypair_from_seed([2u8; 32]);
        let plaintext = KeypairPlaintext::new(&hex::encode(client_sk), None).unwrap();
        let keypair_content = to_canonical_json(&plaintext).unwrap();

        let discovery = NoSecretsDiscovery {
            keypairs: std::cell::RefCell::new(vec![("client.crypto-keypair".to_owned(), keypair_content)]),
            licenses: vec![parent],
        };

        let ctx = ResolveContext { confirm: Some(false), ..ResolveContext::default() };
        let results = check(&discovery.keypair_candidates().unwrap(), &discovery.license_candidates().unwrap(), &ctx);

        assert_eq!(results.len(), 1);
        let (keypair, outcome) = &results[0];
        match outcome {
            Match::Issued(signed) => {
                assert_eq!(signed.license.author.pubkey, Some(keypair.vk()));
                assert_eq!(signed.license.dependencies.as_ref().unwrap().len(), 1);
            },
            other => panic!("expected Match::Issued, got {other:?}"),
        }
    }

    #[test]
    fn authorize_registers_a_keypair_when_none_exists() {
        let discovery =
            NoSecretsDiscovery { keypairs: std::cell::RefCell::new(vec![]), licenses: vec![] };
        let ctx = ResolveContext { confirm: Some(false), ..ResolveContext::default() };
        let results = authorize(&discovery, &ctx).unwrap();
        // A fresh keypair was registered and persisted, but no license candidates exist to match.
        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0].1, Match::None { .. }));
        assert_eq!(discovery.keypairs.borrow().len(), 1);
    }
}
