//! License and LicenseSigned (§3, §4.5): the core verification algorithm.

use crate::agent::Agent;
use crate::canonical::{bytes_as_base64, to_canonical_bytes};
use crate::dkim::{self, TxtResolver};
use crate::error::{LicenseError, Result};
use crate::grant::Grant;
use crate::keys;
use crate::machine::{MachineIdProvider, MachineSpec};
use crate::timestamp::{Duration, Timespan, Timestamp, overlap_intersect};
use serde::{Deserialize, Serialize};

/// An unsigned declaration of author, client, timespan, machine, grant, and
/// dependencies (§3 "License").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct License {
    pub author: Agent,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub client: Option<Agent>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dependencies: Option<Vec<LicenseSigned>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub machine: Option<MachineSpec>,
    #[serde(skip_serializing_if = "is_empty_timespan", default)]
    pub timespan: Option<Timespan>,
    #[serde(skip_serializing_if = "is_empty_grant", default)]
    pub grant: Option<Grant>,
}

fn is_empty_timespan(t: &Option<Timespan>) -> bool {
    t.as_ref().is_none_or(Timespan::is_empty)
}

fn is_empty_grant(g: &Option<Grant>) -> bool {
    g.as_ref().is_none_or(Grant::is_empty)
}

/// A License paired with the 64-byte Ed25519 signature of its canonical
/// serialization (§3 "LicenseSigned").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LicenseSigned {
    pub license: License,
    #[serde(with = "bytes_as_base64::fixed64")]
    pub signature: [u8; 64],
}

/// The narrowed constraint set a successful [`License::verify`] /
/// [`LicenseSigned::verify`] produces: the overlap timespan and, when
/// collecting, the dependency chain a new sub-License should carry
/// (§4.5 step 7).
#[derive(Debug, Clone, Default)]
pub struct VerifiedConstraints {
    pub timespan: Option<Timespan>,
    pub dependencies: Vec<LicenseSigned>,
}

/// Parameters external to the License itself that `verify` needs: an
/// optional expected author pubkey, whether/how to perform DKIM
/// confirmation, externally supplied timespan/machine constraints to
/// narrow against, and the injected DNS/machine-identity collaborators.
#[derive(Default, Clone, Copy)]
pub struct VerifyContext<'a> {
    pub author_pubkey: Option<[u8; 32]>,
    /// `None` defaults to performing DKIM confirmation (§4.5 step 2); `Some(false)` skips it.
    pub confirm: Option<bool>,
    pub timespan_constraint: Option<Timespan>,
    pub machine_constraint: Option<MachineSpec>,
    pub resolver: Option<&'a dyn TxtResolver>,
    pub machine: Option<&'a dyn MachineIdProvider>,
}

impl<'a> VerifyContext<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: &'a dyn TxtResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_machine(mut self, machine: &'a dyn MachineIdProvider) -> Self {
        self.machine = Some(machine);
        self
    }

    #[must_use]
    pub fn no_confirm(mut self) -> Self {
        self.confirm = Some(false);
        self
    }
}

impl License {
    /// Constructs and immediately verifies a License (§3 invariant: "a
    /// License is constructible only if it passes §4.5 verification").
    /// There is no signature yet at this point, so step 3 (self-signature
    /// check) is skipped; dependencies are still fully verified recursively.
    pub fn new(
        author: Agent,
        client: Option<Agent>,
        dependencies: Option<Vec<LicenseSigned>>,
        machine: Option<MachineSpec>,
        timespan: Option<Timespan>,
        grant: Option<Grant>,
        ctx: &VerifyContext<'_>,
    ) -> Result<(Self, VerifiedConstraints)> {
        let license =
            Self { author, client, dependencies, machine, timespan: timespan.filter(|t| !t.is_empty()), grant: grant.filter(|g| !g.is_empty()) };
        let verified = license.verify(None, ctx)?;
        Ok((license, verified))
    }

    /// Runs §4.5 steps 1, 2, 4, 5, 6 against this License, optionally
    /// including step 3 (self-signature) when `signature` is given.
    pub fn verify(&self, signature: Option<&[u8; 64]>, ctx: &VerifyContext<'_>) -> Result<VerifiedConstraints> {
        // Step 1: author pubkey match.
        if let Some(expected) = ctx.author_pubkey {
            if self.author.pubkey != Some(expected) {
                return Err(LicenseError::InvalidField {
                    field: "author.pubkey".into(),
                    detail: "does not match the expected author public key".into(),
                    context: None,
                });
            }
        }

        // Step 2: DKIM confirmation.
        let confirm = ctx.confirm.unwrap_or(true);
        if confirm {
            match ctx.resolver {
                Some(resolver) => {
                    let confirmed = dkim::confirm_pubkey(&self.author, resolver)?;
                    if Some(confirmed) != self.author.pubkey {
                        return Err(LicenseError::DkimLookupFailed {
                            detail: "DKIM-published pubkey does not match license author pubkey".into(),
                            context: None,
                        });
                    }
                },
                None if self.author.pubkey.is_none() => {
                    return Err(LicenseError::DkimLookupFailed {
                        detail: "DKIM confirmation requested but no resolver was supplied".into(),
                        context: None,
                    });
                },
                None => {},
            }
        }

        // Step 3: signature check, only when a signature is supplied.
        if let Some(sig) = signature {
            let vk = self.author.pubkey.ok_or_else(|| LicenseError::InvalidField {
                field: "author.pubkey".into(),
                detail: "cannot verify a signature without an author public key".into(),
                context: None,
            })?;
            let canonical = to_canonical_bytes(self)?;
            keys::verify_strict(sig, &canonical, &vk)?;
        }

        // Step 4: dependency verification, strictly depth-first left-to-right.
        let mut start = self.timespan.as_ref().and_then(|t| t.start);
        let mut length = self.timespan.as_ref().and_then(|t| t.length);

        if let Some(dependencies) = &self.dependencies {
            for dep in dependencies {
                let dep_ctx = VerifyContext {
                    author_pubkey: None,
                    confirm: ctx.confirm,
                    timespan_constraint: None,
                    machine_constraint: None,
                    resolver: ctx.resolver,
                    machine: ctx.machine,
                };
                let dep_verified = dep.verify(&dep_ctx)?;

                if let Some(client_pubkey) = dep.license.client.as_ref().and_then(|c| c.pubkey) {
                    if Some(client_pubkey) != self.author.pubkey {
                        return Err(LicenseError::ChainBroken {
                            detail: format!(
                                "dependency's client pubkey does not match this license's author pubkey ({})",
                                dep.license.author.name
                            )
                            .into(),
                            context: None,
                        });
                    }
                }

                let dep_timespan = dep_verified.timespan.unwrap_or_default();
                let (narrowed_start, narrowed_length) = overlap_intersect(start, length, &dep_timespan);
                if narrowed_length.is_some_and(Duration::is_zero) {
                    return Err(incompatible_timespan(&dep.license.author.name, product_of(&dep.license.author)));
                }
                start = narrowed_start;
                length = narrowed_length;
            }
        }

        // Step 5: timespan constraint passed in by the caller.
        if let Some(constraint) = &ctx.timespan_constraint {
            let (narrowed_start, narrowed_length) = overlap_intersect(start, length, constraint);
            if narrowed_length.is_some_and(Duration::is_zero) {
                return Err(incompatible_timespan(&self.author.name, product_of(&self.author)));
            }
            start = narrowed_start;
            length = narrowed_length;
        }

        // Step 6: machine check.
        if self.machine.is_some() || ctx.machine_constraint.is_some() {
            if let Some(provider) = ctx.machine {
                let detected = provider.machine_uuid().map_err(|detail| LicenseError::MachineMismatch {
                    required: "a local machine identity".into(),
                    detected: detail.into(),
                    context: Some("obtaining machine_uuid()".into()),
                })?;

                if let Some(spec) = self.machine {
                    if !spec.matches(detected) {
                        return Err(LicenseError::MachineMismatch {
                            required: format!("{spec:?}").into(),
                            detected: detected.to_string().into(),
                            context: None,
                        });
                    }
                }
                if let Some(spec) = &ctx.machine_constraint {
                    if !spec.matches(detected) {
                        return Err(LicenseError::MachineMismatch {
                            required: format!("{spec:?}").into(),
                            detected: detected.to_string().into(),
                            context: Some("constraint-supplied machine requirement".into()),
                        });
                    }
                }
            }
            // `ctx.machine == None` means machine checking is explicitly
            // suppressed; §4.5 step 6 says to skip entirely in that case.
        }

        Ok(VerifiedConstraints { timespan: Timespan::new(start, length).ok(), dependencies: Vec::new() })
    }

    /// Signs the canonical serialization of this License, producing a
    /// [`LicenseSigned`] (`Verified -> Signed`, §4.5 "State machine").
    pub fn sign(self, sk: &[u8]) -> Result<LicenseSigned> {
        let canonical = to_canonical_bytes(&self)?;
        let signature = keys::sign(&canonical, sk)?;
        Ok(LicenseSigned { license: self, signature })
    }
}

fn product_of(agent: &Agent) -> &str {
    agent.product.as_deref().unwrap_or("<unknown product>")
}

fn incompatible_timespan(author: &str, product: &str) -> LicenseError {
    LicenseError::IncompatibleTimespan {
        author: author.to_owned().into(),
        product: product.to_owned().into(),
        detail: "overlap narrowed to zero length".into(),
        context: None,
    }
}

impl LicenseSigned {
    /// Runs §4.5 steps 1-6 against `self.license`, including the
    /// self-signature check (step 3) since `self.signature` is always known.
    pub fn verify(&self, ctx: &VerifyContext<'_>) -> Result<VerifiedConstraints> {
        self.license.verify(Some(&self.signature), ctx)
    }

    /// As [`LicenseSigned::verify`], but additionally appends `self` to the
    /// returned dependency list (§4.5 step 7, `dependencies=True`), so the
    /// caller can feed the result directly into [`License::new`] for a
    /// sub-License.
    pub fn verify_collecting(&self, ctx: &VerifyContext<'_>) -> Result<VerifiedConstraints> {
        let mut verified = self.verify(ctx)?;
        verified.dependencies.push(self.clone());
        Ok(verified)
    }
}

/// Builds, verifies, and signs a License in one call.
#[allow(clippy::too_many_arguments)]
pub fn issue(
    author: Agent,
    client: Option<Agent>,
    dependencies: Option<Vec<LicenseSigned>>,
    machine: Option<MachineSpec>,
    timespan: Option<Timespan>,
    grant: Option<Grant>,
    sk: &[u8],
    ctx: &VerifyContext<'_>,
) -> Result<LicenseSigned> {
    let (license, _) = License::new(author, client, dependencies, machine, timespan, grant, ctx)?;
    license.sign(sk)
}

/// Verifies an already-parsed [`LicenseSigned`].
pub fn verify(signed: &LicenseSigned, ctx: &VerifyContext<'_>) -> Result<VerifiedConstraints> {
    signed.verify(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    fn self_issued_fixture() -> (License, [u8; 64]) {
        let (vk, sk) = keypair_from_seed([0u8; 32]);
        let author =
            Agent::new("End User (self-issued)", Some("b.c".into()), Some("Something".into()), None, Some(vk))
                .unwrap();
        let client = Agent::new("End User", None, None, None, Some(vk)).unwrap();
        let mut grant_map = serde_json::Map::new();
        grant_map.insert("some".to_owned(), serde_json::json!({"capability": 1}));
        let grant = Grant::try_from_value(grant_map).unwrap();

        let ctx = VerifyContext::new().no_confirm();
        let (license, _) = License::new(author, Some(client), None, None, None, Some(grant), &ctx).unwrap();
        (license, sk)
    }

    #[test]
    fn self_issued_license_signs_and_reverifies() {
        let (license, sk) = self_issued_fixture();
        let signed = license.sign(&sk).unwrap();

        let ctx = VerifyContext::new().no_confirm();
        assert!(signed.verify(&ctx).is_ok());

        let mut tampered = signed.clone();
        tampered.license.grant = None;
        assert!(tampered.verify(&ctx).is_err());
    }

    #[test]
    fn dependency_chain_requires_matching_client_pubkey() {
        let (parent, sk) = self_issued_fixture();
        let parent_signed = parent.sign(&sk).unwrap();

        let (child_author_vk, _) = keypair_from_seed([9u8; 32]);
        let child_author = Agent::new("Child", None, None, None, Some(child_author_vk)).unwrap();
        let ctx = VerifyContext::new().no_confirm();

        // parent's client pubkey is the original self-issued vk, not child_author_vk: broken chain.
        let result = License::new(child_author, None, Some(vec![parent_signed]), None, None, None, &ctx);
        assert!(matches!(result, Err(LicenseError::ChainBroken { .. })));
    }

    #[test]
    fn dependency_chain_succeeds_when_client_matches_author() {
        let (parent, sk) = self_issued_fixture();
        let (grandchild_vk, _) = keypair_from_seed([9u8; 32]);
        let mut parent_for_child = parent.clone();
        parent_for_child.client = Some(Agent::new("Child", None, None, None, Some(grandchild_vk)).unwrap());
        let parent_signed = parent_for_child.sign(&sk).unwrap();

        let child_author = Agent::new("Child", None, None, None, Some(grandchild_vk)).unwrap();
        let ctx = VerifyContext::new().no_confirm();
        let result = License::new(child_author, None, Some(vec![parent_signed]), None, None, None, &ctx);
        assert!(result.is_ok());
    }

    #[test]
    fn incompatible_dependency_timespans_are_rejected() {
        let (vk, sk) = keypair_from_seed([3u8; 32]);
        let author = Agent::new("Author", None, None, None, Some(vk)).unwrap();
        let ctx = VerifyContext::new().no_confirm();

        let early = Timespan::new(
            Some(Timestamp::parse("2020-01-01 00:00:00+00:00").unwrap()),
            Some(Duration::from_seconds(86_400)),
        )
        .unwrap();
        let (early_license, _) =
            License::new(author.clone(), Some(author.clone()), None, None, Some(early), None, &ctx).unwrap();
        let early_signed = early_license.sign(&sk).unwrap();

        let late = Timespan::new(
            Some(Timestamp::parse("2021-01-01 00:00:00+00:00").unwrap()),
            Some(Duration::from_seconds(86_400)),
        )
        .unwrap();
        let result =
            License::new(author.clone(), None, Some(vec![early_signed]), None, Some(late), None, &ctx);
        assert!(matches!(result, Err(LicenseError::IncompatibleTimespan { .. })));
    }
}
