//! DKIM-style public-key retrieval (§4.4).
//!
//! The core never performs DNS I/O itself — it consumes a [`TxtResolver`]
//! implementation supplied by the caller (the CLI wires a
//! `hickory-resolver`-backed one; tests use an in-memory fake).

use crate::agent::Agent;
use crate::error::{LicenseError, Result};
use base64::{Engine as _, engine::general_purpose};

/// A DNS TXT lookup function, injected by the caller per the core's external
/// interface (spec component ii): `resolve_txt(name) -> list<string>`.
pub trait TxtResolver {
    /// Returns the TXT record strings for `name`, or an error on any DNS or
    /// transport failure (including timeout).
    fn resolve_txt(&self, name: &str) -> std::result::Result<Vec<String>, String>;
}

/// Looks up and validates the DKIM TXT record for `agent`, returning the
/// 32-byte Ed25519 public key it publishes.
///
/// Requires exactly one TXT record, `v=DKIM1`, `k=ed25519`, and a well-formed
/// `p=<base64>` of exactly 32 bytes. Any deviation is [`LicenseError::DkimLookupFailed`].
pub fn confirm_pubkey(agent: &Agent, resolver: &dyn TxtResolver) -> Result<[u8; 32]> {
    let path = agent.dkim_path().ok_or_else(|| LicenseError::DkimLookupFailed {
        detail: "agent has neither a pubkey nor a domain + product/service".into(),
        context: None,
    })?;

    tracing::debug!(domain = ?agent.domain, service = ?agent.service, path = %path, "querying DKIM TXT record");

    let records = resolver.resolve_txt(&path).map_err(|detail| LicenseError::DkimLookupFailed {
        detail: detail.into(),
        context: Some(format!("querying {path}").into()),
    })?;

    if records.len() != 1 {
        return Err(LicenseError::DkimLookupFailed {
            detail: format!("expected exactly one TXT record at {path}, got {}", records.len()).into(),
            context: None,
        });
    }

    parse_dkim_record(&records[0])
}

/// Parses a single DKIM TXT record's content per RFC 6376: adjacent quoted
/// segments collapsed by the caller into one string, tokens split on `;`,
/// each trimmed and split on `=` at most once.
pub fn parse_dkim_record(record: &str) -> Result<[u8; 32]> {
    let mut version_ok = false;
    let mut key_type_ok = false;
    let mut pubkey: Option<[u8; 32]> = None;

    for token in record.split(';') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        match key.trim() {
            "v" if value.trim() == "DKIM1" => version_ok = true,
            "k" if value.trim() == "ed25519" => key_type_ok = true,
            "p" => {
                let bytes = general_purpose::STANDARD.decode(value.trim()).map_err(|e| {
                    LicenseError::DkimLookupFailed {
                        detail: format!("malformed base64 in p=: {e}").into(),
                        context: None,
                    }
                })?;
                let array = <[u8; 32]>::try_from(bytes).map_err(|b| LicenseError::DkimLookupFailed {
                    detail: format!("expected a 32-byte public key, got {} bytes", b.len()).into(),
                    context: None,
                })?;
                pubkey = Some(array);
            },
            _ => {},
        }
    }

    if !version_ok {
        return Err(LicenseError::DkimLookupFailed { detail: "missing or wrong v=DKIM1".into(), context: None });
    }
    if !key_type_ok {
        return Err(LicenseError::DkimLookupFailed { detail: "missing or wrong k=ed25519".into(), context: None });
    }
    pubkey.ok_or_else(|| LicenseError::DkimLookupFailed { detail: "missing p=".into(), context: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeResolver(Vec<String>);
    impl TxtResolver for FakeResolver {
        fn resolve_txt(&self, _name: &str) -> std::result::Result<Vec<String>, String> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn scenario_dkim_discovery() {
        let record = "v=DKIM1; k=ed25519; p=5cijeUNWyR1mvbIJpqNmUJ6V4Od7vPEgVWOEjxiim8w=";
        let pubkey = parse_dkim_record(record).unwrap();
        let expected = general_purpose::STANDARD.decode("5cijeUNWyR1mvbIJpqNmUJ6V4Od7vPEgVWOEjxiim8w=").unwrap();
        assert_eq!(pubkey.as_slice(), expected.as_slice());
    }

    #[test]
    fn rejects_multiple_records() {
        let agent = Agent::new("a", Some("b.c".into()), Some("Something".into()), None, None).unwrap();
        let resolver = FakeResolver(vec!["v=DKIM1; k=ed25519; p=AAA=".into(), "v=DKIM1; k=ed25519; p=BBB=".into()]);
        assert!(confirm_pubkey(&agent, &resolver).is_err());
    }
}
