//! Agent identities: authors and clients (§3 "Agent").

use crate::canonical::bytes_as_base64;
use crate::error::{LicenseError, Result};
use serde::{Deserialize, Serialize};

/// A named identity with an Ed25519 public key.
///
/// Either `pubkey` is given directly, or `domain` plus one of
/// `product`/`service` is — enough to perform a DKIM lookup (§3, §4.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Agent {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub service: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "self::optional_pubkey"
    )]
    pub pubkey: Option<[u8; 32]>,
}

impl Agent {
    /// Constructs an Agent, enforcing the pubkey-or-domain invariant.
    ///
    /// `service` is left as given — `None` unless the caller explicitly
    /// supplies one — and is never populated from `product` here, so a
    /// constructed-but-unconfirmed Agent serializes identically to one
    /// parsed straight off the wire. `product` alone is sufficient to
    /// satisfy the invariant, since [`Agent::dkim_path`] derives the DNS
    /// service label from it lazily, only when a lookup is actually
    /// performed.
    pub fn new(
        name: impl Into<String>,
        domain: Option<String>,
        product: Option<String>,
        service: Option<String>,
        pubkey: Option<[u8; 32]>,
    ) -> Result<Self> {
        if pubkey.is_none() && (domain.is_none() || (product.is_none() && service.is_none())) {
            return Err(LicenseError::InvalidField {
                field: "agent".into(),
                detail: "either a pubkey or a domain plus product/service must be provided".into(),
                context: None,
            });
        }
        Ok(Self { name: name.into(), domain, product, service, pubkey })
    }

    /// The DKIM DNS path this Agent's public key would be published at, if
    /// `domain` is present and a service label can be determined — either
    /// given explicitly or derived from `product` on the fly (§4.4).
    #[must_use]
    pub fn dkim_path(&self) -> Option<String> {
        let domain = self.domain.as_deref()?;
        let service = self
            .service
            .clone()
            .or_else(|| self.product.as_deref().map(domainkey_service))?;
        Some(format!("{service}.crypto-licensing._domainkey.{domain}."))
    }
}

/// Converts a product name into a DNS-safe service label: lowercase,
/// IDNA-encoded, with `{space, '.', '_', '/'}` replaced by `'-'`.
///
/// ```
/// use licensing_core::agent::domainkey_service;
/// assert_eq!(domainkey_service("a/b.c_d e"), "a-b-c-d-e");
/// assert_eq!(domainkey_service("Something Awesome v1.0"), "something-awesome-v1-0");
/// ```
#[must_use]
pub fn domainkey_service(product: &str) -> String {
    let ascii = idna::domain_to_ascii(product).unwrap_or_else(|_| product.to_owned());
    ascii
        .chars()
        .map(|c| match c {
            ' ' | '.' | '_' | '/' => '-',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

mod optional_pubkey {
    use super::bytes_as_base64;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_label_translation() {
        assert_eq!(domainkey_service("a/b.c_d e"), "a-b-c-d-e");
    }

    #[test]
    fn requires_pubkey_or_domain() {
        assert!(Agent::new("x", None, None, None, None).is_err());
        assert!(Agent::new("x", Some("b.c".into()), Some("P".into()), None, None).is_ok());
        assert!(Agent::new("x", None, None, None, Some([0u8; 32])).is_ok());
    }
}
