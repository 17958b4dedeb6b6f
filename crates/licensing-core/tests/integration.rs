//! Integration tests exercising the bit-exact testable-properties scenarios,
//! end-to-end across modules rather than in isolation.

use licensing_core::agent::{Agent, domainkey_service};
use licensing_core::canonical::to_canonical_json;
use licensing_core::dkim::parse_dkim_record;
use licensing_core::grant::Grant;
use licensing_core::keys::keypair_from_seed;
use licensing_core::license::{License, LicenseSigned, VerifyContext};
use licensing_core::resolver::{self, Discovery, RawCandidate, ResolveContext};
use licensing_core::timestamp::{Duration, Timespan, Timestamp, overlap_intersect};
use std::cell::RefCell;

const SCENARIO_1_JSON: &str = r#"{"license":{"author":{"domain":"b.c","name":"End User (self-issued)","product":"Something","pubkey":"O2onvM62pC1io6jQKm8Nc2UyFXcd4kOmOsBIoYtZ2ik="},"client":{"name":"End User","pubkey":"O2onvM62pC1io6jQKm8Nc2UyFXcd4kOmOsBIoYtZ2ik="},"grant":{"some":{"capability":1}}},"signature":"Q4PtEkyTQ2ufHKTrkP495tQ9wCkJwriVu0T84/Wwo49Bixpo7L7fEaItH8hVfKHhtWE9TNPU9oArRBnSYw14Bw=="}"#;

/// §8 scenario 1 / §6's bit-exact `LicenseSigned` example: a self-issued
/// license with no DKIM confirmation must parse and verify as-is.
#[test]
fn bit_exact_self_issued_license_verifies() {
    let signed: LicenseSigned = serde_json::from_str(SCENARIO_1_JSON).expect("fixture parses");
    let ctx = VerifyContext::new().no_confirm();
    signed.verify(&ctx).expect("fixture signature verifies under the license's own author pubkey");

    // The re-serialized license must reproduce the exact canonical form, key
    // order and all, proving our serializer is the one the signature was
    // computed over.
    let re_encoded = to_canonical_json(&signed).unwrap();
    assert_eq!(re_encoded, SCENARIO_1_JSON);
}

/// §8 scenario 1, built from fields via `Agent::new`/`License::new` rather
/// than parsed off the wire, reproducing the exact published signature.
/// This is what actually exercises `Agent::new`'s invariant handling: a
/// constructed author carrying `product` but no explicit `service` must
/// serialize with `service` absent, not derived, or the canonical
/// pre-image — and therefore the signature — would differ from the fixture.
#[test]
fn scenario_1_constructed_from_fields_matches_published_signature() {
    let (vk, sk) = keypair_from_seed([0u8; 32]);

    let author = Agent::new("End User (self-issued)", Some("b.c".into()), Some("Something".into()), None, Some(vk))
        .unwrap();
    let client = Agent::new("End User", None, None, None, Some(vk)).unwrap();

    let mut grant_map = serde_json::Map::new();
    grant_map.insert("some".to_owned(), serde_json::json!({"capability": 1}));
    let grant = Grant::try_from_value(grant_map).unwrap();

    let ctx = VerifyContext::new().no_confirm();
    let (license, _) = License::new(author, Some(client), None, None, None, Some(grant), &ctx).unwrap();
    let signed = license.sign(&sk).unwrap();

    assert_eq!(to_canonical_json(&signed).unwrap(), SCENARIO_1_JSON);
    assert_eq!(
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, signed.signature),
        "Q4PtEkyTQ2ufHKTrkP495tQ9wCkJwriVu0T84/Wwo49Bixpo7L7fEaItH8hVfKHhtWE9TNPU9oArRBnSYw14Bw=="
    );
}

/// §8 scenario 2: DKIM TXT record parsing for the published `crypto-licensing` key.
#[test]
fn dkim_txt_record_yields_published_pubkey() {
    let record = "v=DKIM1; k=ed25519; p=5cijeUNWyR1mvbIJpqNmUJ6V4Od7vPEgVWOEjxiim8w=";
    let pubkey = parse_dkim_record(record).unwrap();
    let expected =
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, "5cijeUNWyR1mvbIJpqNmUJ6V4Od7vPEgVWOEjxiim8w=")
            .unwrap();
    assert_eq!(pubkey.to_vec(), expected);
}

/// §8 scenario 3: service-label derivation.
#[test]
fn service_label_derivation_matches_spec_examples() {
    assert_eq!(domainkey_service("Something Awesome v1.0"), "something-awesome-v1-0");
    assert_eq!(domainkey_service("a/b.c_d e"), "a-b-c-d-e");
}

/// §8 scenario 4: overlap boundary — two back-to-back spans narrow to a
/// ~7-month window, and a third span entirely outside it fails.
///
/// Both spans are a fixed 2*365-day length rather than two calendar years;
/// since 2020 is a leap year, License A's end lands one day short of
/// 2022-01-01, narrowing the overlap to 2021-06-01..2021-12-31 (213 days)
/// rather than the full "1y, 7mo" a calendar-year reading of the inputs
/// might suggest.
#[test]
fn overlap_boundary_scenario() {
    let a = Timespan::new(
        Some(Timestamp::parse("2020-01-01 00:00:00+00:00").unwrap()),
        Some(Duration::from_seconds(2 * 365 * 24 * 60 * 60)),
    )
    .unwrap();
    let b = Timespan::new(
        Some(Timestamp::parse("2021-06-01 00:00:00+00:00").unwrap()),
        Some(Duration::from_seconds(2 * 365 * 24 * 60 * 60)),
    )
    .unwrap();

    let (start, length) = overlap_intersect(a.start, a.length, &b);
    assert_eq!(start, b.start);
    assert_eq!(Duration::from_seconds(213 * 24 * 60 * 60), length.unwrap());

    let c = Timespan::new(
        Some(Timestamp::parse("2024-01-01 00:00:00+00:00").unwrap()),
        Some(Duration::from_seconds(24 * 60 * 60)),
    )
    .unwrap();
    let (_, narrowed) = overlap_intersect(start, length, &c);
    assert!(narrowed.unwrap().is_zero(), "a span entirely after the running overlap must not intersect");
}

/// §8 scenario 6: the resolver issues exactly one sub-license for a local
/// keypair against a client-less parent license.
#[test]
fn resolver_issues_sub_license_end_to_end() {
    use licensing_core::agent::Agent;
    use licensing_core::canonical::to_canonical_json;
    use licensing_core::grant::Grant;
    use licensing_core::keypair_at_rest::KeypairPlaintext;
    use licensing_core::keys::keypair_from_seed;
    use licensing_core::license::License;

    let (vendor_vk, vendor_sk) = keypair_from_seed([11u8; 32]);
    let vendor = Agent::new("Vendor", None, None, None, Some(vendor_vk)).unwrap();
    let mut grant_map = serde_json::Map::new();
    grant_map.insert("some".to_owned(), serde_json::json!({"capability": 1}));
    let grant = Grant::try_from_value(grant_map).unwrap();

    let parent_ctx = VerifyContext::new().no_confirm();
    let (parent, _) = License::new(vendor, None, None, None, None, Some(grant), &parent_ctx).unwrap();
    let parent_signed = parent.sign(&vendor_sk).unwrap();
    let parent_json = to_canonical_json(&parent_signed).unwrap();

    let (_, client_sk) = keypair_from_seed([12u8; 32]);
    let client_keypair_json = to_canonical_json(&KeypairPlaintext::new(&hex::encode(client_sk), None).unwrap()).unwrap();

    struct MemoryDiscovery {
        keypairs: RefCell<Vec<RawCandidate>>,
        licenses: Vec<RawCandidate>,
    }
    impl Discovery for MemoryDiscovery {
        fn keypair_candidates(&self) -> licensing_core::Result<Vec<RawCandidate>> {
            Ok(self.keypairs.borrow().clone())
        }
        fn license_candidates(&self) -> licensing_core::Result<Vec<RawCandidate>> {
            Ok(self.licenses.clone())
        }
        fn persist_keypair(&self, content: &str) -> licensing_core::Result<String> {
            let origin = format!("memory://keypair-{}", self.keypairs.borrow().len());
            self.keypairs.borrow_mut().push((origin.clone(), content.to_owned()));
            Ok(origin)
        }
    }

    let discovery = MemoryDiscovery {
        keypairs: RefCell::new(vec![("client.crypto-keypair".to_owned(), client_keypair_json)]),
        licenses: vec![("vendor.crypto-license".to_owned(), parent_json)],
    };

    let ctx = ResolveContext { confirm: Some(false), ..ResolveContext::default() };
    let results = resolver::authorize(&discovery, &ctx).unwrap();

    assert_eq!(results.len(), 1);
    let (keypair, outcome) = &results[0];
    match outcome {
        resolver::Match::Issued(signed) => {
            assert_eq!(signed.license.author.pubkey, Some(keypair.vk()));
            let deps = signed.license.dependencies.as_ref().expect("sub-license carries its parent as a dependency");
            assert_eq!(deps.len(), 1);
            assert_eq!(deps[0].license.author.pubkey, Some(vendor_vk));
        },
        other => panic!("expected a freshly issued sub-license, got {other:?}"),
    }
}
