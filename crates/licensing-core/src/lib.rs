//! # licensing-core
//!
//! Issues, distributes, and verifies cryptographically signed software
//! licenses. An Author, identified by an Ed25519 public key published in DNS
//! (DKIM-style TXT record), signs a [`License`](license::License) describing
//! the product, an optional Client, a validity [`Timespan`](timestamp::Timespan), an
//! optional target Machine, a set of opaque [`Grant`](grant::Grant)s, and a list of
//! dependency licenses. Clients may sub-license: re-sign a narrower license
//! with their own Ed25519 key, as long as it stays within the bounds of every
//! dependency.
//!
//! ## Layout
//!
//! * [`canonical`] — the sorted-key, whitespace-free JSON pre-image every
//!   signature is computed over.
//! * [`timestamp`] — `Timestamp`, `Duration`, `Timespan`, and the overlap
//!   intersection algorithm dependency-chain validation rests on.
//! * [`agent`] — `Agent`, the named, keyed identity of an author or client.
//! * [`grant`] — the opaque capability mapping a License carries.
//! * [`keys`] — Ed25519 keypair derivation, signing, and verification.
//! * [`dkim`] — DNS TXT public-key confirmation, against an injected
//!   [`dkim::TxtResolver`].
//! * [`machine`] — machine-binding constraints, against an injected
//!   [`machine::MachineIdProvider`].
//! * [`license`] — `License`/`LicenseSigned` and the full §4.5 verification
//!   algorithm.
//! * [`keypair_at_rest`] — plaintext and `ChaCha20Poly1305`-encrypted keypair
//!   containers.
//! * [`resolver`] — the `check`/`authorize` file-matching algorithm, generic
//!   over an injected [`resolver::Discovery`].
//!
//! This crate performs no filesystem or network I/O of its own: every
//! external effect (DNS lookups, file discovery, machine identity, the
//! clock) is consumed through a trait supplied by the caller. `apps/cli`
//! wires the concrete implementations.

pub mod agent;
pub mod canonical;
pub mod dkim;
mod error;
pub mod grant;
pub mod keypair_at_rest;
pub mod keys;
pub mod license;
pub mod machine;
pub mod resolver;
pub mod timestamp;

pub use crate::error::{LicenseError, LicenseErrorExt, Result};
