//! Machine binding (§3 "Machine", §4.5 step 6, §9 "machine = True sentinel").
//!
//! The core only consumes a machine-identity provider (spec external
//! collaborator iii); it never reads hardware itself. See `apps/cli`'s
//! `machineid-rs`-backed implementation for the concrete fingerprint
//! derivation, and [`force_rfc4122_v4`] for the bit-forcing helper that
//! implementation relies on.

use uuid::Uuid;

/// A machine-identity provider: `machine_uuid() -> UUIDv4`.
pub trait MachineIdProvider {
    fn machine_uuid(&self) -> std::result::Result<Uuid, String>;
}

/// A license's machine-binding constraint.
///
/// `Current` is the `machine = True` sentinel (§9): "bind to whichever
/// machine verification happens to run on", distinct from both `None`
/// (no binding) and a concrete recorded UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineSpec {
    Current,
    Concrete(Uuid),
}

impl MachineSpec {
    /// Returns `true` if this spec is satisfied by `detected`.
    #[must_use]
    pub fn matches(&self, detected: Uuid) -> bool {
        match self {
            MachineSpec::Current => true,
            MachineSpec::Concrete(uuid) => *uuid == detected,
        }
    }
}

impl serde::Serialize for MachineSpec {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MachineSpec::Current => s.serialize_bool(true),
            MachineSpec::Concrete(uuid) => s.serialize_str(&uuid.to_string()),
        }
    }
}

impl<'de> serde::Deserialize<'de> for MachineSpec {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        match value {
            serde_json::Value::Bool(true) => Ok(MachineSpec::Current),
            serde_json::Value::String(text) => {
                Uuid::parse_str(&text).map(MachineSpec::Concrete).map_err(serde::de::Error::custom)
            },
            other => Err(serde::de::Error::custom(format!("invalid machine spec: {other}"))),
        }
    }
}

/// Forces the version (4) and variant (RFC 4122) bits into a 16-byte buffer,
/// so a hardware-derived fingerprint reads as a valid UUIDv4 without
/// actually being randomly generated.
#[must_use]
pub fn force_rfc4122_v4(mut bytes: [u8; 16]) -> Uuid {
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_bytes_parse_as_v4() {
        let uuid = force_rfc4122_v4([0xffu8; 16]);
        assert_eq!(uuid.get_version_num(), 4);
    }

    #[test]
    fn current_sentinel_matches_any_detected_machine() {
        let detected = Uuid::from_bytes([1u8; 16]);
        assert!(MachineSpec::Current.matches(detected));
        assert!(!MachineSpec::Concrete(Uuid::from_bytes([2u8; 16])).matches(detected));
    }
}
