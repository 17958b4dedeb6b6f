//! Machine identity (§4.5 step 6, spec external collaborator iii): prefers
//! the host's `/etc/machine-id` when readable, otherwise derives a stable
//! UUIDv4 from a hardware fingerprint via `machineid-rs`, restoring the
//! original implementation's `machine_UUIDv4` strategy (SPEC_FULL.md
//! "machine_UUIDv4 derivation strategy"). Either way the result is forced
//! into RFC 4122 v4 shape, since neither source is already one.

use licensing_core::machine::{MachineIdProvider, force_rfc4122_v4};
use machineid_rs::{Encryption, HWIDComponent, IdBuilder};
use uuid::Uuid;

const MACHINE_ID_PATH: &str = "/etc/machine-id";

pub struct LocalMachine;

impl LocalMachine {
    fn from_machine_id_file() -> Option<[u8; 16]> {
        let text = std::fs::read_to_string(MACHINE_ID_PATH).ok()?;
        let decoded = hex::decode(text.trim()).ok()?;
        decoded.try_into().ok()
    }

    fn from_hardware_fingerprint() -> Result<[u8; 16], String> {
        let mut builder = IdBuilder::new(Encryption::SHA256);
        builder
            .add_component(HWIDComponent::SystemID)
            .add_component(HWIDComponent::CPUCores)
            .add_component(HWIDComponent::MacAddress);

        let fingerprint = builder.build("crypto-licensing").map_err(|error| error.to_string())?;
        let digest = hex::decode(&fingerprint).unwrap_or_else(|_| fingerprint.into_bytes());

        let mut bytes = [0u8; 16];
        for (i, byte) in digest.iter().enumerate().take(16) {
            bytes[i] = *byte;
        }
        Ok(bytes)
    }
}

impl MachineIdProvider for LocalMachine {
    fn machine_uuid(&self) -> Result<Uuid, String> {
        let bytes = match Self::from_machine_id_file() {
            Some(bytes) => bytes,
            None => Self::from_hardware_fingerprint()?,
        };
        Ok(force_rfc4122_v4(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_a_valid_v4_uuid() {
        let uuid = LocalMachine.machine_uuid().unwrap();
        assert_eq!(uuid.get_version_num(), 4);
    }

    #[test]
    fn hardware_fingerprint_is_always_16_bytes() {
        let bytes = LocalMachine::from_hardware_fingerprint().unwrap();
        assert_eq!(bytes.len(), 16);
    }
}
