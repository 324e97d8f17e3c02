//! Rights decode vectors.
//!
//! Fixed wire values with the capability sets they must decode to.

use idcache_core::{decode_rights, Capability, CapabilitySet};

/// A decode test vector.
#[derive(Debug, Clone)]
pub struct RightsVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Raw rights value as sent by the identity service.
    pub bits: u32,
    /// Capabilities the value must decode to.
    pub expected: &'static [Capability],
}

impl RightsVector {
    pub fn expected_set(&self) -> CapabilitySet {
        self.expected.iter().copied().collect()
    }
}

/// Get all decode vectors.
pub fn all_vectors() -> Vec<RightsVector> {
    use Capability::*;
    vec![
        RightsVector {
            name: "no rights",
            bits: 0x00,
            expected: &[],
        },
        RightsVector {
            name: "create only",
            bits: 0x01,
            expected: &[Create],
        },
        RightsVector {
            name: "read only",
            bits: 0x02,
            expected: &[Read],
        },
        RightsVector {
            name: "create and read",
            bits: 0x03,
            expected: &[Create, Read],
        },
        RightsVector {
            name: "update only",
            bits: 0x04,
            expected: &[Update],
        },
        RightsVector {
            name: "delete only",
            bits: 0x08,
            expected: &[Delete],
        },
        RightsVector {
            name: "read and delete",
            bits: 0x0A,
            expected: &[Read, Delete],
        },
        RightsVector {
            name: "all rights",
            bits: 0x0F,
            expected: &[Create, Read, Update, Delete],
        },
        RightsVector {
            name: "unknown high bits ignored",
            bits: 0xF0,
            expected: &[],
        },
        RightsVector {
            name: "unknown bits beside read",
            bits: 0x102,
            expected: &[Read],
        },
        RightsVector {
            name: "every bit set",
            bits: u32::MAX,
            expected: &[Create, Read, Update, Delete],
        },
    ]
}

/// Decode every vector and report whether it matched.
pub fn verify_all_vectors() -> Vec<(String, bool)> {
    all_vectors()
        .iter()
        .map(|v| (v.name.to_string(), decode_rights(v.bits) == v.expected_set()))
        .collect()
}
