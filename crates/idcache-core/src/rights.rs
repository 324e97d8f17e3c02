//! Rights decoding: integer bit flags to capability sets.
//!
//! The identity service encodes the rights a user holds on a permission as a
//! small integer where each bit grants one [`Capability`]. In memory the same
//! information is held as a [`CapabilitySet`], which only ever records the
//! capabilities that are granted.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use bitflags::bitflags;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::types::{EntityRightsMap, PermissionMap, RawPermissions, RawRights, ALL_ENTITIES};

bitflags! {
    /// Wire representation of a permission's rights.
    ///
    /// | Bit    | Capability |
    /// |--------|------------|
    /// | `0x01` | create     |
    /// | `0x02` | read       |
    /// | `0x04` | update     |
    /// | `0x08` | delete     |
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Rights: u32 {
        const CREATE = 0x01;
        const READ   = 0x02;
        const UPDATE = 0x04;
        const DELETE = 0x08;
    }
}

/// One grantable action on a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Create,
    Read,
    Update,
    Delete,
}

impl Capability {
    /// All capabilities in bit order.
    pub const ALL: [Capability; 4] = [
        Capability::Create,
        Capability::Read,
        Capability::Update,
        Capability::Delete,
    ];

    /// The wire bit for this capability.
    pub const fn bit(self) -> Rights {
        match self {
            Capability::Create => Rights::CREATE,
            Capability::Read => Rights::READ,
            Capability::Update => Rights::UPDATE,
            Capability::Delete => Rights::DELETE,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Capability::Create => "create",
            Capability::Read => "read",
            Capability::Update => "update",
            Capability::Delete => "delete",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of capabilities granted on one entity.
///
/// Absence is the negative signal: a capability that is not granted is simply
/// not in the set. Serializes as `{"create": true, "read": true}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// Create an empty set (grants nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Every capability.
    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Decode a raw integer. Bits outside the four known flags are ignored.
    pub fn from_bits(value: u32) -> Self {
        Self::from(Rights::from_bits_truncate(value))
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Grant a capability. Returns `false` if it was already granted.
    pub fn insert(&mut self, capability: Capability) -> bool {
        self.0.insert(capability)
    }

    /// Withdraw a capability. Returns `true` if it was granted.
    pub fn remove(&mut self, capability: Capability) -> bool {
        self.0.remove(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate granted capabilities in bit order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn can_create(&self) -> bool {
        self.contains(Capability::Create)
    }

    pub fn can_read(&self) -> bool {
        self.contains(Capability::Read)
    }

    pub fn can_update(&self) -> bool {
        self.contains(Capability::Update)
    }

    pub fn can_delete(&self) -> bool {
        self.contains(Capability::Delete)
    }
}

impl From<Rights> for CapabilitySet {
    fn from(rights: Rights) -> Self {
        Capability::ALL
            .into_iter()
            .filter(|capability| rights.contains(capability.bit()))
            .collect()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for CapabilitySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for capability in &self.0 {
            map.serialize_entry(capability, &true)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CapabilitySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // `false` entries are dropped so the set never records a denial.
        let flags = BTreeMap::<Capability, bool>::deserialize(deserializer)?;
        Ok(flags
            .into_iter()
            .filter_map(|(capability, granted)| granted.then_some(capability))
            .collect())
    }
}

/// Decode a single raw rights value.
pub fn decode_rights(value: u32) -> CapabilitySet {
    CapabilitySet::from_bits(value)
}

/// Decode a raw permission map into its in-memory form.
///
/// Both wire shapes are accepted: a bare integer applies to
/// [`ALL_ENTITIES`], a nested map is decoded per entity.
pub fn decode_permissions(raw: &RawPermissions) -> PermissionMap {
    raw.iter()
        .map(|(name, rights)| (name.clone(), decode_entity_rights(rights)))
        .collect()
}

fn decode_entity_rights(rights: &RawRights) -> EntityRightsMap {
    match rights {
        RawRights::Flat(value) => {
            let mut entities = EntityRightsMap::new();
            entities.insert(ALL_ENTITIES.to_string(), decode_rights(*value));
            entities
        }
        RawRights::Scoped(by_entity) => by_entity
            .iter()
            .map(|(entity, value)| (entity.clone(), decode_rights(*value)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_examples() {
        let set = decode_rights(0x05);
        assert!(set.can_create());
        assert!(set.can_update());
        assert!(!set.can_read());
        assert!(!set.can_delete());
        assert_eq!(set.len(), 2);

        assert!(decode_rights(0).is_empty());
        assert_eq!(decode_rights(0x0F), CapabilitySet::all());
    }

    #[test]
    fn test_unknown_bits_ignored() {
        assert_eq!(decode_rights(0xF0), CapabilitySet::new());
        assert_eq!(decode_rights(0x12), decode_rights(0x02));
    }

    #[test]
    fn test_serializes_as_true_map() {
        let json = serde_json::to_value(decode_rights(0x03)).unwrap();
        assert_eq!(json, serde_json::json!({ "create": true, "read": true }));

        let empty = serde_json::to_value(CapabilitySet::new()).unwrap();
        assert_eq!(empty, serde_json::json!({}));
    }

    #[test]
    fn test_deserialize_drops_false_entries() {
        let set: CapabilitySet =
            serde_json::from_value(serde_json::json!({ "read": true, "delete": false })).unwrap();
        assert_eq!(set, [Capability::Read].into_iter().collect());
    }

    #[test]
    fn test_decode_permissions_both_shapes() {
        let raw: RawPermissions = serde_json::from_value(serde_json::json!({
            "docs": { "e1": 3, "e2": 0 },
            "billing": 8,
        }))
        .unwrap();

        let map = decode_permissions(&raw);

        assert_eq!(map["docs"]["e1"], decode_rights(0x03));
        assert!(map["docs"]["e2"].is_empty());
        assert_eq!(map["billing"][ALL_ENTITIES], decode_rights(0x08));
    }

    #[test]
    fn test_empty_entity_map_kept() {
        let raw: RawPermissions =
            serde_json::from_value(serde_json::json!({ "docs": {} })).unwrap();
        let map = decode_permissions(&raw);
        assert!(map.contains_key("docs"));
        assert!(map["docs"].is_empty());
    }

    proptest! {
        #[test]
        fn decode_matches_bits(value in any::<u32>()) {
            let set = decode_rights(value);
            for capability in Capability::ALL {
                let bit_set = value & capability.bit().bits() != 0;
                prop_assert_eq!(set.contains(capability), bit_set);
            }
        }
    }
}
