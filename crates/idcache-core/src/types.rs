//! Permission map types, in their wire and in-memory forms.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rights::CapabilitySet;

/// Reserved entity id meaning "every entity under this permission name".
pub const ALL_ENTITIES: &str = "*";

/// Entity id -> granted capabilities.
pub type EntityRightsMap = BTreeMap<String, CapabilitySet>;

/// Permission name -> per-entity rights.
pub type PermissionMap = BTreeMap<String, EntityRightsMap>;

/// Raw rights for one permission name, as sent by the identity service.
///
/// Older deployments send a single integer per permission; newer ones send
/// one integer per entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRights {
    /// One value covering all entities.
    Flat(u32),
    /// Entity id -> value.
    Scoped(BTreeMap<String, u32>),
}

impl RawRights {
    /// Rights on a single entity.
    pub fn entity(entity: impl Into<String>, value: u32) -> Self {
        let mut by_entity = BTreeMap::new();
        by_entity.insert(entity.into(), value);
        RawRights::Scoped(by_entity)
    }
}

/// Permission name -> raw rights.
pub type RawPermissions = BTreeMap<String, RawRights>;
