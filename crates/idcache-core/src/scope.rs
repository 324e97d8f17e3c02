//! Subscription scopes over a [`PermissionMap`].
//!
//! A scope names part of the permission map that an observer is interested
//! in: one permission name across all of its entities, or one permission name
//! on a single entity. The all-permissions scope is not a key; it is served
//! by the permission store directly.

use std::fmt;

use serde::Serialize;

use crate::rights::CapabilitySet;
use crate::types::{EntityRightsMap, PermissionMap, ALL_ENTITIES};

/// Key identifying a scoped subscription.
///
/// An entity equal to [`ALL_ENTITIES`] is normalized away, so
/// `ScopeKey::entity("docs", ALL_ENTITIES) == ScopeKey::name("docs")`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeKey {
    name: String,
    entity: Option<String>,
}

impl ScopeKey {
    /// All entities under a permission name.
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: None,
        }
    }

    /// One entity under a permission name.
    pub fn entity(name: impl Into<String>, entity: impl Into<String>) -> Self {
        let entity = entity.into();
        Self {
            name: name.into(),
            entity: (entity != ALL_ENTITIES).then_some(entity),
        }
    }

    /// Build from an optional entity id.
    pub fn new(name: impl Into<String>, entity: Option<&str>) -> Self {
        match entity {
            Some(entity) => Self::entity(name, entity),
            None => Self::name(name),
        }
    }

    /// The permission name.
    pub fn permission(&self) -> &str {
        &self.name
    }

    /// The entity id, or `None` for the name-wide scope.
    pub fn entity_id(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Compute the value this scope observes in `map`.
    ///
    /// Missing names or entities resolve to an empty value.
    pub fn resolve(&self, map: &PermissionMap) -> ScopedValue {
        let entities = map.get(&self.name);
        match &self.entity {
            None => ScopedValue::Entities(entities.cloned().unwrap_or_default()),
            Some(entity) => ScopedValue::Rights(
                entities
                    .and_then(|e| e.get(entity))
                    .cloned()
                    .unwrap_or_default(),
            ),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity {
            Some(entity) => write!(f, "{}[{}]", self.name, entity),
            None => f.write_str(&self.name),
        }
    }
}

/// The value delivered to a scoped observer.
///
/// Serializes as the bare inner map. Both shapes can be empty `{}`, so the
/// output is for display only and is not read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScopedValue {
    /// Every entity under a permission name.
    Entities(EntityRightsMap),
    /// The capabilities on a single entity.
    Rights(CapabilitySet),
}

impl ScopedValue {
    /// True when the scope grants nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            ScopedValue::Entities(entities) => entities.is_empty(),
            ScopedValue::Rights(rights) => rights.is_empty(),
        }
    }

    pub fn as_rights(&self) -> Option<&CapabilitySet> {
        match self {
            ScopedValue::Rights(rights) => Some(rights),
            ScopedValue::Entities(_) => None,
        }
    }

    pub fn as_entities(&self) -> Option<&EntityRightsMap> {
        match self {
            ScopedValue::Entities(entities) => Some(entities),
            ScopedValue::Rights(_) => None,
        }
    }
}
