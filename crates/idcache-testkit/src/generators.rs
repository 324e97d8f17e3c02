//! Proptest generators for property-based testing.

use proptest::prelude::*;

use idcache_core::{Capability, RawPermissions, RawRights, ScopeKey, User, ALL_ENTITIES};

/// Generate a permission name.
pub fn permission_name() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,11}".prop_map(String::from)
}

/// Generate an entity id. Occasionally the wildcard entity.
pub fn entity_id() -> impl Strategy<Value = String> {
    prop_oneof![
        9 => "[a-z0-9]{1,8}".prop_map(String::from),
        1 => Just(ALL_ENTITIES.to_string()),
    ]
}

/// Generate a raw rights value, including bits above the known four.
pub fn rights_bits() -> impl Strategy<Value = u32> {
    prop_oneof![
        4 => 0u32..=0x0F,
        1 => any::<u32>(),
    ]
}

/// Generate a capability.
pub fn capability() -> impl Strategy<Value = Capability> {
    prop::sample::select(Capability::ALL.to_vec())
}

/// Generate one permission's raw rights in either wire shape.
pub fn raw_rights() -> impl Strategy<Value = RawRights> {
    prop_oneof![
        rights_bits().prop_map(RawRights::Flat),
        prop::collection::btree_map(entity_id(), rights_bits(), 0..4).prop_map(RawRights::Scoped),
    ]
}

/// Generate a raw permission map.
pub fn raw_permissions() -> impl Strategy<Value = RawPermissions> {
    prop::collection::btree_map(permission_name(), raw_rights(), 0..6)
}

/// Generate a scope key, by name or by entity.
pub fn scope_key() -> impl Strategy<Value = ScopeKey> {
    (permission_name(), prop::option::of(entity_id()))
        .prop_map(|(name, entity)| ScopeKey::new(name, entity.as_deref()))
}

/// Generate a user carrying random permissions.
pub fn user() -> impl Strategy<Value = User> {
    ("u[0-9]{1,4}", raw_permissions()).prop_map(|(id, permissions)| {
        let mut user = User::new(id);
        user.permissions = permissions;
        user
    })
}
