//! # idcache core
//!
//! Pure data for the identity cache: capabilities, rights decoding,
//! permission maps, subscription scopes and the user record.
//!
//! This crate does no I/O and holds no state.
//!
//! ## Key Types
//!
//! - [`Capability`] / [`CapabilitySet`] - granted actions on an entity
//! - [`Rights`] - the bit-flag wire encoding of a capability set
//! - [`PermissionMap`] - permission name -> entity id -> capabilities
//! - [`ScopeKey`] / [`ScopedValue`] - what a scoped observer watches
//! - [`User`] - the authenticated user
//!
//! ## Decoding
//!
//! ```rust
//! use idcache_core::{decode_rights, Capability};
//!
//! let set = decode_rights(0x05);
//! assert!(set.contains(Capability::Create));
//! assert!(set.contains(Capability::Update));
//! assert!(!set.contains(Capability::Read));
//! ```

pub mod error;
pub mod rights;
pub mod scope;
pub mod types;
pub mod user;

pub use error::{CoreError, Result};
pub use rights::{decode_permissions, decode_rights, Capability, CapabilitySet, Rights};
pub use scope::{ScopeKey, ScopedValue};
pub use types::{EntityRightsMap, PermissionMap, RawPermissions, RawRights, ALL_ENTITIES};
pub use user::User;
