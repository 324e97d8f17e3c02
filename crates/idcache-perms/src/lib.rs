//! # idcache permissions
//!
//! The in-memory permission store and its scoped subscriptions.
//!
//! ## Overview
//!
//! The signed-in user's permissions arrive from the identity service as raw
//! bit flags. [`PermissionStore::replace_all`] decodes them into a
//! [`PermissionMap`](idcache_core::PermissionMap) and fans the new state out
//! to observers at three granularities:
//!
//! - **Everything**: the whole map
//! - **Name**: every entity under one permission name
//! - **Entity**: one permission name on one entity
//!
//! ## Usage
//!
//! ```rust
//! use idcache_core::{RawPermissions, RawRights, ScopeKey, ScopedValue};
//! use idcache_perms::PermissionStore;
//! use idcache_store::Observer;
//!
//! let store = PermissionStore::new();
//! let sub = store.subscribe_scope(
//!     Observer::new(|value: ScopedValue| println!("docs/e1: {:?}", value)),
//!     ScopeKey::entity("docs", "e1"),
//! );
//!
//! let mut raw = RawPermissions::new();
//! raw.insert("docs".into(), RawRights::entity("e1", 0x03));
//! store.replace_all(&raw);
//!
//! assert!(store.rights("docs", Some("e1")).can_read());
//! sub.unsubscribe();
//! ```

pub mod registry;
pub mod store;

pub use registry::ScopedRegistry;
pub use store::{FanOutReport, PermissionStore};
