//! # idcache
//!
//! A client-side identity cache: the signed-in user and their permissions,
//! kept in step with a remote identity service and observable at fine grain.
//!
//! ## Overview
//!
//! - **User store**: the current user record, or none when signed out
//! - **Permission store**: decoded rights per permission name and entity
//! - **Scoped subscriptions**: observe the whole map, one permission name, or
//!   one permission on one entity
//! - **Session sync**: sign-in, sign-out, sign-up and refresh, with a hook for
//!   sessions invalidated by the transport
//!
//! ## Key Concepts
//!
//! - **Rights**: a bit set of create, read, update and delete
//! - **Entity `"*"`**: rights that apply to every entity under a name
//! - **Wholesale replacement**: every refresh replaces the stores and
//!   re-notifies every observer
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use idcache::{CacheConfig, IdentityCache, Observer, ScopedValue};
//! use idcache::sync::{MemoryIdentityService, MemorySessionHolder};
//!
//! async fn example() {
//!     let session = Arc::new(MemorySessionHolder::new());
//!     let service = Arc::new(MemoryIdentityService::new(session.clone()));
//!     let cache = IdentityCache::new(service, session, CacheConfig::default()).unwrap();
//!
//!     let sub = cache.subscribe_scope(
//!         Observer::new(|value: ScopedValue| println!("docs/e1 -> {:?}", value)),
//!         "docs",
//!         Some("e1"),
//!     );
//!
//!     cache
//!         .sign_in_with_credentials("a@example.com", "secret", None)
//!         .await
//!         .unwrap();
//!
//!     sub.unsubscribe();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `idcache::core` - Rights codec, scope keys, user record
//! - `idcache::store` - Observers and the user store
//! - `idcache::perms` - Permission store and scoped registry
//! - `idcache::sync` - Identity service abstraction and session controller

pub mod cache;
pub mod error;
pub mod hooks;

// Re-export component crates
pub use idcache_core as core;
pub use idcache_perms as perms;
pub use idcache_store as store;
pub use idcache_sync as sync;

// Re-export main types for convenience
pub use cache::{CacheConfig, IdentityCache};
pub use error::{CacheError, Result};
pub use hooks::{bind_permissions, bind_scope, bind_user, Bound};

// Re-export commonly used types
pub use idcache_core::{
    Capability, CapabilitySet, PermissionMap, RawPermissions, RawRights, Rights, ScopeKey,
    ScopedValue, User, ALL_ENTITIES,
};
pub use idcache_perms::PermissionStore;
pub use idcache_store::{Observer, Subscription, UserStore};
pub use idcache_sync::{IdentityService, Refresh, SessionHolder, SignIn, SyncConfig};
