//! # idcache sync
//!
//! Keeps the user and permission stores synchronized with a remote identity
//! service.
//!
//! ## Overview
//!
//! The [`SessionController`] calls the [`IdentityService`] to fetch the
//! current user, sign in, sign out and sign up, and replaces the stores from
//! the results. It also listens for the transport's "session invalidated"
//! signal, resets the stores, and calls an optional no-session hook.
//!
//! ## Key Properties
//!
//! - **Wholesale replacement**: a refresh replaces the user and the permission
//!   map; nothing is merged
//! - **Consumed invalidation**: a refresh rejected because the session is
//!   gone resolves normally with [`Refresh::SessionHandled`]
//! - **No resurrection**: a fetch overtaken by a sign-out or invalidation is
//!   discarded ([`Refresh::Superseded`])
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use idcache_perms::PermissionStore;
//! use idcache_store::UserStore;
//! use idcache_sync::{
//!     MemoryIdentityService, MemorySessionHolder, SessionController, SyncConfig,
//! };
//!
//! async fn example() {
//!     let session = Arc::new(MemorySessionHolder::new());
//!     let service = Arc::new(MemoryIdentityService::new(session.clone()));
//!     let controller = SessionController::new(
//!         service,
//!         session,
//!         UserStore::new(),
//!         PermissionStore::new(),
//!         SyncConfig::default(),
//!     )
//!     .unwrap();
//!
//!     let sign_in = controller
//!         .sign_in_with_credentials("a@example.com", "secret", None)
//!         .await
//!         .unwrap();
//!     println!("signed in as {:?}", sign_in.user.map(|u| u.id));
//! }
//! ```

pub mod controller;
pub mod error;
pub mod messages;
pub mod session;
pub mod transport;

pub use controller::{NoSessionHook, Refresh, SessionController, SignIn, SyncConfig};
pub use error::{Result, SyncError};
pub use messages::{Credentials, SignInResponse, SignUpFields};
pub use session::{MemorySessionHolder, SessionHolder};
pub use transport::{memory::MemoryIdentityService, IdentityService, InvalidationListener};
