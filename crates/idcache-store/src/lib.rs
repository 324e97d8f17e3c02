//! # idcache store
//!
//! Observer plumbing shared by the identity cache stores, and the store
//! holding the current user.
//!
//! ## Key Types
//!
//! - [`Observer`] - a callback compared by identity
//! - [`ObserverList`] - FIFO list of observers
//! - [`Subscription`] - handle with the initial value and `unsubscribe()`
//! - [`Observable`] - a single value with subscribers
//! - [`UserStore`] - the signed-in user
//!
//! ## Usage
//!
//! ```rust
//! use idcache_store::{Observer, UserStore};
//! use idcache_core::User;
//!
//! let store = UserStore::new();
//! let sub = store.subscribe(Observer::new(|user: Option<User>| {
//!     println!("user is now {:?}", user.map(|u| u.id));
//! }));
//!
//! store.replace(Some(User::new("u1")));
//! assert!(sub.unsubscribe());
//! ```
//!
//! ## Design Notes
//!
//! - **Synchronous first delivery**: `subscribe` calls the observer with the
//!   current value before returning.
//! - **Owned snapshots**: every observer receives its own clone.
//! - **Identity removal**: `unsubscribe` removes the first registration of
//!   the same observer handle.

pub mod observable;
pub mod observer;
pub mod user;

pub use observable::Observable;
pub use observer::{fan_out, Observer, ObserverList, Registration, Subscription};
pub use user::UserStore;
