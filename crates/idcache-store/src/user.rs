//! The current-user store.

use idcache_core::User;
use tracing::debug;

use crate::observable::Observable;
use crate::observer::{Observer, Subscription};

/// Holds the signed-in user, or `None` when signed out.
///
/// Cheap to clone; clones share the same slot.
#[derive(Clone)]
pub struct UserStore {
    slot: Observable<Option<User>>,
}

impl UserStore {
    /// Create a signed-out store.
    pub fn new() -> Self {
        Self {
            slot: Observable::new(None),
        }
    }

    /// A copy of the current user.
    pub fn current(&self) -> Option<User> {
        self.slot.get()
    }

    /// Replace the current user and notify observers.
    pub fn replace(&self, user: Option<User>) {
        debug!(
            user_id = user.as_ref().map(|u| u.id.as_str()).unwrap_or("<none>"),
            "replacing current user"
        );
        self.slot.replace(user);
    }

    /// Shorthand for `replace(None)`.
    pub fn clear(&self) {
        self.replace(None);
    }

    /// Subscribe to user changes. The current user is delivered immediately.
    pub fn subscribe(&self, observer: Observer<Option<User>>) -> Subscription<Option<User>> {
        self.slot.subscribe(observer)
    }

    pub fn unsubscribe(&self, observer: &Observer<Option<User>>) -> bool {
        self.slot.unsubscribe(observer)
    }

    pub fn observer_count(&self) -> usize {
        self.slot.observer_count()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}
