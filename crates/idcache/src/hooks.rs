//! Bindings for UI layers.
//!
//! A [`Bound`] value tracks the latest delivery of one subscription and
//! unsubscribes when dropped, so a view can hold one for as long as it is
//! mounted.

use std::sync::Arc;

use parking_lot::Mutex;

use idcache_core::{EntityRightsMap, PermissionMap, ScopedValue, User};
use idcache_store::{Observer, Subscription};

use crate::cache::IdentityCache;

struct Latest<T> {
    value: T,
    deliveries: u64,
}

/// The latest value of a subscription, kept current until dropped.
pub struct Bound<T> {
    latest: Arc<Mutex<Latest<T>>>,
    subscription: Subscription<T>,
}

impl<T: Clone + Send + 'static> Bound<T> {
    fn attach(initial: T, subscribe: impl FnOnce(Observer<T>) -> Subscription<T>) -> Self {
        let latest = Arc::new(Mutex::new(Latest {
            value: initial,
            deliveries: 0,
        }));

        let sink = Arc::clone(&latest);
        let observer = Observer::new(move |value: T| {
            let mut latest = sink.lock();
            latest.value = value;
            latest.deliveries += 1;
        });

        let subscription = subscribe(observer);
        Self {
            latest,
            subscription,
        }
    }

    /// A copy of the latest value.
    pub fn get(&self) -> T {
        self.latest.lock().value.clone()
    }

    /// Run `f` against the latest value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.latest.lock().value)
    }

    /// Number of values received, including the one delivered on subscribe.
    pub fn deliveries(&self) -> u64 {
        self.latest.lock().deliveries
    }

    /// Whether the binding is still attached.
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }
}

impl<T> Drop for Bound<T> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

/// Bind to the whole permission map.
pub fn bind_permissions(cache: &IdentityCache) -> Bound<PermissionMap> {
    Bound::attach(PermissionMap::new(), |observer| {
        cache.subscribe_permissions(observer)
    })
}

/// Bind to one permission name, or one permission on one entity.
pub fn bind_scope(cache: &IdentityCache, name: &str, entity: Option<&str>) -> Bound<ScopedValue> {
    Bound::attach(ScopedValue::Entities(EntityRightsMap::new()), |observer| {
        cache.subscribe_scope(observer, name, entity)
    })
}

/// Bind to the current user.
pub fn bind_user(cache: &IdentityCache) -> Bound<Option<User>> {
    Bound::attach(None, |observer| cache.subscribe_user(observer))
}
