//! The permission store.
//!
//! Owns the decoded [`PermissionMap`] for the signed-in user and serves three
//! subscription scopes over it:
//!
//! - every permission ([`PermissionStore::subscribe`])
//! - one permission name across its entities
//! - one permission name on one entity
//!
//! The last two go through the [`ScopedRegistry`] via
//! [`PermissionStore::subscribe_scope`].
//!
//! The map is never merged: each [`PermissionStore::replace_all`] discards
//! the previous map and rebuilds it from the raw server data, so a partial
//! response cannot leave stale grants behind.

use std::cell::RefCell;
use std::sync::{Arc, Weak};

use parking_lot::ReentrantMutex;
use tracing::debug;

use idcache_core::{
    decode_permissions, Capability, CapabilitySet, EntityRightsMap, PermissionMap,
    RawPermissions, ScopeKey, ScopedValue, ALL_ENTITIES,
};
use idcache_store::{fan_out, Observer, ObserverList, Subscription};

use crate::registry::ScopedRegistry;

type Shared = ReentrantMutex<RefCell<State>>;

#[derive(Default)]
struct State {
    /// Current decoded permissions.
    permissions: PermissionMap,

    /// Number of replacements applied.
    version: u64,

    /// Observers of the whole map.
    everything: ObserverList<PermissionMap>,

    /// Observers of a single name or entity.
    scoped: ScopedRegistry,
}

/// Counts from one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Observers of the whole map that were notified.
    pub everything: usize,
    /// Scope keys that were recomputed.
    pub scopes: usize,
    /// Scoped observers that were notified.
    pub scoped_observers: usize,
}

/// Shared handle to the current permission map.
///
/// Cloning is cheap; all clones observe and mutate the same state.
#[derive(Clone)]
pub struct PermissionStore {
    inner: Arc<Shared>,
}

impl PermissionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ReentrantMutex::new(RefCell::new(State::default()))),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Decode `raw` and make it the current map, then notify every observer.
    pub fn replace_all(&self, raw: &RawPermissions) -> FanOutReport {
        self.replace_map(decode_permissions(raw))
    }

    /// Reset to the signed-out (empty) map.
    pub fn clear(&self) -> FanOutReport {
        self.replace_map(PermissionMap::new())
    }

    /// Install an already decoded map, then notify every observer.
    ///
    /// Observers of the whole map are notified first, then each registered
    /// scope in key order. Scopes that no longer match anything receive an
    /// empty value. A replacement made by an observer during the fan-out
    /// ends this one; observers not yet reached only see the newer map.
    pub fn replace_map(&self, permissions: PermissionMap) -> FanOutReport {
        let guard = self.inner.lock();
        let (everything, snapshot, deliveries, version) = {
            let mut state = guard.borrow_mut();
            state.permissions = permissions;
            state.version += 1;
            (
                state.everything.registrations(),
                state.permissions.clone(),
                state.scoped.deliveries(&state.permissions),
                state.version,
            )
        };
        let current = || guard.borrow().version == version;

        let mut report = FanOutReport {
            everything: fan_out(&everything, &snapshot, current),
            scopes: deliveries.len(),
            scoped_observers: 0,
        };
        for delivery in &deliveries {
            if !current() {
                break;
            }
            report.scoped_observers += fan_out(&delivery.observers, &delivery.value, current);
        }

        debug!(
            names = snapshot.len(),
            everything = report.everything,
            scopes = report.scopes,
            scoped_observers = report.scoped_observers,
            superseded = !current(),
            "permissions replaced"
        );
        report
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// A copy of the full map.
    pub fn snapshot(&self) -> PermissionMap {
        self.inner.lock().borrow().permissions.clone()
    }

    /// A copy of every entity's rights under `name`. Empty if absent.
    pub fn entity_rights(&self, name: &str) -> EntityRightsMap {
        self.inner
            .lock()
            .borrow()
            .permissions
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// A copy of the rights on one entity. `None` means [`ALL_ENTITIES`].
    ///
    /// Empty if the name or entity is absent.
    pub fn rights(&self, name: &str, entity: Option<&str>) -> CapabilitySet {
        let entity = entity.unwrap_or(ALL_ENTITIES);
        self.inner
            .lock()
            .borrow()
            .permissions
            .get(name)
            .and_then(|entities| entities.get(entity))
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `capability` is granted on `name` / `entity`.
    pub fn can(&self, name: &str, entity: Option<&str>, capability: Capability) -> bool {
        self.rights(name, entity).contains(capability)
    }

    /// The value an observer of `key` currently sees.
    pub fn scoped_value(&self, key: &ScopeKey) -> ScopedValue {
        key.resolve(&self.inner.lock().borrow().permissions)
    }

    /// Number of replacements applied so far.
    pub fn version(&self) -> u64 {
        self.inner.lock().borrow().version
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────────

    /// Observe the whole map. The current map is delivered immediately.
    pub fn subscribe(&self, observer: Observer<PermissionMap>) -> Subscription<PermissionMap> {
        let guard = self.inner.lock();
        let current = {
            let mut state = guard.borrow_mut();
            state.everything.push(observer.clone());
            state.permissions.clone()
        };
        observer.notify(current.clone());
        drop(guard);

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(current, move || {
            with_state(&weak, |state| state.everything.remove(&observer))
        })
    }

    /// Stop observing the whole map.
    pub fn unsubscribe(&self, observer: &Observer<PermissionMap>) -> bool {
        let guard = self.inner.lock();
        let removed = guard.borrow_mut().everything.remove(observer);
        removed
    }

    /// Observe one scope. Its current value is delivered immediately.
    pub fn subscribe_scope(
        &self,
        observer: Observer<ScopedValue>,
        key: ScopeKey,
    ) -> Subscription<ScopedValue> {
        let guard = self.inner.lock();
        let current = {
            let mut state = guard.borrow_mut();
            state.scoped.add(key.clone(), observer.clone());
            key.resolve(&state.permissions)
        };
        debug!(scope = %key, "scope subscribed");
        observer.notify(current.clone());
        drop(guard);

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(current, move || {
            with_state(&weak, |state| state.scoped.remove(&key, &observer))
        })
    }

    /// Stop observing a scope. The key is dropped with its last observer.
    pub fn unsubscribe_scope(&self, observer: &Observer<ScopedValue>, key: &ScopeKey) -> bool {
        let guard = self.inner.lock();
        let removed = guard.borrow_mut().scoped.remove(key, observer);
        if removed {
            debug!(scope = %key, "scope unsubscribed");
        }
        removed
    }

    /// Scope keys that currently have observers.
    pub fn scope_keys(&self) -> Vec<ScopeKey> {
        self.inner.lock().borrow().scoped.keys().cloned().collect()
    }

    /// Observers registered under `key`.
    pub fn scope_observer_count(&self, key: &ScopeKey) -> usize {
        self.inner.lock().borrow().scoped.observer_count(key)
    }

    /// Observers of the whole map.
    pub fn observer_count(&self) -> usize {
        self.inner.lock().borrow().everything.len()
    }
}

impl Default for PermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn with_state(weak: &Weak<Shared>, f: impl FnOnce(&mut State) -> bool) -> bool {
    let Some(inner) = weak.upgrade() else {
        return false;
    };
    let guard = inner.lock();
    let result = f(&mut guard.borrow_mut());
    result
}
