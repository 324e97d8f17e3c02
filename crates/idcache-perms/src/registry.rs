//! Scoped subscription registry.
//!
//! Holds the observer lists for name-wide and single-entity scopes. A key
//! exists only while at least one observer is registered under it.

use std::collections::BTreeMap;

use idcache_core::{PermissionMap, ScopeKey, ScopedValue};
use idcache_store::{Observer, ObserverList, Registration};

/// One pending notification: observers of a scope and the value they get.
pub(crate) struct Delivery {
    pub(crate) observers: Vec<Registration<ScopedValue>>,
    pub(crate) value: ScopedValue,
}

/// Observer lists indexed by [`ScopeKey`].
#[derive(Default)]
pub struct ScopedRegistry {
    scopes: BTreeMap<ScopeKey, ObserverList<ScopedValue>>,
}

impl ScopedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer to a scope, creating the scope if needed.
    pub fn add(&mut self, key: ScopeKey, observer: Observer<ScopedValue>) {
        self.scopes.entry(key).or_default().push(observer);
    }

    /// Remove the first registration of `observer` under `key`.
    ///
    /// Drops the key once its last observer is gone.
    pub fn remove(&mut self, key: &ScopeKey, observer: &Observer<ScopedValue>) -> bool {
        let Some(list) = self.scopes.get_mut(key) else {
            return false;
        };

        let removed = list.remove(observer);
        if list.is_empty() {
            self.scopes.remove(key);
        }
        removed
    }

    pub fn contains(&self, key: &ScopeKey) -> bool {
        self.scopes.contains_key(key)
    }

    /// Registered keys, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &ScopeKey> {
        self.scopes.keys()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Observers registered under `key`.
    pub fn observer_count(&self, key: &ScopeKey) -> usize {
        self.scopes.get(key).map(ObserverList::len).unwrap_or(0)
    }

    /// Recompute every scope against `map`.
    pub(crate) fn deliveries(&self, map: &PermissionMap) -> Vec<Delivery> {
        self.scopes
            .iter()
            .map(|(key, list)| Delivery {
                observers: list.registrations(),
                value: key.resolve(map),
            })
            .collect()
    }
}
