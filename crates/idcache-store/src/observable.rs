//! A single observable value.
//!
//! The value and its observer list live behind a re-entrant lock. Replacing
//! the value and notifying observers happen while the lock is held, so a
//! fan-out is never interleaved with a replacement from another thread.
//! Observers run on the notifying thread and may read the value, subscribe or
//! unsubscribe from inside their callback.

use std::cell::RefCell;
use std::sync::{Arc, Weak};

use parking_lot::ReentrantMutex;
use tracing::debug;

use crate::observer::{fan_out, Observer, ObserverList, Subscription};

type Shared<T> = ReentrantMutex<RefCell<Slot<T>>>;

struct Slot<T> {
    value: T,
    version: u64,
    observers: ObserverList<T>,
}

/// A value with subscribers.
///
/// Cloning an `Observable` yields another handle to the same value.
pub struct Observable<T> {
    inner: Arc<Shared<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Observable<T> {
    /// Create an observable holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(ReentrantMutex::new(RefCell::new(Slot {
                value: initial,
                version: 0,
                observers: ObserverList::new(),
            }))),
        }
    }

    /// A copy of the current value.
    pub fn get(&self) -> T {
        self.inner.lock().borrow().value.clone()
    }

    /// Number of replacements applied so far.
    pub fn version(&self) -> u64 {
        self.inner.lock().borrow().version
    }

    /// Replace the value and notify every observer.
    ///
    /// An observer that replaces the value again from its callback ends this
    /// fan-out; the remaining observers only see the newer value. Returns the
    /// number of observers notified.
    pub fn replace(&self, value: T) -> usize {
        let guard = self.inner.lock();
        let (registrations, snapshot, version) = {
            let mut slot = guard.borrow_mut();
            slot.value = value;
            slot.version += 1;
            (
                slot.observers.registrations(),
                slot.value.clone(),
                slot.version,
            )
        };

        let notified = fan_out(&registrations, &snapshot, || {
            guard.borrow().version == version
        });
        debug!(
            observers = registrations.len(),
            notified, "observable replaced"
        );
        notified
    }

    /// Register an observer and deliver the current value to it immediately.
    pub fn subscribe(&self, observer: Observer<T>) -> Subscription<T> {
        let guard = self.inner.lock();
        let current = {
            let mut slot = guard.borrow_mut();
            slot.observers.push(observer.clone());
            slot.value.clone()
        };

        observer.notify(current.clone());
        drop(guard);

        let weak: Weak<Shared<T>> = Arc::downgrade(&self.inner);
        Subscription::new(current, move || match weak.upgrade() {
            Some(inner) => remove_observer(&inner, &observer),
            None => false,
        })
    }

    /// Remove the first registration of `observer`.
    pub fn unsubscribe(&self, observer: &Observer<T>) -> bool {
        remove_observer(&self.inner, observer)
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner.lock().borrow().observers.len()
    }
}

fn remove_observer<T>(inner: &Shared<T>, observer: &Observer<T>) -> bool {
    let guard = inner.lock();
    let removed = guard.borrow_mut().observers.remove(observer);
    removed
}
