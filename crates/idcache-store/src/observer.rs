//! Observer callbacks, observer lists and subscription handles.
//!
//! Observers are compared by identity: two [`Observer`] handles are the same
//! observer when they were cloned from the same [`Observer::new`] call.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A callback that receives its own copy of each new value.
pub struct Observer<T>(Arc<dyn Fn(T) + Send + Sync>);

impl<T> Observer<T> {
    /// Wrap a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Deliver a value.
    pub fn notify(&self, value: T) {
        (self.0)(value)
    }

    /// True if both handles refer to the same callback.
    pub fn same(&self, other: &Self) -> bool {
        // Compare data pointers only; vtable pointers are not unique.
        Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
    }
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Observer({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// One entry of an [`ObserverList`].
///
/// The liveness flag is shared with the list and cleared on removal, so a
/// copy taken for a fan-out skips entries removed while it runs.
pub struct Registration<T> {
    observer: Observer<T>,
    live: Arc<AtomicBool>,
}

impl<T> Registration<T> {
    fn new(observer: Observer<T>) -> Self {
        Self {
            observer,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn observer(&self) -> &Observer<T> {
        &self.observer
    }

    /// False once the entry has been removed from its list.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

impl<T> Clone for Registration<T> {
    fn clone(&self) -> Self {
        Self {
            observer: self.observer.clone(),
            live: Arc::clone(&self.live),
        }
    }
}

/// Ordered list of observers.
///
/// Notification order is registration order. The same observer may appear
/// more than once; each entry is notified and must be removed separately.
pub struct ObserverList<T> {
    entries: Vec<Registration<T>>,
}

impl<T> ObserverList<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an observer.
    pub fn push(&mut self, observer: Observer<T>) {
        self.entries.push(Registration::new(observer));
    }

    /// Remove the first entry matching `observer`.
    pub fn remove(&mut self, observer: &Observer<T>) -> bool {
        match self.entries.iter().position(|e| e.observer.same(observer)) {
            Some(index) => {
                let entry = self.entries.remove(index);
                entry.live.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observer<T>> {
        self.entries.iter().map(Registration::observer)
    }

    /// Entries to notify outside of a borrow.
    pub fn registrations(&self) -> Vec<Registration<T>> {
        self.entries.clone()
    }
}

impl<T> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for ObserverList<T> {
    fn drop(&mut self) {
        for entry in &self.entries {
            entry.live.store(false, Ordering::Release);
        }
    }
}

/// Notify each live registration with its own clone of `value`.
///
/// Stops as soon as `current` reports that `value` has been replaced, and
/// skips entries removed since the copy was taken. Returns the number of
/// observers notified.
pub fn fan_out<T: Clone>(
    registrations: &[Registration<T>],
    value: &T,
    current: impl Fn() -> bool,
) -> usize {
    let mut notified = 0;
    for registration in registrations {
        if !current() {
            break;
        }
        if !registration.is_live() {
            continue;
        }
        registration.observer.notify(value.clone());
        notified += 1;
    }
    notified
}

/// Handle returned by every `subscribe` call.
///
/// Carries the value delivered at subscription time. Dropping the handle does
/// not unsubscribe.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription<T> {
    value: T,
    active: AtomicBool,
    detach: Box<dyn Fn() -> bool + Send + Sync>,
}

impl<T> Subscription<T> {
    /// Create a handle. `detach` removes the observer and reports whether it
    /// was found; it is called at most once.
    pub fn new<F>(value: T, detach: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            value,
            active: AtomicBool::new(true),
            detach: Box::new(detach),
        }
    }

    /// The value delivered when the subscription was created.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Whether `unsubscribe` has not yet been called.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Remove the observer. Returns `true` the first time only.
    pub fn unsubscribe(&self) -> bool {
        if self.active.swap(false, Ordering::AcqRel) {
            (self.detach)()
        } else {
            false
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("value", &self.value)
            .field("active", &self.is_active())
            .finish()
    }
}
