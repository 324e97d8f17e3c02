//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use parking_lot::Mutex;

use idcache::{CacheConfig, IdentityCache};
use idcache_core::{RawRights, User};
use idcache_store::Observer;
use idcache_sync::{MemoryIdentityService, MemorySessionHolder};

/// Email of the account every fixture starts with.
pub const TEST_EMAIL: &str = "ada@example.com";
/// Password of that account.
pub const TEST_PASSWORD: &str = "correct horse";

/// An identity cache wired to an in-memory service.
pub struct TestFixture {
    pub service: Arc<MemoryIdentityService>,
    pub session: Arc<MemorySessionHolder>,
    pub cache: IdentityCache,
}

impl TestFixture {
    /// Create a fixture with one account: user `u1` with create and read on
    /// `docs/e1` and every right on `admin`.
    pub fn new() -> Self {
        Self::with_user(
            User::new("u1")
                .with_permission("docs", RawRights::entity("e1", 0x03))
                .with_permission("admin", RawRights::Flat(0x0F)),
        )
    }

    /// Create a fixture whose single account holds `user`.
    pub fn with_user(user: User) -> Self {
        Self::with_config(user, CacheConfig::default())
    }

    /// Create a fixture with a custom cache configuration.
    ///
    /// Panics if the configuration is invalid.
    pub fn with_config(user: User, config: CacheConfig) -> Self {
        let session = Arc::new(MemorySessionHolder::new());
        let service = Arc::new(MemoryIdentityService::new(session.clone()));
        service.add_account(TEST_EMAIL, TEST_PASSWORD, user);

        let cache = match IdentityCache::new(service.clone(), session.clone(), config) {
            Ok(cache) => cache,
            Err(e) => panic!("fixture configuration rejected: {}", e),
        };

        Self {
            service,
            session,
            cache,
        }
    }

    /// Sign in with the fixture account.
    pub async fn sign_in(&self) -> idcache::Result<idcache_sync::SignIn> {
        self.cache
            .sign_in_with_credentials(TEST_EMAIL, TEST_PASSWORD, None)
            .await
    }

    /// Replace the account's user record server-side.
    pub fn set_server_user(&self, user: User) {
        self.service.update_user(TEST_EMAIL, user);
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Records every value delivered to its observer.
pub struct Recorder<T> {
    seen: Arc<Mutex<Vec<T>>>,
    observer: Observer<T>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = Observer::new(move |value: T| sink.lock().push(value));
        Self { seen, observer }
    }

    /// The observer to subscribe. Every clone is the same observer.
    pub fn observer(&self) -> Observer<T> {
        self.observer.clone()
    }

    /// Values received so far.
    pub fn values(&self) -> Vec<T> {
        self.seen.lock().clone()
    }

    pub fn last(&self) -> Option<T> {
        self.seen.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

impl<T: Clone + Send + 'static> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}
