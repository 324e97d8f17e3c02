//! The identity cache: unified API over the stores and the session controller.
//!
//! An [`IdentityCache`] is constructed once by the hosting application and
//! handed to every consumer. It owns the user store, the permission store
//! and the controller that keeps both in step with the identity service.

use std::sync::Arc;

use tracing::info;

use idcache_core::{Capability, CapabilitySet, PermissionMap, ScopeKey, ScopedValue, User};
use idcache_perms::PermissionStore;
use idcache_store::{Observer, Subscription, UserStore};
use idcache_sync::{
    IdentityService, Refresh, SessionController, SessionHolder, SignIn, SignUpFields, SyncConfig,
};

use crate::error::{CacheError, Result};

/// Configuration for the identity cache.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Session controller configuration.
    pub sync: SyncConfig,
}

impl CacheConfig {
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// Check the configuration without building anything.
    pub fn validate(&self) -> Result<()> {
        self.sync
            .validate()
            .map_err(|e| CacheError::Config(e.to_string()))
    }
}

/// The identity cache.
///
/// Provides:
/// - Subscriptions to the whole permission map, one permission name, one
///   permission on one entity, and the current user
/// - Sign-in, sign-out, sign-up and refresh against the identity service
/// - Synchronous queries over the cached state
pub struct IdentityCache {
    users: UserStore,
    permissions: PermissionStore,
    controller: Arc<SessionController>,
}

impl IdentityCache {
    /// Create a cache bound to an identity service and a session holder.
    ///
    /// The configuration is validated before any store is created.
    pub fn new(
        service: Arc<dyn IdentityService>,
        session: Arc<dyn SessionHolder>,
        config: CacheConfig,
    ) -> Result<Self> {
        config.validate()?;

        let users = UserStore::new();
        let permissions = PermissionStore::new();
        let controller = SessionController::new(
            service,
            session,
            users.clone(),
            permissions.clone(),
            config.sync,
        )?;

        Ok(Self {
            users,
            permissions,
            controller,
        })
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn permissions(&self) -> &PermissionStore {
        &self.permissions
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// The signed-in user, if any.
    pub fn user(&self) -> Option<User> {
        self.users.current()
    }

    /// Whether a user is signed in.
    pub fn is_signed_in(&self) -> bool {
        self.users.current().is_some()
    }

    /// Rights on one entity; `None` means every entity.
    pub fn rights(&self, name: &str, entity: Option<&str>) -> CapabilitySet {
        self.permissions.rights(name, entity)
    }

    /// Whether `capability` is granted on `name` / `entity`.
    pub fn can(&self, name: &str, entity: Option<&str>, capability: Capability) -> bool {
        self.permissions.can(name, entity, capability)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────────

    /// Observe the whole permission map.
    pub fn subscribe_permissions(
        &self,
        observer: Observer<PermissionMap>,
    ) -> Subscription<PermissionMap> {
        self.permissions.subscribe(observer)
    }

    pub fn unsubscribe_permissions(&self, observer: &Observer<PermissionMap>) -> bool {
        self.permissions.unsubscribe(observer)
    }

    /// Observe one permission name, or one permission on one entity.
    pub fn subscribe_scope(
        &self,
        observer: Observer<ScopedValue>,
        name: &str,
        entity: Option<&str>,
    ) -> Subscription<ScopedValue> {
        self.permissions
            .subscribe_scope(observer, ScopeKey::new(name, entity))
    }

    pub fn unsubscribe_scope(
        &self,
        observer: &Observer<ScopedValue>,
        name: &str,
        entity: Option<&str>,
    ) -> bool {
        self.permissions
            .unsubscribe_scope(observer, &ScopeKey::new(name, entity))
    }

    /// Observe the current user.
    pub fn subscribe_user(&self, observer: Observer<Option<User>>) -> Subscription<Option<User>> {
        self.users.subscribe(observer)
    }

    pub fn unsubscribe_user(&self, observer: &Observer<Option<User>>) -> bool {
        self.users.unsubscribe(observer)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Re-fetch the current user and permissions.
    pub async fn update(&self) -> Result<Refresh> {
        Ok(self.controller.refresh_from_server().await?)
    }

    /// Adopt an existing session token.
    pub async fn sign_in(&self, token: impl Into<String>) -> Result<SignIn> {
        Ok(self.controller.sign_in_with_token(token).await?)
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
        portal: Option<&str>,
    ) -> Result<SignIn> {
        let sign_in = self
            .controller
            .sign_in_with_credentials(email, password, portal)
            .await?;
        info!(
            user_id = sign_in.user.as_ref().map(|u| u.id.as_str()).unwrap_or("<none>"),
            "identity cache signed in"
        );
        Ok(sign_in)
    }

    /// Sign out and reset the cache.
    pub async fn sign_out(&self) -> Result<bool> {
        Ok(self.controller.sign_out().await?)
    }

    /// Register a new account.
    pub async fn sign_up(&self, fields: SignUpFields) -> Result<bool> {
        Ok(self.controller.sign_up(fields).await?)
    }

    /// Set the hook called when the session is invalidated.
    pub fn on_no_session<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.controller.on_no_session(hook);
    }
}
