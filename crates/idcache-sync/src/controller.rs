//! Session sync controller.
//!
//! Drives the user and permission stores from identity service results:
//!
//! ```text
//! refresh_from_server      fetch user ──> UserStore.replace(user)
//!                                     └─> PermissionStore.replace_all(user.permissions)
//! sign_in_with_token       set session ──> refresh_from_server
//! sign_in_with_credentials sign in ──> set session ──> refresh_from_server
//! sign_out                 sign out ──> reset
//! session invalidated      reset ──> no-session hook
//! ```
//!
//! "Reset" clears the session token, the user and the permission map.
//!
//! Every refresh, sign-out and invalidation advances a generation counter. A
//! fetch that resolves after a newer transition started is discarded instead
//! of being applied, so a slow refresh cannot bring back a signed-out user.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, info, warn};

use idcache_core::User;
use idcache_perms::PermissionStore;
use idcache_store::UserStore;

use crate::error::{Result, SyncError};
use crate::messages::{Credentials, SignUpFields};
use crate::session::SessionHolder;
use crate::transport::IdentityService;

/// Hook called after the session has been invalidated and the stores reset.
pub type NoSessionHook = Arc<dyn Fn() + Send + Sync>;

/// Configuration for the controller.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound for each identity service call.
    pub request_timeout: Duration,
    /// Drop fetch results that were overtaken by a newer transition.
    pub discard_stale_refresh: bool,
}

impl SyncConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_discard_stale_refresh(mut self, discard: bool) -> Self {
        self.discard_stale_refresh = discard;
        self
    }

    /// Reject settings the controller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(SyncError::Configuration(
                "request_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            discard_stale_refresh: true,
        }
    }
}

/// Outcome of a refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum Refresh {
    /// The user was fetched and applied to the stores.
    Applied(User),
    /// The session was rejected; the stores were reset by the invalidation path.
    SessionHandled,
    /// A newer transition started while fetching; nothing was applied.
    Superseded,
}

impl Refresh {
    /// The applied user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Refresh::Applied(user) => Some(user),
            _ => None,
        }
    }

    pub fn into_user(self) -> Option<User> {
        match self {
            Refresh::Applied(user) => Some(user),
            _ => None,
        }
    }
}

/// Result of a sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct SignIn {
    /// The session token now active.
    pub session: String,
    /// The refreshed user, if the refresh was applied.
    pub user: Option<User>,
}

/// Keeps the user and permission stores in step with the identity service.
pub struct SessionController {
    service: Arc<dyn IdentityService>,
    session: Arc<dyn SessionHolder>,
    users: UserStore,
    permissions: PermissionStore,
    config: SyncConfig,
    /// Advanced by each refresh start, sign-out and invalidation.
    generation: AtomicU64,
    /// Serializes "check generation, then apply" against resets.
    transition: ReentrantMutex<()>,
    no_session: Mutex<Option<NoSessionHook>>,
}

impl SessionController {
    /// Create a controller and register it for session invalidation events.
    pub fn new(
        service: Arc<dyn IdentityService>,
        session: Arc<dyn SessionHolder>,
        users: UserStore,
        permissions: PermissionStore,
        config: SyncConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let controller = Arc::new(Self {
            service,
            session,
            users,
            permissions,
            config,
            generation: AtomicU64::new(0),
            transition: ReentrantMutex::new(()),
            no_session: Mutex::new(None),
        });

        let weak = Arc::downgrade(&controller);
        controller
            .service
            .set_invalidation_listener(Arc::new(move || {
                if let Some(controller) = weak.upgrade() {
                    controller.handle_session_invalidated();
                }
            }));

        Ok(controller)
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn permissions(&self) -> &PermissionStore {
        &self.permissions
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch the current user and replace both stores with it.
    ///
    /// A rejected session is not an error: the transport has already
    /// reported it and the stores were reset through the invalidation path.
    pub async fn refresh_from_server(&self) -> Result<Refresh> {
        let started = self.advance_generation();

        let user = match self
            .call("fetch_current_user", self.service.fetch_current_user())
            .await
        {
            Ok(user) => user,
            Err(SyncError::SessionHandled) => {
                debug!("refresh consumed session invalidation");
                return Ok(Refresh::SessionHandled);
            }
            Err(e) => {
                warn!(error = %e, "refresh failed");
                return Err(e);
            }
        };

        let _transition = self.transition.lock();
        if self.config.discard_stale_refresh && self.generation() != started {
            warn!(
                user_id = %user.id,
                started,
                current = self.generation(),
                "discarding stale refresh"
            );
            return Ok(Refresh::Superseded);
        }

        self.users.replace(Some(user.clone()));
        self.permissions.replace_all(&user.permissions);
        debug!(user_id = %user.id, "refresh applied");
        Ok(Refresh::Applied(user))
    }

    /// Adopt an existing session token, then refresh.
    pub async fn sign_in_with_token(&self, token: impl Into<String>) -> Result<SignIn> {
        let token = token.into();
        self.session.set_active_session(Some(token.clone()));
        info!("session token set");

        let refresh = self.refresh_from_server().await?;
        Ok(SignIn {
            session: token,
            user: refresh.into_user(),
        })
    }

    /// Sign in with email and password, then refresh.
    pub async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
        portal: Option<&str>,
    ) -> Result<SignIn> {
        let mut credentials = Credentials::new(email, password);
        if let Some(portal) = portal {
            credentials = credentials.with_portal(portal);
        }

        let response = match self
            .call("request_sign_in", self.service.request_sign_in(credentials))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "sign-in failed");
                return Err(e);
            }
        };

        self.session.set_active_session(Some(response.session.clone()));
        info!(portal = portal.unwrap_or("<default>"), "signed in");

        let refresh = self.refresh_from_server().await?;
        Ok(SignIn {
            session: response.session,
            user: refresh.into_user(),
        })
    }

    /// End the session and reset both stores.
    ///
    /// Returns the service's answer unchanged.
    pub async fn sign_out(&self) -> Result<bool> {
        let signed_out = match self
            .call("request_sign_out", self.service.request_sign_out())
            .await
        {
            Ok(signed_out) => signed_out,
            Err(e) => {
                warn!(error = %e, "sign-out failed");
                return Err(e);
            }
        };

        self.reset();
        info!(signed_out, "signed out");
        Ok(signed_out)
    }

    /// Register an account. Does not touch local state.
    pub async fn sign_up(&self, fields: SignUpFields) -> Result<bool> {
        self.call("request_sign_up", self.service.request_sign_up(fields))
            .await
    }

    /// React to the transport declaring the session invalid.
    ///
    /// Resets the stores, then calls the no-session hook.
    pub fn handle_session_invalidated(&self) {
        self.reset();
        info!("session invalidated");

        let hook = self.no_session.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Set the hook called after session invalidation.
    ///
    /// Replaces any previous hook.
    pub fn on_no_session<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.no_session.lock() = Some(Arc::new(hook));
    }

    /// Remove the no-session hook.
    pub fn clear_no_session_hook(&self) {
        *self.no_session.lock() = None;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn advance_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn reset(&self) {
        let _transition = self.transition.lock();
        self.advance_generation();
        self.session.set_active_session(None);
        self.users.clear();
        self.permissions.clear();
    }

    async fn call<T, F>(&self, operation: &'static str, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(operation.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionHolder;
    use crate::transport::memory::MemoryIdentityService;
    use idcache_core::{decode_rights, RawRights};
    use std::sync::atomic::AtomicUsize;

    struct Harness {
        service: Arc<MemoryIdentityService>,
        session: Arc<MemorySessionHolder>,
        controller: Arc<SessionController>,
    }

    fn harness(config: SyncConfig) -> Harness {
        let session = Arc::new(MemorySessionHolder::new());
        let service = Arc::new(MemoryIdentityService::new(session.clone()));
        service.add_account(
            "a@example.com",
            "pw",
            User::new("u1").with_permission("docs", RawRights::entity("e1", 0x03)),
        );
        let controller = SessionController::new(
            service.clone(),
            session.clone(),
            UserStore::new(),
            PermissionStore::new(),
            config,
        )
        .unwrap();
        Harness {
            service,
            session,
            controller,
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = SyncConfig::default().with_request_timeout(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_credentials_sign_in_applies_user() {
        let h = harness(SyncConfig::default());

        let sign_in = h
            .controller
            .sign_in_with_credentials("a@example.com", "pw", Some("admin"))
            .await
            .unwrap();

        assert_eq!(h.session.active_session(), Some(sign_in.session.clone()));
        assert_eq!(sign_in.user.map(|u| u.id), Some("u1".to_string()));
        assert_eq!(
            h.controller.permissions().rights("docs", Some("e1")),
            decode_rights(0x03)
        );
        assert_eq!(h.service.portals(), vec![Some("admin".to_string())]);
    }

    #[tokio::test]
    async fn test_failed_sign_in_leaves_state() {
        let h = harness(SyncConfig::default());
        let err = h
            .controller
            .sign_in_with_credentials("a@example.com", "bad", None)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Rejected { .. }));
        assert!(h.session.active_session().is_none());
        assert!(h.controller.users().current().is_none());
    }

    #[tokio::test]
    async fn test_refresh_propagates_transport_error() {
        let h = harness(SyncConfig::default());
        h.controller
            .sign_in_with_token(h.service.issue_session("a@example.com").unwrap())
            .await
            .unwrap();

        h.service.fail_next(SyncError::Transport("offline".into()));
        let err = h.controller.refresh_from_server().await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
        // State from the previous refresh is untouched.
        assert!(h.controller.users().current().is_some());
    }

    #[tokio::test]
    async fn test_rejected_session_is_consumed() {
        let h = harness(SyncConfig::default());
        let hooked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hooked);
        h.controller.on_no_session(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let refresh = h.controller.sign_in_with_token("unknown").await.unwrap();
        assert_eq!(refresh.user, None);
        assert!(h.session.active_session().is_none());
        assert_eq!(hooked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hook_replaced() {
        let h = harness(SyncConfig::default());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let c1 = Arc::clone(&first);
        h.controller.on_no_session(move || {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = Arc::clone(&second);
        h.controller.on_no_session(move || {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        h.service.invalidate();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        h.controller.clear_no_session_hook();
        h.service.invalidate();
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sign_out_resets() {
        let h = harness(SyncConfig::default());
        h.controller
            .sign_in_with_credentials("a@example.com", "pw", None)
            .await
            .unwrap();

        assert!(h.controller.sign_out().await.unwrap());
        assert!(h.session.active_session().is_none());
        assert!(h.controller.users().current().is_none());
        assert!(h.controller.permissions().snapshot().is_empty());
        assert_eq!(h.service.session_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_sign_out_keeps_state() {
        let h = harness(SyncConfig::default());
        h.controller
            .sign_in_with_credentials("a@example.com", "pw", None)
            .await
            .unwrap();

        h.service.fail_next(SyncError::Transport("offline".into()));
        assert!(h.controller.sign_out().await.is_err());
        assert!(h.controller.users().current().is_some());
        assert!(h.session.active_session().is_some());
    }

    #[tokio::test]
    async fn test_sign_up_is_pass_through() {
        let h = harness(SyncConfig::default());
        let versions = (
            h.controller.users().current(),
            h.controller.permissions().version(),
        );

        let mut fields = SignUpFields::new();
        fields.insert("email".into(), "new@example.com".into());
        assert!(h.controller.sign_up(fields).await.unwrap());

        assert_eq!(h.controller.users().current(), versions.0);
        assert_eq!(h.controller.permissions().version(), versions.1);
        assert_eq!(h.service.sign_ups().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_refresh_discarded_after_sign_out() {
        let h = harness(SyncConfig::default());
        h.controller
            .sign_in_with_credentials("a@example.com", "pw", None)
            .await
            .unwrap();

        h.service.hold_fetches();
        let controller = Arc::clone(&h.controller);
        let service = Arc::clone(&h.service);

        let (refresh, signed_out) = tokio::join!(controller.refresh_from_server(), async {
            let signed_out = h.controller.sign_out().await;
            service.release_fetch();
            signed_out
        });

        assert!(signed_out.unwrap());
        assert_eq!(refresh.unwrap(), Refresh::Superseded);
        assert!(h.controller.users().current().is_none());
        assert!(h.controller.permissions().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_stale_refresh_applied_when_guard_disabled() {
        let h = harness(SyncConfig::default().with_discard_stale_refresh(false));
        h.controller
            .sign_in_with_credentials("a@example.com", "pw", None)
            .await
            .unwrap();

        h.service.hold_fetches();
        let service = Arc::clone(&h.service);
        let (refresh, _) = tokio::join!(h.controller.refresh_from_server(), async {
            h.controller.handle_session_invalidated();
            service.release_fetch();
        });

        assert!(matches!(refresh.unwrap(), Refresh::Applied(_)));
        assert!(h.controller.users().current().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout() {
        let h = harness(SyncConfig::default().with_request_timeout(Duration::from_millis(50)));
        h.session
            .set_active_session(h.service.issue_session("a@example.com"));
        h.service.hold_fetches();

        let err = h.controller.refresh_from_server().await.unwrap_err();
        assert!(matches!(err, SyncError::Timeout(ref op) if op == "fetch_current_user"));
    }
}
