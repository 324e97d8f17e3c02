//! Identity service abstraction.
//!
//! The transport layer owns the network, retries and error shaping. The
//! controller only needs the operations below. Implementations may use HTTP,
//! WebSockets or anything else.

use std::sync::Arc;

use async_trait::async_trait;
use idcache_core::User;

use crate::error::Result;
use crate::messages::{Credentials, SignInResponse, SignUpFields};

/// Callback invoked when the transport decides the session is no longer valid.
pub type InvalidationListener = Arc<dyn Fn() + Send + Sync>;

/// Remote identity service.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Fetch the authenticated user.
    ///
    /// Fails with [`SyncError::SessionHandled`](crate::SyncError::SessionHandled)
    /// when the session was rejected and the invalidation listener has
    /// already been told.
    async fn fetch_current_user(&self) -> Result<User>;

    /// Exchange credentials for a session token.
    async fn request_sign_in(&self, credentials: Credentials) -> Result<SignInResponse>;

    /// End the active session.
    async fn request_sign_out(&self) -> Result<bool>;

    /// Register a new account.
    async fn request_sign_up(&self, fields: SignUpFields) -> Result<bool>;

    /// Register the global "session invalidated" listener.
    ///
    /// Replaces any previously registered listener.
    fn set_invalidation_listener(&self, listener: InvalidationListener);
}

/// An in-memory identity service for testing.
///
/// Accounts and sessions live in maps; tokens are random hex strings. The
/// active token is read from a shared [`SessionHolder`].
pub mod memory {
    use super::*;
    use std::collections::{HashMap, VecDeque};

    use parking_lot::Mutex;
    use rand::RngCore;
    use tokio::sync::Notify;

    use crate::error::SyncError;
    use crate::session::SessionHolder;

    struct Account {
        password: String,
        user: User,
    }

    #[derive(Default)]
    struct State {
        /// Email -> account.
        accounts: HashMap<String, Account>,
        /// Session token -> email.
        sessions: HashMap<String, String>,
        /// Errors returned by the next calls, in order.
        failures: VecDeque<SyncError>,
        /// Sign-up requests received.
        sign_ups: Vec<SignUpFields>,
        /// Portals named in sign-in requests.
        portals: Vec<Option<String>>,
    }

    /// In-memory [`IdentityService`].
    pub struct MemoryIdentityService {
        session: Arc<dyn SessionHolder>,
        state: Mutex<State>,
        listener: Mutex<Option<InvalidationListener>>,
        gate: Mutex<Option<Arc<Notify>>>,
    }

    impl MemoryIdentityService {
        /// Create a service that reads the active token from `session`.
        pub fn new(session: Arc<dyn SessionHolder>) -> Self {
            Self {
                session,
                state: Mutex::new(State::default()),
                listener: Mutex::new(None),
                gate: Mutex::new(None),
            }
        }

        /// Register an account.
        pub fn add_account(
            &self,
            email: impl Into<String>,
            password: impl Into<String>,
            user: User,
        ) {
            self.state.lock().accounts.insert(
                email.into(),
                Account {
                    password: password.into(),
                    user,
                },
            );
        }

        /// Replace an account's user record (e.g. permissions changed server-side).
        pub fn update_user(&self, email: &str, user: User) -> bool {
            match self.state.lock().accounts.get_mut(email) {
                Some(account) => {
                    account.user = user;
                    true
                }
                None => false,
            }
        }

        /// Open a session for `email` without a password check.
        pub fn issue_session(&self, email: &str) -> Option<String> {
            let mut state = self.state.lock();
            if !state.accounts.contains_key(email) {
                return None;
            }
            let token = new_token();
            state.sessions.insert(token.clone(), email.to_string());
            Some(token)
        }

        /// Forget a session token server-side.
        pub fn revoke_session(&self, token: &str) -> bool {
            self.state.lock().sessions.remove(token).is_some()
        }

        /// Make the next call fail with `error`.
        pub fn fail_next(&self, error: SyncError) {
            self.state.lock().failures.push_back(error);
        }

        /// Report the session as invalid, as a transport would after a 401.
        pub fn invalidate(&self) {
            let listener = self.listener.lock().clone();
            if let Some(listener) = listener {
                listener();
            }
        }

        /// Hold every `fetch_current_user` until [`release_fetch`](Self::release_fetch).
        ///
        /// The user is looked up before waiting, so a held fetch returns the
        /// data that was current when it started.
        pub fn hold_fetches(&self) {
            *self.gate.lock() = Some(Arc::new(Notify::new()));
        }

        /// Let one held fetch complete.
        pub fn release_fetch(&self) {
            if let Some(gate) = self.gate.lock().as_ref() {
                gate.notify_one();
            }
        }

        /// Stop holding fetches.
        pub fn open_gate(&self) {
            if let Some(gate) = self.gate.lock().take() {
                gate.notify_waiters();
            }
        }

        /// Sign-up requests received so far.
        pub fn sign_ups(&self) -> Vec<SignUpFields> {
            self.state.lock().sign_ups.clone()
        }

        /// Portals named in sign-in requests so far.
        pub fn portals(&self) -> Vec<Option<String>> {
            self.state.lock().portals.clone()
        }

        /// Number of open sessions.
        pub fn session_count(&self) -> usize {
            self.state.lock().sessions.len()
        }

        fn take_failure(&self) -> Option<SyncError> {
            self.state.lock().failures.pop_front()
        }

        fn lookup_active_user(&self) -> Option<User> {
            let token = self.session.active_session()?;
            let state = self.state.lock();
            let email = state.sessions.get(&token)?;
            state.accounts.get(email).map(|account| account.user.clone())
        }
    }

    #[async_trait]
    impl IdentityService for MemoryIdentityService {
        async fn fetch_current_user(&self) -> Result<User> {
            if let Some(error) = self.take_failure() {
                return Err(error);
            }

            let user = self.lookup_active_user();

            let gate = self.gate.lock().clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            match user {
                Some(user) => Ok(user),
                None => {
                    self.invalidate();
                    Err(SyncError::SessionHandled)
                }
            }
        }

        async fn request_sign_in(&self, credentials: Credentials) -> Result<SignInResponse> {
            if let Some(error) = self.take_failure() {
                return Err(error);
            }

            let mut state = self.state.lock();
            state.portals.push(credentials.portal.clone());

            let user = match state.accounts.get(&credentials.email) {
                Some(account) if account.password == credentials.password => {
                    account.user.clone()
                }
                _ => {
                    return Err(SyncError::Rejected {
                        status: 401,
                        message: "invalid credentials".into(),
                    })
                }
            };

            let token = new_token();
            state.sessions.insert(token.clone(), credentials.email);
            Ok(SignInResponse {
                session: token,
                user: Some(User::new(user.id)),
            })
        }

        async fn request_sign_out(&self) -> Result<bool> {
            if let Some(error) = self.take_failure() {
                return Err(error);
            }

            let Some(token) = self.session.active_session() else {
                return Ok(false);
            };
            Ok(self.state.lock().sessions.remove(&token).is_some())
        }

        async fn request_sign_up(&self, fields: SignUpFields) -> Result<bool> {
            if let Some(error) = self.take_failure() {
                return Err(error);
            }

            let mut state = self.state.lock();
            let taken = fields
                .get("email")
                .and_then(|email| email.as_str())
                .map(|email| state.accounts.contains_key(email))
                .unwrap_or(false);
            state.sign_ups.push(fields);
            Ok(!taken)
        }

        fn set_invalidation_listener(&self, listener: InvalidationListener) {
            *self.listener.lock() = Some(listener);
        }
    }

    fn new_token() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryIdentityService;
    use super::*;
    use crate::error::SyncError;
    use crate::session::{MemorySessionHolder, SessionHolder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service() -> (MemoryIdentityService, Arc<MemorySessionHolder>) {
        let session = Arc::new(MemorySessionHolder::new());
        let service = MemoryIdentityService::new(session.clone());
        service.add_account("a@example.com", "pw", User::new("u1"));
        (service, session)
    }

    #[tokio::test]
    async fn test_sign_in_then_fetch() {
        let (service, session) = service();

        let response = service
            .request_sign_in(Credentials::new("a@example.com", "pw"))
            .await
            .unwrap();
        assert_eq!(response.session.len(), 32);

        session.set_active_session(Some(response.session));
        let user = service.fetch_current_user().await.unwrap();
        assert_eq!(user.id, "u1");
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let (service, _) = service();
        let err = service
            .request_sign_in(Credentials::new("a@example.com", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Rejected { status: 401, .. }));
        assert_eq!(service.session_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_without_session_reports_invalidation() {
        let (service, _) = service();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        service.set_invalidation_listener(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let err = service.fetch_current_user().await.unwrap_err();
        assert!(matches!(err, SyncError::SessionHandled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fail_next_is_consumed() {
        let (service, session) = service();
        session.set_active_session(service.issue_session("a@example.com"));

        service.fail_next(SyncError::Transport("connection reset".into()));
        assert!(service.fetch_current_user().await.is_err());
        assert!(service.fetch_current_user().await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_up_reports_taken_email() {
        let (service, _) = service();
        let mut fields = SignUpFields::new();
        fields.insert("email".into(), "a@example.com".into());
        assert!(!service.request_sign_up(fields).await.unwrap());

        let mut fields = SignUpFields::new();
        fields.insert("email".into(), "b@example.com".into());
        assert!(service.request_sign_up(fields).await.unwrap());
        assert_eq!(service.sign_ups().len(), 2);
    }

    #[tokio::test]
    async fn test_open_gate_releases_every_held_fetch() {
        let (service, session) = service();
        session.set_active_session(service.issue_session("a@example.com"));
        service.hold_fetches();

        let (first, second, _) = tokio::join!(
            service.fetch_current_user(),
            service.fetch_current_user(),
            async {
                tokio::task::yield_now().await;
                service.open_gate();
            }
        );

        assert_eq!(first.unwrap().id, "u1");
        assert_eq!(second.unwrap().id, "u1");
        assert!(service.fetch_current_user().await.is_ok());
    }
}
