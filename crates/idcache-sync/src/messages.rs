//! Request and response payloads exchanged with the identity service.

use std::fmt;

use idcache_core::User;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Consumer-defined sign-up fields, forwarded verbatim.
pub type SignUpFields = Map<String, Value>;

/// Email/password sign-in request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    /// Portal the user signs in through, if the service distinguishes them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal: Option<String>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            portal: None,
        }
    }

    pub fn with_portal(mut self, portal: impl Into<String>) -> Self {
        self.portal = Some(portal.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("portal", &self.portal)
            .finish()
    }
}

/// Successful sign-in response.
#[derive(Clone, Serialize, Deserialize)]
pub struct SignInResponse {
    /// The new session token.
    pub session: String,
    /// Partial user record returned alongside the token, if any.
    #[serde(default)]
    pub user: Option<User>,
}

impl fmt::Debug for SignInResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInResponse")
            .field("session", &"<redacted>")
            .field("user", &self.user.as_ref().map(|u| &u.id))
            .finish()
    }
}
