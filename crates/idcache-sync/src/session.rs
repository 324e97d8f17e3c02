//! The external session-token holder.

use std::fmt;

use parking_lot::RwLock;

/// Holds the active session token on behalf of the transport.
///
/// The controller only ever sets or clears the token; it never keeps a copy.
pub trait SessionHolder: Send + Sync {
    /// Set or clear the active session token.
    fn set_active_session(&self, token: Option<String>);

    /// The active session token, if any.
    fn active_session(&self) -> Option<String>;
}

/// In-memory session holder.
#[derive(Default)]
pub struct MemorySessionHolder {
    token: RwLock<Option<String>>,
}

impl MemorySessionHolder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionHolder for MemorySessionHolder {
    fn set_active_session(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    fn active_session(&self) -> Option<String> {
        self.token.read().clone()
    }
}

impl fmt::Debug for MemorySessionHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.token.read().is_some() {
            "active"
        } else {
            "none"
        };
        f.debug_struct("MemorySessionHolder")
            .field("session", &state)
            .finish()
    }
}
