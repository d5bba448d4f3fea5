// ── Session state ──
//
// The current token / account id pair, swapped atomically so readers
// never block the poll cycle. Writers are the auth manager (login,
// refresh) and the poller (invalidate on 401); last writer wins.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use secrecy::SecretString;

use crate::config::AccountCredentials;
use crate::error::CoreError;

/// Credentials for the account API plus the logged-in flag.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub token: Option<SecretString>,
    pub account_id: Option<String>,
    pub logged_in: bool,
}

impl Session {
    pub fn new(token: SecretString, account_id: impl Into<String>) -> Self {
        Self {
            token: Some(token),
            account_id: Some(account_id.into()),
            logged_in: true,
        }
    }

    /// Token and account id, if both are present.
    ///
    /// A session flagged logged-out still returns its stale token: the
    /// remote side is the judge of whether it still works.
    pub fn credentials(&self) -> Option<(&str, &SecretString)> {
        match (&self.account_id, &self.token) {
            (Some(id), Some(token)) if !id.is_empty() => Some((id.as_str(), token)),
            _ => None,
        }
    }
}

/// Owner of the process-wide [`Session`].
#[derive(Debug)]
pub struct SessionStore {
    current: ArcSwap<Session>,
}

impl SessionStore {
    pub fn new(initial: Session) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Cheap snapshot of the current session.
    pub fn current(&self) -> Arc<Session> {
        self.current.load_full()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.load().logged_in
    }

    /// Replace the session after a successful login exchange.
    pub fn replace(&self, session: Session) {
        self.current.store(Arc::new(session));
    }

    /// Flag the session as logged out, keeping the stale token around.
    pub fn invalidate(&self) {
        self.current.rcu(|s| Session {
            logged_in: false,
            ..(**s).clone()
        });
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Session::default())
    }
}

/// Host-side persistence for credentials and the session.
///
/// Implemented by the settings layer of whatever hosts the engine; the
/// engine only reads credentials and writes back sessions.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stored email/password, if the user has provided them.
    async fn credentials(&self) -> Result<Option<AccountCredentials>, CoreError>;

    /// Remember the email/password pair from a successful pairing login.
    async fn store_credentials(&self, credentials: &AccountCredentials) -> Result<(), CoreError>;

    /// Last persisted session, used to seed the [`SessionStore`] at startup.
    async fn load_session(&self) -> Result<Session, CoreError>;

    /// Persist the current session.
    async fn save_session(&self, session: &Session) -> Result<(), CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn default_session_has_no_credentials() {
        let store = SessionStore::default();
        assert!(!store.is_logged_in());
        assert!(store.current().credentials().is_none());
    }

    #[test]
    fn invalidate_keeps_token_but_clears_flag() {
        let store = SessionStore::new(Session::new(SecretString::from("t".to_string()), "42"));
        assert!(store.is_logged_in());

        store.invalidate();

        let session = store.current();
        assert!(!session.logged_in);
        let (id, token) = session.credentials().unwrap_or_else(|| panic!("credentials dropped"));
        assert_eq!(id, "42");
        assert_eq!(token.expose_secret(), "t");
    }

    #[test]
    fn replace_is_last_writer_wins() {
        let store = SessionStore::default();
        store.replace(Session::new(SecretString::from("a".to_string()), "1"));
        store.replace(Session::new(SecretString::from("b".to_string()), "2"));
        let session = store.current();
        assert_eq!(session.account_id.as_deref(), Some("2"));
    }
}
