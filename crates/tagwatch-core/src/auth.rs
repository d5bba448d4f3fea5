// ── Auth manager ──
//
// Owns the login exchange. Refresh re-runs it with the stored email and
// password; pairing runs it with credentials the user just typed. Only a
// successful exchange touches the session.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::api::AccountApi;
use crate::config::AccountCredentials;
use crate::error::CoreError;
use crate::session::{CredentialStore, Session, SessionStore};

pub struct AuthManager {
    session: Arc<SessionStore>,
    api: Arc<dyn AccountApi>,
    store: Arc<dyn CredentialStore>,
}

impl AuthManager {
    pub fn new(
        session: Arc<SessionStore>,
        api: Arc<dyn AccountApi>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            session,
            api,
            store,
        }
    }

    /// Log in again with the stored credentials.
    ///
    /// Fails with [`CoreError::MissingCredentials`] when nothing is stored.
    /// On any failure the session is left as it was.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let Some(credentials) = self.store.credentials().await? else {
            error!("no email or password stored, cannot log in");
            return Err(CoreError::MissingCredentials);
        };
        debug!(email = %credentials.email, "refreshing session");
        self.exchange(&credentials).await
    }

    /// Pairing login: exchange the supplied credentials and remember them
    /// for later refreshes.
    pub async fn login(&self, credentials: AccountCredentials) -> Result<(), CoreError> {
        self.exchange(&credentials).await?;
        self.store.store_credentials(&credentials).await
    }

    /// Mark the session logged out and persist the flag, so a restart
    /// does not resume with a token the server already rejected.
    pub async fn invalidate(&self) {
        self.session.invalidate();
        if let Err(e) = self.store.save_session(&self.session.current()).await {
            warn!(error = %e, "failed to persist session");
        }
    }

    async fn exchange(&self, credentials: &AccountCredentials) -> Result<(), CoreError> {
        let grant = match self
            .api
            .login(&credentials.email, &credentials.password)
            .await
        {
            Ok(grant) => grant,
            Err(e) => {
                error!(error = %e, "error during login");
                return Err(e);
            }
        };

        let session = Session::new(grant.token, grant.account_id);
        self.session.replace(session.clone());
        info!(account_id = ?session.account_id, "logged in");

        // The in-memory session is already usable; a persistence failure
        // only costs a re-login after restart.
        if let Err(e) = self.store.save_session(&session).await {
            warn!(error = %e, "failed to persist session");
        }
        Ok(())
    }
}
