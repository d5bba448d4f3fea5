// ── Account API seam ──
//
// The three remote calls the engine makes, behind a trait so the poller
// and friends can run against fakes. `ChipoloClient` is the production
// implementation.

use async_trait::async_trait;
use secrecy::SecretString;

use tagwatch_api::ChipoloClient;

use crate::error::CoreError;
use crate::model::Snapshot;

/// Token and account id granted by a login exchange.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub token: SecretString,
    pub account_id: String,
}

#[async_trait]
pub trait AccountApi: Send + Sync {
    /// Fetch the current state of every device on the account.
    async fn fetch_account_state(
        &self,
        account_id: &str,
        token: &SecretString,
    ) -> Result<Snapshot, CoreError>;

    /// Exchange email/password for a fresh session.
    async fn login(&self, email: &str, password: &SecretString) -> Result<LoginGrant, CoreError>;

    /// Ask the service to ring a device.
    async fn send_ring_command(
        &self,
        account_id: &str,
        token: &SecretString,
        device_id: &str,
    ) -> Result<(), CoreError>;
}

#[async_trait]
impl AccountApi for ChipoloClient {
    async fn fetch_account_state(
        &self,
        account_id: &str,
        token: &SecretString,
    ) -> Result<Snapshot, CoreError> {
        let state = self.account_state(account_id, token).await?;
        Ok(Snapshot::from(state))
    }

    async fn login(&self, email: &str, password: &SecretString) -> Result<LoginGrant, CoreError> {
        let session = ChipoloClient::login(self, email, password).await?;
        Ok(LoginGrant {
            token: session.token,
            account_id: session.user_id,
        })
    }

    async fn send_ring_command(
        &self,
        account_id: &str,
        token: &SecretString,
        device_id: &str,
    ) -> Result<(), CoreError> {
        self.ring_device(account_id, token, device_id).await?;
        Ok(())
    }
}
