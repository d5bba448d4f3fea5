// Account API HTTP client
//
// Wraps `reqwest::Client` with URL construction, session headers and
// status classification. The three endpoints the engine needs (login,
// account state, ring) are inherent methods.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::{DeviceDescriptor, LoginAuth, LoginRequest, LoginSession};
use crate::error::Error;
use crate::models::{AccountState, LoginResponse, PushNotification};
use crate::transport::TransportConfig;

/// Default API root. Paths are joined onto it, so it keeps its trailing slash.
pub const DEFAULT_BASE_URL: &str = "https://api.chipolo.com/v2/";

const TOKEN_HEADER: &str = "Chipolo-Token";
const USER_ID_HEADER: &str = "Chipolo-User-Id";

/// Raw HTTP client for the account API.
///
/// Stateless with respect to the session: every authenticated call takes
/// the account id and token explicitly, so the caller owns refresh logic.
#[derive(Clone)]
pub struct ChipoloClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ChipoloClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// A `base_url` without a trailing slash gets one, otherwise `Url::join`
    /// would drop its last path segment.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
        }
    }

    /// The API root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Exchange email/password for a session token and account id.
    ///
    /// `POST auth/login/chipolo`
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<LoginSession, Error> {
        let url = self.base_url.join("auth/login/chipolo")?;
        debug!("logging in at {}", url);

        let body = LoginRequest {
            auth: LoginAuth {
                email,
                password: password.expose_secret(),
            },
            device: DeviceDescriptor::web_browser(),
        };

        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login rejected (HTTP {status}): {}", preview(&body)),
            });
        }

        let parsed: LoginResponse = decode(resp).await?;
        let token = parsed
            .session
            .token
            .filter(|t| !t.is_empty())
            .ok_or(Error::IncompleteSession { field: "token" })?;
        let user_id = parsed
            .session
            .user_id
            .filter(|u| !u.is_empty())
            .ok_or(Error::IncompleteSession { field: "user_id" })?;

        debug!(user_id = %user_id, "login successful");
        Ok(LoginSession {
            token: SecretString::from(token),
            user_id,
        })
    }

    /// Fetch the full account state: every tag and phone with live fields.
    ///
    /// `GET user/{user_id}/state`
    pub async fn account_state(
        &self,
        user_id: &str,
        token: &SecretString,
    ) -> Result<AccountState, Error> {
        let url = self.base_url.join(&format!("user/{user_id}/state"))?;
        debug!("GET {}", url);

        let resp = Self::authed(self.http.get(url), user_id, token)
            .send()
            .await
            .map_err(Error::Transport)?;

        decode(resp).await
    }

    /// Send the "alert" push notification that makes a phone ring.
    ///
    /// `POST user/{user_id}/device/{device_id}/push-notification`
    pub async fn ring_device(
        &self,
        user_id: &str,
        token: &SecretString,
        device_id: &str,
    ) -> Result<(), Error> {
        let url = self
            .base_url
            .join(&format!("user/{user_id}/device/{device_id}/push-notification"))?;
        debug!("POST {}", url);

        let resp = Self::authed(self.http.post(url), user_id, token)
            .json(&PushNotification::alert())
            .send()
            .await
            .map_err(Error::Transport)?;

        check_status(resp).await.map(|_| ())
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn authed(
        builder: reqwest::RequestBuilder,
        user_id: &str,
        token: &SecretString,
    ) -> reqwest::RequestBuilder {
        builder
            .header(TOKEN_HEADER, token.expose_secret())
            .header(USER_ID_HEADER, user_id)
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let resp = check_status(resp).await?;
    let body = resp.text().await.map_err(Error::Transport)?;

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

/// Classify the response status: 401 is an expired session, 403 and 429
/// are throttling, anything else non-2xx is a plain API error.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "session expired or invalid token".into(),
        });
    }

    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimited {
            status: status.as_u16(),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            message: preview(&body).to_owned(),
        });
    }

    Ok(resp)
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
