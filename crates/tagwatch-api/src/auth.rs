// Login exchange payloads
//
// The login endpoint registers a pseudo "device" alongside the user
// credentials. The web client identifies itself as a browser with a fresh
// random UUID on every login; we do the same.

use secrecy::SecretString;
use serde::Serialize;
use uuid::Uuid;

/// Session granted by a successful login exchange.
#[derive(Debug, Clone)]
pub struct LoginSession {
    /// Opaque session token, sent as `Chipolo-Token`.
    pub token: SecretString,
    /// Account identifier, sent as `Chipolo-User-Id` and used in paths.
    pub user_id: String,
}

/// The client "device" registered by the login call.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceDescriptor {
    pub uuid: Uuid,
    pub push_token: String,
    pub os: String,
    pub os_version: String,
    pub app_version: u32,
    pub model: String,
    pub lang: String,
    pub sandbox: u8,
    pub ble_enabled: u8,
    pub hidden: u8,
    pub battery_level: u8,
    pub data: DeviceDescriptorData,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceDescriptorData {
    pub name: String,
}

impl DeviceDescriptor {
    /// Descriptor matching what the web client sends, with a fresh UUID.
    pub fn web_browser() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            push_token: "/".into(),
            os: "web".into(),
            os_version: "1".into(),
            app_version: 2,
            model: "Web Browser".into(),
            lang: "en".into(),
            sandbox: 0,
            ble_enabled: 1,
            hidden: 0,
            battery_level: 100,
            data: DeviceDescriptorData {
                name: "Web Browser".into(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub auth: LoginAuth<'a>,
    pub device: DeviceDescriptor,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginAuth<'a> {
    pub email: &'a str,
    pub password: &'a str,
}
