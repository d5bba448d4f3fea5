// Wire types for the account-state and login endpoints.
//
// The service encodes booleans as 0/1 integers and the user id as either a
// JSON number or a string depending on the endpoint; both are normalized here.

use serde::{Deserialize, Deserializer};

/// `GET user/{id}/state` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountState {
    /// Bluetooth tags on the account.
    #[serde(default)]
    pub chipolos: Vec<ChipoloRecord>,
    /// Phones registered with the account.
    #[serde(default)]
    pub devices: Vec<PhoneRecord>,
}

/// One tag as reported by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct ChipoloRecord {
    pub mac: String,
    #[serde(default, deserialize_with = "flag")]
    pub ble_connected: bool,
    #[serde(default)]
    pub data: ChipoloData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChipoloData {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub battery_low: bool,
    #[serde(default, deserialize_with = "flag")]
    pub battery_empty: bool,
}

/// One phone as reported by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub battery_level: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

// ── Login ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub session: LoginSessionPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginSessionPayload {
    pub token: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub user_id: Option<String>,
}

// ── Ring ────────────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
pub(crate) struct PushNotification {
    pub message: PushMessage,
}

#[derive(Debug, serde::Serialize)]
pub(crate) struct PushMessage {
    pub call: &'static str,
    pub message: bool,
}

impl PushNotification {
    pub(crate) fn alert() -> Self {
        Self {
            message: PushMessage {
                call: "alert",
                message: false,
            },
        }
    }
}

// ── Lenient field decoders ──────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

/// Accept `0`/`1` integers as well as JSON booleans.
fn flag<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    Ok(match Option::<Flag>::deserialize(de)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(n)) => n == 1,
        None => false,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(v: StringOrNumber) -> Self {
        match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(de).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(de)?.map(String::from))
}
