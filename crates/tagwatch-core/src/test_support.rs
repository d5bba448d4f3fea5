// ── In-crate fakes for unit tests ──

#![allow(clippy::unwrap_used)]

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::api::{AccountApi, LoginGrant};
use crate::config::AccountCredentials;
use crate::error::CoreError;
use crate::model::{Capability, CapabilityValue, DeviceKind, FlowEvent, PhoneRecord, Snapshot, TagRecord};
use crate::registry::DeviceRegistry;
use crate::session::{CredentialStore, Session};

// ── Builders ─────────────────────────────────────────────────────────

pub(crate) fn credentials() -> AccountCredentials {
    AccountCredentials {
        email: "user@example.com".into(),
        password: SecretString::from("hunter2".to_string()),
    }
}

pub(crate) fn session(token: &str, account_id: &str) -> Session {
    Session::new(SecretString::from(token.to_string()), account_id)
}

pub(crate) fn tag(mac: &str, connected: bool, battery_low: bool, battery_empty: bool) -> TagRecord {
    TagRecord {
        id: mac.into(),
        name: None,
        connected,
        battery_low,
        battery_empty,
    }
}

pub(crate) fn phone(id: &str, battery_level: Option<i64>) -> PhoneRecord {
    PhoneRecord {
        id: id.into(),
        name: None,
        battery_level,
    }
}

pub(crate) fn unauthorized() -> CoreError {
    CoreError::Unauthorized {
        message: "token expired".into(),
    }
}

pub(crate) fn rate_limited() -> CoreError {
    CoreError::RateLimited { status: 403 }
}

// ── Account API ──────────────────────────────────────────────────────

/// Scripted [`AccountApi`]. Fetches pop from a queue and fall back to an
/// empty snapshot once it runs dry.
#[derive(Default)]
pub(crate) struct FakeApi {
    fetches: Mutex<VecDeque<Result<Snapshot, CoreError>>>,
    grant: Mutex<Option<(String, String)>>,
    fail_ring: Mutex<bool>,
    fetch_tokens: Mutex<Vec<String>>,
    rings: Mutex<Vec<String>>,
    login_calls: AtomicUsize,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_fetch(&self, result: Result<Snapshot, CoreError>) {
        self.fetches.lock().unwrap().push_back(result);
    }

    pub(crate) fn grant(&self, token: &str, account_id: &str) {
        *self.grant.lock().unwrap() = Some((token.into(), account_id.into()));
    }

    pub(crate) fn reject_login(&self) {
        *self.grant.lock().unwrap() = None;
    }

    pub(crate) fn fail_ring(&self) {
        *self.fail_ring.lock().unwrap() = true;
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_tokens.lock().unwrap().len()
    }

    /// Tokens presented on each fetch, in order.
    pub(crate) fn fetch_tokens(&self) -> Vec<String> {
        self.fetch_tokens.lock().unwrap().clone()
    }

    pub(crate) fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn rings(&self) -> Vec<String> {
        self.rings.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccountApi for FakeApi {
    async fn fetch_account_state(
        &self,
        _account_id: &str,
        token: &SecretString,
    ) -> Result<Snapshot, CoreError> {
        self.fetch_tokens
            .lock()
            .unwrap()
            .push(token.expose_secret().to_owned());
        self.fetches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Snapshot::new(Vec::new(), Vec::new())))
    }

    async fn login(&self, _email: &str, _password: &SecretString) -> Result<LoginGrant, CoreError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        match self.grant.lock().unwrap().clone() {
            Some((token, account_id)) => Ok(LoginGrant {
                token: SecretString::from(token),
                account_id,
            }),
            None => Err(CoreError::Unauthorized {
                message: "invalid email or password".into(),
            }),
        }
    }

    async fn send_ring_command(
        &self,
        _account_id: &str,
        _token: &SecretString,
        device_id: &str,
    ) -> Result<(), CoreError> {
        self.rings.lock().unwrap().push(device_id.to_owned());
        if *self.fail_ring.lock().unwrap() {
            return Err(CoreError::Transport {
                message: "connection reset".into(),
            });
        }
        Ok(())
    }
}

// ── Device registry ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RegistryCall {
    Capability(String, Capability, CapabilityValue),
    Unavailable(String, String),
    Available(String),
    Flow(String, FlowEvent),
}

/// [`DeviceRegistry`] that records every call. Devices listed through
/// [`RecordingRegistry::fail_device`] reject everything.
#[derive(Default)]
pub(crate) struct RecordingRegistry {
    calls: Mutex<Vec<RegistryCall>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_device(&self, device_id: &str) {
        self.failing.lock().unwrap().insert(device_id.to_owned());
    }

    pub(crate) fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub(crate) fn flows(&self) -> Vec<(String, FlowEvent)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RegistryCall::Flow(id, event) => Some((id, event)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn writes(&self, capability: Capability) -> Vec<(String, CapabilityValue)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RegistryCall::Capability(id, cap, value) if cap == capability => Some((id, value)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn unavailable(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RegistryCall::Unavailable(id, _) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn available(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RegistryCall::Available(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, device_id: &str, call: RegistryCall) -> Result<(), CoreError> {
        if self.failing.lock().unwrap().contains(device_id) {
            return Err(CoreError::Registry {
                device: device_id.to_owned(),
                message: "device is gone".into(),
            });
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl DeviceRegistry for RecordingRegistry {
    async fn set_capability(
        &self,
        _kind: DeviceKind,
        device_id: &str,
        capability: Capability,
        value: CapabilityValue,
    ) -> Result<(), CoreError> {
        self.record(
            device_id,
            RegistryCall::Capability(device_id.to_owned(), capability, value),
        )
    }

    async fn set_unavailable(
        &self,
        _kind: DeviceKind,
        device_id: &str,
        reason: &str,
    ) -> Result<(), CoreError> {
        self.record(
            device_id,
            RegistryCall::Unavailable(device_id.to_owned(), reason.to_owned()),
        )
    }

    async fn set_available(&self, _kind: DeviceKind, device_id: &str) -> Result<(), CoreError> {
        self.record(device_id, RegistryCall::Available(device_id.to_owned()))
    }

    async fn trigger_flow(
        &self,
        _kind: DeviceKind,
        device_id: &str,
        event: FlowEvent,
    ) -> Result<(), CoreError> {
        self.record(device_id, RegistryCall::Flow(device_id.to_owned(), event))
    }
}

// ── Credential store ─────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct MemoryCredentials {
    credentials: Mutex<Option<AccountCredentials>>,
    session: Mutex<Session>,
    saved_sessions: AtomicUsize,
}

impl MemoryCredentials {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn with(credentials: AccountCredentials) -> Self {
        Self {
            credentials: Mutex::new(Some(credentials)),
            ..Self::default()
        }
    }

    pub(crate) fn with_session(self, session: Session) -> Self {
        *self.session.lock().unwrap() = session;
        self
    }

    pub(crate) fn saved_sessions(&self) -> usize {
        self.saved_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentials {
    async fn credentials(&self) -> Result<Option<AccountCredentials>, CoreError> {
        Ok(self.credentials.lock().unwrap().clone())
    }

    async fn store_credentials(&self, credentials: &AccountCredentials) -> Result<(), CoreError> {
        *self.credentials.lock().unwrap() = Some(credentials.clone());
        Ok(())
    }

    async fn load_session(&self) -> Result<Session, CoreError> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn save_session(&self, session: &Session) -> Result<(), CoreError> {
        *self.session.lock().unwrap() = session.clone();
        self.saved_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
