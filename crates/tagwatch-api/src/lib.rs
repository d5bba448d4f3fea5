// tagwatch-api: Async Rust client for the Chipolo account-state API

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use auth::{DeviceDescriptor, LoginSession};
pub use client::ChipoloClient;
pub use error::Error;
pub use models::{AccountState, ChipoloData, ChipoloRecord, PhoneRecord};
pub use transport::TransportConfig;
