// thermly-api: Async Rust client for the MasterTherm heat-pump cloud APIs (Legacy + REST)

pub mod api;
pub mod auth;
pub mod error;
pub mod legacy;
pub mod models;
pub mod rest;
pub mod transport;

pub use api::{ApiClient, PumpApi};
pub use auth::{ApiVersion, Credentials};
pub use error::Error;
pub use legacy::LegacyClient;
pub use models::{LoginResponse, Module, PumpData, RawInfo, Registers, Unit, UpdateTime};
pub use rest::RestClient;
pub use transport::{TlsMode, TransportConfig};
