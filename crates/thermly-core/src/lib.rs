//! Telemetry layer between `thermly-api` and its consumers (CLI, scripts).
//!
//! This crate owns session handling, register storage, and decoding for a
//! MasterTherm account:
//!
//! - **[`Controller`]**: Central facade. [`connect()`](Controller::connect)
//!   logs in and discovers devices; [`refresh_info()`](Controller::refresh_info)
//!   and [`refresh_data()`](Controller::refresh_data) fetch every active
//!   device with bounded concurrency. Read accessors never touch the network.
//!
//! - **[`SessionManager`]**: One session per controller, shared by all
//!   fetches. A token rejected mid-refresh triggers a single re-login for the
//!   whole refresh, then each failed fetch is retried once.
//!
//! - **[`RegisterStore`]**: Per-device raw register maps (`DashMap` +
//!   `tokio::sync::watch` change counter). Full loads replace, deltas merge.
//!
//! - **[`decode`]**: Table-driven translation of raw registers into named
//!   values and enabled pads.

pub mod config;
pub mod controller;
pub(crate) mod convert;
pub mod decode;
pub mod error;
pub mod model;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ControllerConfig, TlsVerification};
pub use controller::{ConnectionState, Controller, DataOutcome};
pub use decode::{DecodedState, FieldValue, PadState, decode};
pub use error::CoreError;
pub use session::{Authentication, Session, SessionManager};
pub use store::{DeviceStore, Reconciled, RegisterSnapshot, RegisterStore};

// ── Model re-exports ────────────────────────────────────────────────
pub use model::{Device, DeviceId, DeviceInfo, ParseDeviceIdError};

// ── API re-exports consumers need to build a config ─────────────────
pub use thermly_api::{ApiVersion, Credentials, PumpApi, Registers, UpdateTime};
