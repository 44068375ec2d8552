// Legacy MasterTherm API (cookie session, form-encoded POSTs)

pub mod auth;
pub mod client;

pub use client::LegacyClient;
