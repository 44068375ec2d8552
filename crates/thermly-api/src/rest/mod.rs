// MasterTherm REST API (bearer token, JSON)

pub mod client;

pub use client::RestClient;
