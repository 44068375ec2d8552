//! Shared helpers for command handlers.

use std::sync::Arc;

use thermly_core::{Controller, Device, DeviceId};

use crate::cli::DeviceArgs;
use crate::error::CliError;

/// Parse a `MODULE_UNIT` argument.
pub fn parse_device_id(raw: &str) -> Result<DeviceId, CliError> {
    raw.parse().map_err(|e: thermly_core::ParseDeviceIdError| CliError::Validation {
        field: "device".into(),
        reason: e.to_string(),
    })
}

/// The named device, or every active one when none was named.
pub fn select_devices(
    controller: &Controller,
    target: &DeviceArgs,
) -> Result<Vec<Arc<Device>>, CliError> {
    match target.device.as_deref() {
        Some(raw) => {
            let id = parse_device_id(raw)?;
            Ok(vec![controller.get_device(&id)?])
        }
        None => Ok(controller
            .get_devices()
            .into_iter()
            .filter(|d| d.active)
            .collect()),
    }
}

/// Format a decimal for table views.
pub fn fmt_opt_f64(value: Option<f64>) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v:.4}"))
}
