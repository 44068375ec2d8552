// ── Device identity and metadata ──

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Composite key of a heat-pump unit: the module it hangs off and its
/// unit address on that module.
///
/// Rendered as `"{module_id}_{unit_id}"`, which is also what `FromStr`
/// accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId {
    pub module_id: String,
    pub unit_id: String,
}

impl DeviceId {
    pub fn new(module_id: impl Into<String>, unit_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            unit_id: unit_id.into(),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.module_id, self.unit_id)
    }
}

/// Error returned when a device id string is not `module_unit`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid device id {0:?} (expected MODULE_UNIT, e.g. 1234_1)")]
pub struct ParseDeviceIdError(String);

impl FromStr for DeviceId {
    type Err = ParseDeviceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('_') {
            Some((module, unit)) if !module.is_empty() && !unit.is_empty() => {
                Ok(Self::new(module, unit))
            }
            _ => Err(ParseDeviceIdError(s.to_owned())),
        }
    }
}

/// A device discovered from the account's module list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub module_name: String,
    pub unit_name: String,
    /// `false` once the device disappears from a later module list.
    /// Inactive devices keep their data but are skipped by refreshes.
    pub active: bool,
}

/// Static metadata for a device, replaced wholesale on every info refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub module_name: String,
    pub unit_name: String,
    /// Pump model code (`type` on the wire).
    pub pump_type: Option<String>,
    pub country: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
    /// Remaining raw fields, kept as sent.
    pub extra: BTreeMap<String, serde_json::Value>,
    pub refreshed_at: DateTime<Utc>,
}
