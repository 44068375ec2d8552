// ── API-to-domain conversions ──
//
// Bridges raw `thermly_api` responses into `thermly_core::model` types.
// Lenient on shape: the two API surfaces send the same fields with
// different JSON types (strings vs numbers).

use chrono::Utc;
use serde_json::Value;
use thermly_api::{Module, RawInfo};

use crate::model::{Device, DeviceId, DeviceInfo};

/// Fields consumed into typed slots, or protocol noise not worth keeping.
const CONSUMED_INFO_KEYS: [&str; 11] = [
    "returncode",
    "message",
    "moduleid",
    "unitid",
    "type",
    "country",
    "name",
    "surname",
    "latitude",
    "longitude",
    "notes",
];

fn text(info: &RawInfo, key: &str) -> Option<String> {
    match info.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coordinate(info: &RawInfo, key: &str) -> Option<f64> {
    match info.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Flatten a module list into devices, one per unit.
pub(crate) fn devices_from_modules(modules: &[Module]) -> Vec<Device> {
    modules
        .iter()
        .flat_map(|module| {
            module.units.iter().map(|unit| Device {
                id: DeviceId::new(module.id.clone(), unit.id.clone()),
                module_name: module.name.clone(),
                unit_name: unit.name.clone(),
                active: true,
            })
        })
        .collect()
}

pub(crate) fn device_info(device: &Device, info: RawInfo) -> DeviceInfo {
    DeviceInfo {
        id: device.id.clone(),
        module_name: device.module_name.clone(),
        unit_name: device.unit_name.clone(),
        pump_type: text(&info, "type"),
        country: text(&info, "country"),
        name: text(&info, "name"),
        surname: text(&info, "surname"),
        latitude: coordinate(&info, "latitude"),
        longitude: coordinate(&info, "longitude"),
        notes: text(&info, "notes"),
        extra: info
            .into_iter()
            .filter(|(key, _)| !CONSUMED_INFO_KEYS.contains(&key.as_str()))
            .collect(),
        refreshed_at: Utc::now(),
    }
}
