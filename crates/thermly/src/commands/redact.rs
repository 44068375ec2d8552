//! `--hide-sensitive` placeholders for output meant to be shared.
//!
//! Module ids are renumbered from 1112 in device order; names, owner, and
//! location are replaced with fixed values. Register data is left alone.

use std::collections::HashMap;
use std::sync::Arc;

use thermly_core::{Device, DeviceId, DeviceInfo};

const FIRST_MODULE_ID: u32 = 1112;
const HIDDEN_NAME: &str = "Hidden Name";

pub struct Redactor {
    module_ids: Option<HashMap<String, String>>,
}

impl Redactor {
    /// `devices` fixes the renumbering; pass every known device so ids
    /// stay stable whichever subset is shown.
    pub fn new(enabled: bool, devices: &[Arc<Device>]) -> Self {
        if !enabled {
            return Self { module_ids: None };
        }
        let mut modules: Vec<&str> = devices.iter().map(|d| d.id.module_id.as_str()).collect();
        modules.sort_unstable();
        modules.dedup();

        let module_ids = modules
            .into_iter()
            .zip(FIRST_MODULE_ID..)
            .map(|(real, fake)| (real.to_owned(), fake.to_string()))
            .collect();
        Self {
            module_ids: Some(module_ids),
        }
    }

    pub fn id(&self, id: &DeviceId) -> DeviceId {
        match &self.module_ids {
            Some(map) => DeviceId::new(
                map.get(&id.module_id)
                    .cloned()
                    .unwrap_or_else(|| FIRST_MODULE_ID.to_string()),
                id.unit_id.clone(),
            ),
            None => id.clone(),
        }
    }

    pub fn device(&self, device: &Device) -> Device {
        let mut out = device.clone();
        if self.module_ids.is_some() {
            out.id = self.id(&device.id);
            HIDDEN_NAME.clone_into(&mut out.module_name);
        }
        out
    }

    pub fn info(&self, info: &DeviceInfo) -> DeviceInfo {
        let mut out = info.clone();
        if self.module_ids.is_some() {
            out.id = self.id(&info.id);
            HIDDEN_NAME.clone_into(&mut out.module_name);
            out.name = Some("First".into());
            out.surname = Some("Last".into());
            out.latitude = Some(1.1);
            out.longitude = Some(-0.1);
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;

    fn device(module: &str, unit: &str) -> Arc<Device> {
        Arc::new(Device {
            id: DeviceId::new(module, unit),
            module_name: "Smith House".into(),
            unit_name: "Heat pump".into(),
            active: true,
        })
    }

    #[test]
    fn modules_are_renumbered_in_order() {
        let devices = vec![device("9001", "1"), device("9001", "2"), device("4711", "1")];
        let redactor = Redactor::new(true, &devices);

        assert_eq!(redactor.id(&DeviceId::new("4711", "1")).to_string(), "1112_1");
        assert_eq!(redactor.id(&DeviceId::new("9001", "2")).to_string(), "1113_2");
        assert_eq!(redactor.device(&devices[0]).module_name, HIDDEN_NAME);
    }

    #[test]
    fn disabled_redactor_is_identity() {
        let devices = vec![device("9001", "1")];
        let redactor = Redactor::new(false, &devices);
        assert_eq!(redactor.device(&devices[0]), *devices[0]);
    }

    #[test]
    fn info_hides_owner_and_location() {
        let devices = vec![device("9001", "1")];
        let info = DeviceInfo {
            id: DeviceId::new("9001", "1"),
            module_name: "Smith House".into(),
            unit_name: "Heat pump".into(),
            pump_type: Some("AQI".into()),
            country: Some("UK".into()),
            name: Some("Jane".into()),
            surname: Some("Smith".into()),
            latitude: Some(51.5),
            longitude: Some(-0.12),
            notes: None,
            extra: BTreeMap::new(),
            refreshed_at: Utc::now(),
        };

        let hidden = Redactor::new(true, &devices).info(&info);
        assert_eq!(hidden.id.to_string(), "1112_1");
        assert_eq!(hidden.name.as_deref(), Some("First"));
        assert_eq!(hidden.surname.as_deref(), Some("Last"));
        assert_eq!(hidden.latitude, Some(1.1));
        assert_eq!(hidden.pump_type.as_deref(), Some("AQI"));
    }
}
