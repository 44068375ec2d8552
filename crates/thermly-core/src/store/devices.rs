// ── Device and device-info tables ──

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::CoreError;
use crate::model::{Device, DeviceId, DeviceInfo};

/// Outcome of reconciling a fresh module list against known devices.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub added: Vec<DeviceId>,
    pub deactivated: Vec<DeviceId>,
}

/// Known devices (discovered at connect time) and their last info.
#[derive(Default)]
pub struct DeviceStore {
    devices: DashMap<DeviceId, Arc<Device>>,
    info: DashMap<DeviceId, Arc<DeviceInfo>>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert every listed device, then mark unlisted ones inactive.
    ///
    /// Inactive devices keep their info and registers; a later listing
    /// reactivates them.
    pub fn reconcile(&self, listed: Vec<Device>) -> Reconciled {
        let mut result = Reconciled::default();
        let incoming: HashSet<DeviceId> = listed.iter().map(|d| d.id.clone()).collect();

        for device in listed {
            if !self.devices.contains_key(&device.id) {
                result.added.push(device.id.clone());
            }
            self.devices.insert(device.id.clone(), Arc::new(device));
        }

        for mut entry in self.devices.iter_mut() {
            if entry.active && !incoming.contains(entry.key()) {
                Arc::make_mut(entry.value_mut()).active = false;
                result.deactivated.push(entry.key().clone());
            }
        }

        result.added.sort();
        result.deactivated.sort();
        result
    }

    pub fn get(&self, id: &DeviceId) -> Result<Arc<Device>, CoreError> {
        self.devices
            .get(id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| CoreError::device_not_found(id.to_string()))
    }

    /// All devices sorted by id.
    pub fn all(&self) -> Vec<Arc<Device>> {
        let mut devices: Vec<Arc<Device>> =
            self.devices.iter().map(|r| Arc::clone(r.value())).collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }

    /// Active devices sorted by id.
    pub fn active(&self) -> Vec<Arc<Device>> {
        let mut devices = self.all();
        devices.retain(|d| d.active);
        devices
    }

    pub fn set_info(&self, info: DeviceInfo) {
        self.info.insert(info.id.clone(), Arc::new(info));
    }

    pub fn info(&self, id: &DeviceId) -> Option<Arc<DeviceInfo>> {
        self.info.get(id).map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn device(module: &str, unit: &str) -> Device {
        Device {
            id: DeviceId::new(module, unit),
            module_name: format!("module {module}"),
            unit_name: format!("unit {unit}"),
            active: true,
        }
    }

    #[test]
    fn reconcile_adds_then_deactivates_missing() {
        let store = DeviceStore::new();
        let first = store.reconcile(vec![device("1", "1"), device("2", "1")]);
        assert_eq!(first.added.len(), 2);

        let second = store.reconcile(vec![device("1", "1"), device("3", "1")]);
        assert_eq!(second.added, vec![DeviceId::new("3", "1")]);
        assert_eq!(second.deactivated, vec![DeviceId::new("2", "1")]);

        assert_eq!(store.len(), 3);
        assert!(!store.get(&DeviceId::new("2", "1")).unwrap().active);
        assert_eq!(store.active().len(), 2);
    }

    #[test]
    fn relisted_device_is_reactivated() {
        let store = DeviceStore::new();
        store.reconcile(vec![device("1", "1")]);
        store.reconcile(vec![]);
        assert!(store.active().is_empty());

        let again = store.reconcile(vec![device("1", "1")]);
        assert!(again.added.is_empty());
        assert!(store.get(&DeviceId::new("1", "1")).unwrap().active);
    }

    #[test]
    fn unknown_device_is_not_found() {
        let store = DeviceStore::new();
        assert!(matches!(
            store.get(&DeviceId::new("9", "9")),
            Err(CoreError::NotFound { .. })
        ));
    }
}
