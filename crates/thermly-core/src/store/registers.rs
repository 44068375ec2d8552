// ── Register snapshot store ──
//
// Per-device raw register maps with their server timestamp. Full loads
// replace a device's map; deltas merge into it. Updates to one device run
// under that device's map entry, so two refreshes of the same device never
// interleave while different devices proceed independently.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use thermly_api::{Registers, UpdateTime};
use tokio::sync::watch;
use tracing::trace;

use crate::error::CoreError;
use crate::model::DeviceId;

/// Raw registers of one device as of its last fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterSnapshot {
    /// Every register seen so far (since the last full load).
    pub registers: Registers,
    /// Server timestamp of the newest data merged in.
    pub last_update_time: UpdateTime,
    /// Exactly the registers carried by the most recent fetch.
    pub last_delta: Registers,
    /// Local time of the last full load.
    pub last_full_load: DateTime<Utc>,
    /// Local time of the last replace or merge.
    pub refreshed_at: DateTime<Utc>,
}

/// Concurrent per-device register storage with change notification.
pub struct RegisterStore {
    by_device: DashMap<DeviceId, Arc<RegisterSnapshot>>,
    /// Bumped on every replace/merge.
    version: watch::Sender<u64>,
}

impl Default for RegisterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            by_device: DashMap::new(),
            version,
        }
    }

    /// Replace a device's registers wholesale.
    pub fn replace(&self, id: &DeviceId, registers: Registers, timestamp: UpdateTime) {
        let now = Utc::now();
        trace!(device = %id, registers = registers.len(), "replacing registers");
        let snapshot = RegisterSnapshot {
            last_delta: registers.clone(),
            registers,
            last_update_time: timestamp,
            last_full_load: now,
            refreshed_at: now,
        };
        self.by_device.insert(id.clone(), Arc::new(snapshot));
        self.bump_version();
    }

    /// Overwrite the registers present in `delta`, keep every other one.
    ///
    /// Runs unconditionally; deciding whether a delta is worth merging is
    /// the caller's job. Fails for a device that was never loaded.
    pub fn merge(
        &self,
        id: &DeviceId,
        delta: Registers,
        timestamp: UpdateTime,
    ) -> Result<(), CoreError> {
        {
            let mut entry = self
                .by_device
                .get_mut(id)
                .ok_or_else(|| CoreError::device_not_found(id.to_string()))?;
            let snapshot = Arc::make_mut(entry.value_mut());
            trace!(device = %id, registers = delta.len(), "merging registers");
            snapshot
                .registers
                .extend(delta.iter().map(|(k, v)| (k.clone(), v.clone())));
            snapshot.last_delta = delta;
            snapshot.last_update_time = timestamp;
            snapshot.refreshed_at = Utc::now();
        }
        self.bump_version();
        Ok(())
    }

    /// Read-only view of a device's registers (cheap `Arc` clone).
    pub fn snapshot(&self, id: &DeviceId) -> Result<Arc<RegisterSnapshot>, CoreError> {
        self.by_device
            .get(id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| CoreError::device_not_found(id.to_string()))
    }

    pub fn last_update_time(&self, id: &DeviceId) -> Option<UpdateTime> {
        self.by_device.get(id).map(|r| r.last_update_time)
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.by_device.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_device.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_device.is_empty()
    }

    /// Subscribe to the change counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump_version(&self) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn regs(pairs: &[(&str, &str)]) -> Registers {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn device() -> DeviceId {
        DeviceId::new("1234", "1")
    }

    #[test]
    fn merge_preserves_unseen_keys() {
        let store = RegisterStore::new();
        store.replace(&device(), regs(&[("A", "1"), ("B", "2")]), UpdateTime(10));
        store
            .merge(&device(), regs(&[("B", "3")]), UpdateTime(20))
            .unwrap();

        let snap = store.snapshot(&device()).unwrap();
        assert_eq!(snap.registers, regs(&[("A", "1"), ("B", "3")]));
        assert_eq!(snap.last_delta, regs(&[("B", "3")]));
        assert_eq!(snap.last_update_time, UpdateTime(20));
    }

    #[test]
    fn replace_discards_prior_state() {
        let store = RegisterStore::new();
        store.replace(&device(), regs(&[("A", "1"), ("B", "2")]), UpdateTime(10));
        store.replace(&device(), regs(&[("C", "4")]), UpdateTime(20));

        let snap = store.snapshot(&device()).unwrap();
        assert_eq!(snap.registers, regs(&[("C", "4")]));
    }

    #[test]
    fn merge_into_unknown_device_is_not_found() {
        let store = RegisterStore::new();
        let err = store
            .merge(&device(), regs(&[("A", "1")]), UpdateTime(1))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn snapshot_of_unknown_device_is_not_found() {
        let store = RegisterStore::new();
        assert!(matches!(
            store.snapshot(&device()),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn earlier_snapshots_are_not_affected_by_later_merges() {
        let store = RegisterStore::new();
        store.replace(&device(), regs(&[("A", "1")]), UpdateTime(10));
        let before = store.snapshot(&device()).unwrap();

        store
            .merge(&device(), regs(&[("A", "2")]), UpdateTime(20))
            .unwrap();

        assert_eq!(before.registers["A"], "1");
        assert_eq!(store.snapshot(&device()).unwrap().registers["A"], "2");
    }

    #[test]
    fn every_update_bumps_the_version() {
        let store = RegisterStore::new();
        let rx = store.subscribe();
        store.replace(&device(), regs(&[("A", "1")]), UpdateTime(10));
        store
            .merge(&device(), regs(&[("A", "2")]), UpdateTime(20))
            .unwrap();
        assert_eq!(*rx.borrow(), 2);
    }
}
