// ── Controller ──
//
// Orchestrates connect → refresh info → refresh data for every device on
// the account, and serves read-only views of what has been fetched. Reads
// never touch the network.

use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream;
use serde::Serialize;
use strum::Display;
use thermly_api::{ApiClient, PumpApi, Registers, UpdateTime};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::convert;
use crate::decode::{self, DecodedState};
use crate::error::CoreError;
use crate::model::{Device, DeviceId, DeviceInfo};
use crate::session::{RefreshCycle, SessionManager};
use crate::store::{DeviceStore, Reconciled, RegisterSnapshot, RegisterStore};

// ── ConnectionState ──────────────────────────────────────────────

/// Lifecycle stage, ordered: each stage implies the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionState {
    Disconnected,
    Connected,
    InfoLoaded,
    DataLoaded,
}

/// What a data refresh did to one device's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DataOutcome {
    /// Full dataset fetched; snapshot replaced.
    Replaced,
    /// Delta fetched and merged.
    Merged,
    /// Delta fetched but its timestamp did not advance; discarded.
    Unchanged,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Generic over the API
/// capability so tests can substitute an in-memory server.
pub struct Controller<A: PumpApi = ApiClient> {
    inner: Arc<ControllerInner<A>>,
}

impl<A: PumpApi> Clone for Controller<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<A: PumpApi> {
    config: ControllerConfig,
    sessions: SessionManager<A>,
    devices: DeviceStore,
    registers: RegisterStore,
    connection_state: watch::Sender<ConnectionState>,
}

impl Controller<ApiClient> {
    /// Build a controller for the API variant named in `config`. Does not
    /// connect; call [`connect()`](Self::connect).
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let api = ApiClient::new(
            config.api_version,
            config.base_url.clone(),
            &config.transport(),
        )?;
        Ok(Self::with_api(api, config))
    }
}

impl<A: PumpApi> Controller<A> {
    /// Build a controller around an existing API implementation.
    pub fn with_api(api: A, config: ControllerConfig) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let sessions = SessionManager::new(api, config.credentials.clone());
        Self {
            inner: Arc::new(ControllerInner {
                config,
                sessions,
                devices: DeviceStore::new(),
                registers: RegisterStore::new(),
                connection_state,
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn sessions(&self) -> &SessionManager<A> {
        &self.inner.sessions
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Authenticate and load the device list.
    ///
    /// Calling it again reloads the list: unlisted devices turn inactive,
    /// new ones are added. Login failures are returned as-is, no retry.
    pub async fn connect(&self) -> Result<Reconciled, CoreError> {
        let auth = self.inner.sessions.authenticate().await?;
        let reconciled = self
            .inner
            .devices
            .reconcile(convert::devices_from_modules(&auth.modules));

        for id in &reconciled.deactivated {
            warn!(device = %id, "device no longer listed, marking inactive");
        }

        self.advance(ConnectionState::Connected);
        info!(
            devices = self.inner.devices.len(),
            added = reconciled.added.len(),
            role = auth.session.role.as_deref().unwrap_or("-"),
            "connected"
        );
        Ok(reconciled)
    }

    /// Drop the session. Fetched data stays readable.
    pub async fn disconnect(&self) {
        self.inner.sessions.invalidate().await;
        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// Fetch device info for every active device, replacing prior info.
    ///
    /// Devices are fetched with up to `max_concurrent_fetches` in flight.
    /// Successful devices are stored even when another fails; the first
    /// failure (by device id) is returned.
    pub async fn refresh_info(&self) -> Result<(), CoreError> {
        self.require_connected()?;
        let cycle = RefreshCycle::new();
        let devices = self.inner.devices.active();

        let results = self
            .fan_out(&devices, |device| self.refresh_device_info(&cycle, device))
            .await;

        first_error(results)?;
        self.advance(ConnectionState::InfoLoaded);
        info!(devices = devices.len(), "info refresh complete");
        Ok(())
    }

    /// Fetch register data for every active device.
    ///
    /// A device with no snapshot, or `full = true`, or whose last full load
    /// is older than `full_refresh_interval`, gets a full load that replaces
    /// its registers. Every other device gets a delta since its last update
    /// time (less `data_offset`) that is merged in.
    pub async fn refresh_data(&self, full: bool) -> Result<Vec<(DeviceId, DataOutcome)>, CoreError> {
        self.require_connected()?;
        let cycle = RefreshCycle::new();
        let devices = self.inner.devices.active();

        let results = self
            .fan_out(&devices, |device| {
                self.refresh_device_data(&cycle, device, full)
            })
            .await;

        let outcomes = first_error(results)?;
        self.advance(ConnectionState::DataLoaded);

        let count = |o: DataOutcome| outcomes.iter().filter(|(_, x)| *x == o).count();
        info!(
            devices = outcomes.len(),
            replaced = count(DataOutcome::Replaced),
            merged = count(DataOutcome::Merged),
            unchanged = count(DataOutcome::Unchanged),
            "data refresh complete"
        );
        Ok(outcomes)
    }

    // ── Read accessors (no network) ──────────────────────────────

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.connection_state.borrow()
    }

    /// Every known device, including inactive ones, sorted by id.
    pub fn get_devices(&self) -> Vec<Arc<Device>> {
        self.inner.devices.all()
    }

    pub fn get_device(&self, id: &DeviceId) -> Result<Arc<Device>, CoreError> {
        self.inner.devices.get(id)
    }

    pub fn get_device_info(&self, id: &DeviceId) -> Result<Arc<DeviceInfo>, CoreError> {
        self.inner.devices.get(id)?;
        self.inner
            .devices
            .info(id)
            .ok_or_else(|| not_fetched("Device info", id))
    }

    /// Decode the device's current registers.
    pub fn get_device_data(&self, id: &DeviceId) -> Result<DecodedState, CoreError> {
        let snapshot = self.get_device_snapshot(id)?;
        Ok(decode::decode(&snapshot.registers))
    }

    /// Raw registers: everything known, or only what the last fetch carried.
    pub fn get_device_registers(
        &self,
        id: &DeviceId,
        last_update_only: bool,
    ) -> Result<Registers, CoreError> {
        let snapshot = self.get_device_snapshot(id)?;
        Ok(if last_update_only {
            snapshot.last_delta.clone()
        } else {
            snapshot.registers.clone()
        })
    }

    pub fn get_device_snapshot(&self, id: &DeviceId) -> Result<Arc<RegisterSnapshot>, CoreError> {
        self.inner.devices.get(id)?;
        self.inner
            .registers
            .snapshot(id)
            .map_err(|_| not_fetched("Device data", id))
    }

    /// Change counter bumped whenever any device's registers change.
    pub fn data_changes(&self) -> watch::Receiver<u64> {
        self.inner.registers.subscribe()
    }

    // ── Internals ────────────────────────────────────────────────

    fn require_connected(&self) -> Result<(), CoreError> {
        if self.state() == ConnectionState::Disconnected {
            return Err(CoreError::NotConnected);
        }
        Ok(())
    }

    /// Move the state forward; never backwards.
    fn advance(&self, to: ConnectionState) {
        self.inner.connection_state.send_if_modified(|state| {
            if *state < to {
                *state = to;
                true
            } else {
                false
            }
        });
    }

    /// Run `op` for each device with bounded concurrency; results sorted
    /// by device id.
    async fn fan_out<'a, T, F, Fut>(
        &self,
        devices: &'a [Arc<Device>],
        op: F,
    ) -> Vec<(DeviceId, Result<T, CoreError>)>
    where
        F: Fn(&'a Device) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let limit = self.inner.config.max_concurrent_fetches.max(1);
        let mut results: Vec<(DeviceId, Result<T, CoreError>)> = stream::iter(devices)
            .map(|device| {
                let device: &'a Device = device;
                let fut = op(device);
                async move { (device.id.clone(), fut.await) }
            })
            .buffer_unordered(limit)
            .collect()
            .await;
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    async fn refresh_device_info(
        &self,
        cycle: &RefreshCycle,
        device: &Device,
    ) -> Result<(), CoreError> {
        let api = self.inner.sessions.api();
        let (module_id, unit_id) = (&device.id.module_id, &device.id.unit_id);

        let raw = cycle
            .with_reauth(&self.inner.sessions, |token| async move {
                api.device_info(&token, module_id, unit_id).await
            })
            .await?;

        debug!(device = %device.id, fields = raw.len(), "device info fetched");
        self.inner.devices.set_info(convert::device_info(device, raw));
        Ok(())
    }

    async fn refresh_device_data(
        &self,
        cycle: &RefreshCycle,
        device: &Device,
        full: bool,
    ) -> Result<DataOutcome, CoreError> {
        let api = self.inner.sessions.api();
        let id = &device.id;
        let since = if full { None } else { self.delta_since(id) };

        let data = cycle
            .with_reauth(&self.inner.sessions, |token| async move {
                api.device_data(&token, &id.module_id, &id.unit_id, since)
                    .await
            })
            .await?;

        if since.is_none() {
            debug!(device = %id, registers = data.registers.len(), timestamp = %data.timestamp, "full load");
            self.inner
                .registers
                .replace(id, data.registers, data.timestamp);
            return Ok(DataOutcome::Replaced);
        }

        let stored = self.inner.registers.last_update_time(id);
        if stored.is_some_and(|t| data.timestamp <= t) {
            warn!(
                device = %id,
                timestamp = %data.timestamp,
                "update time did not advance, discarding delta"
            );
            return Ok(DataOutcome::Unchanged);
        }

        debug!(device = %id, registers = data.registers.len(), timestamp = %data.timestamp, "delta merged");
        self.inner
            .registers
            .merge(id, data.registers, data.timestamp)?;
        Ok(DataOutcome::Merged)
    }

    /// Timestamp to request a delta from, or `None` when a full load is due.
    fn delta_since(&self, id: &DeviceId) -> Option<UpdateTime> {
        let snapshot = self.inner.registers.snapshot(id).ok()?;
        let config = &self.inner.config;

        if let Some(interval) = config.full_refresh_interval {
            let age = (Utc::now() - snapshot.last_full_load)
                .to_std()
                .unwrap_or_default();
            if age >= interval {
                debug!(device = %id, "full refresh interval elapsed");
                return None;
            }
        }

        let offset = i64::try_from(config.data_offset.as_secs()).unwrap_or(i64::MAX);
        Some(snapshot.last_update_time.saturating_sub_secs(offset))
    }
}

fn not_fetched(entity: &str, id: &DeviceId) -> CoreError {
    CoreError::NotFound {
        entity: entity.into(),
        identifier: id.to_string(),
    }
}

/// Unzip per-device results, returning the first failure.
fn first_error<T>(
    results: Vec<(DeviceId, Result<T, CoreError>)>,
) -> Result<Vec<(DeviceId, T)>, CoreError> {
    let mut ok = Vec::with_capacity(results.len());
    let mut first = None;
    for (id, result) in results {
        match result {
            Ok(value) => ok.push((id, value)),
            Err(err) => {
                warn!(device = %id, error = %err, "device refresh failed");
                first.get_or_insert(err);
            }
        }
    }
    match first {
        Some(err) => Err(err),
        None => Ok(ok),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn connection_states_are_ordered() {
        assert!(ConnectionState::Disconnected < ConnectionState::Connected);
        assert!(ConnectionState::Connected < ConnectionState::InfoLoaded);
        assert!(ConnectionState::InfoLoaded < ConnectionState::DataLoaded);
        assert_eq!(ConnectionState::InfoLoaded.to_string(), "info-loaded");
    }

    #[test]
    fn first_error_keeps_device_order() {
        let a = DeviceId::new("1", "1");
        let b = DeviceId::new("2", "1");
        let results: Vec<(DeviceId, Result<(), CoreError>)> = vec![
            (a.clone(), Err(CoreError::NotConnected)),
            (b, Err(CoreError::device_not_found("x"))),
        ];
        assert!(matches!(
            first_error(results),
            Err(CoreError::NotConnected)
        ));
        assert_eq!(first_error::<()>(vec![(a, Ok(()))]).unwrap().len(), 1);
    }
}
