#![allow(clippy::unwrap_used)]
// Controller behavior against an in-memory pump service.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use thermly_api::{
    ApiVersion, Credentials, Error, LoginResponse, Module, PumpApi, PumpData, RawInfo, Registers,
    Unit, UpdateTime,
};
use thermly_core::{
    ConnectionState, Controller, ControllerConfig, CoreError, DataOutcome, DeviceId,
};

// ── Fake service ────────────────────────────────────────────────────

#[derive(Default)]
struct FakeState {
    valid_token: Option<String>,
    reject_every_token: bool,
    modules: Vec<Module>,
    data: HashMap<String, VecDeque<PumpData>>,
    data_requests: Vec<(String, Option<UpdateTime>)>,
}

struct FakeApi {
    password: &'static str,
    logins: AtomicUsize,
    state: Mutex<FakeState>,
}

impl FakeApi {
    fn new(module_ids: &[&str]) -> Self {
        let modules = module_ids
            .iter()
            .map(|id| Module {
                id: (*id).to_owned(),
                name: format!("House {id}"),
                units: vec![Unit {
                    id: "1".into(),
                    name: "Heat pump".into(),
                }],
            })
            .collect();
        Self {
            password: "secret",
            logins: AtomicUsize::new(0),
            state: Mutex::new(FakeState {
                modules,
                ..FakeState::default()
            }),
        }
    }

    fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    /// Server forgets every session, as if they timed out.
    fn expire_sessions(&self) {
        self.state.lock().unwrap().valid_token = None;
    }

    fn queue_data(&self, module: &str, timestamp: i64, registers: &[(&str, &str)]) {
        self.state
            .lock()
            .unwrap()
            .data
            .entry(module.to_owned())
            .or_default()
            .push_back(PumpData {
                timestamp: UpdateTime(timestamp),
                registers: regs(registers),
            });
    }

    fn data_requests(&self) -> Vec<(String, Option<UpdateTime>)> {
        self.state.lock().unwrap().data_requests.clone()
    }

    fn check_token(&self, token: &SecretString) -> Result<(), Error> {
        let state = self.state.lock().unwrap();
        if state.reject_every_token || state.valid_token.as_deref() != Some(token.expose_secret())
        {
            return Err(Error::TokenInvalid {
                message: "Not logged in".into(),
            });
        }
        Ok(())
    }
}

impl PumpApi for FakeApi {
    fn api_version(&self) -> ApiVersion {
        ApiVersion::Legacy
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, Error> {
        tokio::task::yield_now().await;
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        if credentials.password.expose_secret() != self.password {
            return Err(Error::Authentication {
                message: "User name or password is not correct".into(),
            });
        }
        let token = format!("token-{n}");
        let mut state = self.state.lock().unwrap();
        state.valid_token = Some(token.clone());
        Ok(LoginResponse {
            token: SecretString::from(token),
            expires_at: None,
            role: Some("400".into()),
            modules: state.modules.clone(),
        })
    }

    async fn device_info(
        &self,
        token: &SecretString,
        module_id: &str,
        _unit_id: &str,
    ) -> Result<RawInfo, Error> {
        tokio::task::yield_now().await;
        self.check_token(token)?;
        let info = serde_json::json!({
            "returncode": "0",
            "type": "AQI",
            "country": "UK",
            "name": format!("Owner {module_id}"),
        });
        Ok(info.as_object().cloned().unwrap_or_default())
    }

    async fn device_data(
        &self,
        token: &SecretString,
        module_id: &str,
        _unit_id: &str,
        last_update_time: Option<UpdateTime>,
    ) -> Result<PumpData, Error> {
        tokio::task::yield_now().await;
        self.check_token(token)?;
        let mut state = self.state.lock().unwrap();
        state
            .data_requests
            .push((module_id.to_owned(), last_update_time));
        state
            .data
            .get_mut(module_id)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| Error::Api {
                code: "4".into(),
                message: "no data queued".into(),
            })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn regs(pairs: &[(&str, &str)]) -> Registers {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

fn config(password: &str) -> ControllerConfig {
    ControllerConfig::new(ApiVersion::Legacy, Credentials::new("user", password))
}

fn controller(modules: &[&str]) -> Controller<FakeApi> {
    let mut config = config("secret");
    config.max_concurrent_fetches = 4;
    Controller::with_api(FakeApi::new(modules), config)
}

fn device(module: &str) -> DeviceId {
    DeviceId::new(module, "1")
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_discovers_devices() {
    let controller = controller(&["1234", "5678"]);
    let reconciled = controller.connect().await.unwrap();

    assert_eq!(reconciled.added, vec![device("1234"), device("5678")]);
    assert_eq!(controller.get_devices().len(), 2);
    assert_eq!(controller.state(), ConnectionState::Connected);
    assert_eq!(controller.sessions().api().logins(), 1);
}

#[tokio::test]
async fn test_wrong_credentials_fail_without_retry() {
    let controller = Controller::with_api(FakeApi::new(&["1234"]), config("wrong"));

    let err = controller.connect().await.unwrap_err();
    assert!(matches!(err, CoreError::Authentication { .. }), "got {err:?}");
    assert_eq!(controller.state(), ConnectionState::Disconnected);
    assert_eq!(controller.sessions().api().logins(), 1);
}

#[tokio::test]
async fn test_refresh_before_connect_is_rejected() {
    let controller = controller(&["1234"]);
    assert!(matches!(
        controller.refresh_info().await,
        Err(CoreError::NotConnected)
    ));
    assert!(matches!(
        controller.refresh_data(false).await,
        Err(CoreError::NotConnected)
    ));
    assert_eq!(controller.sessions().api().logins(), 0);
}

#[tokio::test]
async fn test_state_advances_and_disconnect_resets() {
    let controller = controller(&["1234"]);
    controller.sessions().api().queue_data("1234", 100, &[("D_3", "1")]);
    let mut rx = controller.connection_state();

    controller.connect().await.unwrap();
    controller.refresh_data(false).await.unwrap();
    assert_eq!(*rx.borrow_and_update(), ConnectionState::DataLoaded);

    // Loading info after data does not move the state backwards.
    controller.refresh_info().await.unwrap();
    assert_eq!(controller.state(), ConnectionState::DataLoaded);

    controller.disconnect().await;
    assert_eq!(controller.state(), ConnectionState::Disconnected);
    // Fetched data stays readable.
    assert!(controller.get_device_data(&device("1234")).is_ok());
}

// ── Reauthentication ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_expired_session_reauthenticates_once_per_refresh() {
    let controller = controller(&["1", "2", "3", "4"]);
    controller.connect().await.unwrap();
    controller.sessions().api().expire_sessions();

    controller.refresh_info().await.unwrap();

    assert_eq!(controller.sessions().api().logins(), 2);
    for id in ["1", "2", "3", "4"] {
        let info = controller.get_device_info(&device(id)).unwrap();
        assert_eq!(info.country.as_deref(), Some("UK"));
    }
}

#[tokio::test]
async fn test_second_rejection_is_surfaced() {
    let controller = controller(&["1", "2"]);
    controller.connect().await.unwrap();
    controller.sessions().api().state.lock().unwrap().reject_every_token = true;

    let err = controller.refresh_info().await.unwrap_err();

    assert!(err.is_token_invalid(), "got {err:?}");
    // One login at connect, one reauth for the whole refresh.
    assert_eq!(controller.sessions().api().logins(), 2);
    assert!(controller.get_device_info(&device("1")).is_err());
}

#[tokio::test]
async fn test_each_refresh_gets_its_own_reauth() {
    let controller = controller(&["1234"]);
    controller.connect().await.unwrap();

    controller.sessions().api().expire_sessions();
    controller.refresh_info().await.unwrap();
    controller.sessions().api().expire_sessions();
    controller.refresh_info().await.unwrap();

    assert_eq!(controller.sessions().api().logins(), 3);
}

// ── Data refresh ────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_refresh_is_full_then_deltas_merge() {
    let controller = controller(&["1234"]);
    let api = controller.sessions().api();
    api.queue_data("1234", 100, &[("A_3", "4.2"), ("I_418", "2")]);
    api.queue_data("1234", 160, &[("A_3", "5.0")]);
    controller.connect().await.unwrap();

    let first = controller.refresh_data(false).await.unwrap();
    assert_eq!(first, vec![(device("1234"), DataOutcome::Replaced)]);

    let second = controller.refresh_data(false).await.unwrap();
    assert_eq!(second, vec![(device("1234"), DataOutcome::Merged)]);

    assert_eq!(
        api.data_requests(),
        vec![
            ("1234".to_owned(), None),
            ("1234".to_owned(), Some(UpdateTime(100))),
        ]
    );

    let registers = controller
        .get_device_registers(&device("1234"), false)
        .unwrap();
    assert_eq!(registers, regs(&[("A_3", "5.0"), ("I_418", "2")]));

    let last = controller
        .get_device_registers(&device("1234"), true)
        .unwrap();
    assert_eq!(last, regs(&[("A_3", "5.0")]));

    let state = controller.get_device_data(&device("1234")).unwrap();
    assert_eq!(state.float("outside_temp"), Some(5.0));
    assert_eq!(state.bool("season_auto"), Some(true));
}

#[tokio::test]
async fn test_forced_full_refresh_replaces_registers() {
    let controller = controller(&["1234"]);
    let api = controller.sessions().api();
    api.queue_data("1234", 100, &[("A_3", "4.2"), ("I_418", "2")]);
    api.queue_data("1234", 200, &[("A_3", "6.1")]);
    controller.connect().await.unwrap();

    controller.refresh_data(false).await.unwrap();
    let outcome = controller.refresh_data(true).await.unwrap();

    assert_eq!(outcome, vec![(device("1234"), DataOutcome::Replaced)]);
    assert_eq!(api.data_requests()[1].1, None);
    let registers = controller
        .get_device_registers(&device("1234"), false)
        .unwrap();
    assert_eq!(registers, regs(&[("A_3", "6.1")]));
}

#[tokio::test]
async fn test_delta_that_does_not_advance_is_discarded() {
    let controller = controller(&["1234"]);
    let api = controller.sessions().api();
    api.queue_data("1234", 100, &[("A_3", "4.2")]);
    api.queue_data("1234", 100, &[("A_3", "9.9")]);
    controller.connect().await.unwrap();

    controller.refresh_data(false).await.unwrap();
    let mut changes = controller.data_changes();
    changes.mark_unchanged();

    let outcome = controller.refresh_data(false).await.unwrap();

    assert_eq!(outcome, vec![(device("1234"), DataOutcome::Unchanged)]);
    let snapshot = controller.get_device_snapshot(&device("1234")).unwrap();
    assert_eq!(snapshot.registers["A_3"], "4.2");
    assert_eq!(snapshot.last_update_time, UpdateTime(100));
    assert!(!changes.has_changed().unwrap());
}

#[tokio::test]
async fn test_data_offset_steps_back_delta_request() {
    let mut config = config("secret");
    config.data_offset = Duration::from_secs(30);
    let controller = Controller::with_api(FakeApi::new(&["1234"]), config);
    let api = controller.sessions().api();
    api.queue_data("1234", 100, &[("A_3", "4.2")]);
    api.queue_data("1234", 160, &[("A_3", "5.0")]);
    controller.connect().await.unwrap();

    controller.refresh_data(false).await.unwrap();
    controller.refresh_data(false).await.unwrap();

    assert_eq!(api.data_requests()[1].1, Some(UpdateTime(70)));
}

#[tokio::test]
async fn test_elapsed_full_refresh_interval_forces_full_load() {
    let mut config = config("secret");
    config.full_refresh_interval = Some(Duration::ZERO);
    let controller = Controller::with_api(FakeApi::new(&["1234"]), config);
    let api = controller.sessions().api();
    api.queue_data("1234", 100, &[("A_3", "4.2")]);
    api.queue_data("1234", 160, &[("A_3", "5.0")]);
    controller.connect().await.unwrap();

    controller.refresh_data(false).await.unwrap();
    let outcome = controller.refresh_data(false).await.unwrap();

    assert_eq!(outcome[0].1, DataOutcome::Replaced);
    assert_eq!(api.data_requests()[1].1, None);
}

#[tokio::test]
async fn test_failed_device_does_not_block_others() {
    let controller = controller(&["1", "2"]);
    // Only device 2 has data; device 1's fetch fails.
    controller.sessions().api().queue_data("2", 100, &[("D_3", "1")]);
    controller.connect().await.unwrap();

    let err = controller.refresh_data(false).await.unwrap_err();

    assert!(matches!(err, CoreError::Connection { ref code, .. } if code == "4"));
    assert!(controller.get_device_data(&device("2")).is_ok());
    assert!(controller.get_device_data(&device("1")).is_err());
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reads_for_unknown_or_unfetched_devices() {
    let controller = controller(&["1234"]);
    controller.connect().await.unwrap();

    match controller.get_device_data(&device("9999")) {
        Err(CoreError::NotFound { entity, identifier }) => {
            assert_eq!(entity, "Device");
            assert_eq!(identifier, "9999_1");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    match controller.get_device_data(&device("1234")) {
        Err(CoreError::NotFound { entity, .. }) => assert_eq!(entity, "Device data"),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(matches!(
        controller.get_device_info(&device("1234")),
        Err(CoreError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_reconnect_deactivates_unlisted_devices() {
    let controller = controller(&["1", "2"]);
    controller.connect().await.unwrap();
    controller.sessions().api().state.lock().unwrap().modules.truncate(1);

    let reconciled = controller.connect().await.unwrap();

    assert_eq!(reconciled.deactivated, vec![device("2")]);
    assert_eq!(controller.get_devices().len(), 2);
    assert!(!controller.get_device(&device("2")).unwrap().active);

    // Inactive devices are skipped by refreshes.
    controller.refresh_info().await.unwrap();
    assert!(controller.get_device_info(&device("1")).is_ok());
    assert!(controller.get_device_info(&device("2")).is_err());
}
