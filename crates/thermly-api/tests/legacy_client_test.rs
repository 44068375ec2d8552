#![allow(clippy::unwrap_used)]
// Integration tests for `LegacyClient` using wiremock.

use chrono::{Datelike, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use thermly_api::{Credentials, Error, LegacyClient, UpdateTime};

const LOGIN: &str = "/plugins/mastertherm_login/client_login.php";
const PUMPINFO: &str = "/plugins/get_pumpinfo/get_pumpinfo.php";
const PUMPDATA: &str = "/mt/PassiveVizualizationServlet";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, LegacyClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = LegacyClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn credentials() -> Credentials {
    Credentials::new("user", "secret")
}

fn token() -> SecretString {
    SecretString::from("sess-abc".to_owned())
}

fn login_body() -> serde_json::Value {
    json!({
        "returncode": 0,
        "message": "",
        "role": "400",
        "modules": [{
            "id": "1234",
            "module_name": "House",
            "config": [{"mb_addr": "1", "mb_name": "Heat pump"}]
        }]
    })
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .and(body_string_contains("uname=user"))
        .and(body_string_contains(
            "upwd=e5e9fa1ba31ecd1ae84f75caaa474f3a663f05f4",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "PHPSESSID=sess-abc; Max-Age=60; Path=/")
                .set_body_json(login_body()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let before = Utc::now();
    let login = client.login(&credentials()).await.unwrap();

    assert_eq!(login.token.expose_secret(), "sess-abc");
    assert_eq!(login.role.as_deref(), Some("400"));
    assert_eq!(login.modules.len(), 1);
    assert_eq!(login.modules[0].id, "1234");
    assert_eq!(login.modules[0].units[0].id, "1");

    let expires_at = login.expires_at.unwrap();
    assert!(expires_at > before);
    assert!(expires_at <= Utc::now() + chrono::TimeDelta::seconds(61));
}

#[tokio::test]
async fn test_login_uses_cookie_expires_attribute() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "set-cookie",
                    "PHPSESSID=sess-abc; Expires=Wed, 21 Oct 2099 07:28:00 GMT; Path=/",
                )
                .set_body_json(login_body()),
        )
        .mount(&server)
        .await;

    let login = client.login(&credentials()).await.unwrap();
    assert_eq!(login.expires_at.unwrap().year(), 2099);
}

#[tokio::test]
async fn test_login_without_expiry_defaults_to_one_hour() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "PHPSESSID=sess-abc; Path=/")
                .set_body_json(login_body()),
        )
        .mount(&server)
        .await;

    let login = client.login(&credentials()).await.unwrap();
    let remaining = login.expires_at.unwrap() - Utc::now();
    assert!(remaining > chrono::TimeDelta::minutes(59));
    assert!(remaining <= chrono::TimeDelta::minutes(60));
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "PHPSESSID=sess-abc; Path=/")
                .set_body_json(json!({
                    "returncode": 1,
                    "message": "User name or password is not correct"
                })),
        )
        .mount(&server)
        .await;

    let result = client.login(&credentials()).await;
    match result {
        Err(Error::Authentication { message }) => {
            assert_eq!(message, "User name or password is not correct");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_login_without_session_cookie() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .mount(&server)
        .await;

    let result = client.login(&credentials()).await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_bad_status_is_http_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let result = client.login(&credentials()).await;
    assert!(
        matches!(result, Err(Error::Http { status: 502, .. })),
        "expected Http error, got: {result:?}"
    );
}

// ── Pump info tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_device_info_sends_cookie_and_form() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(PUMPINFO))
        .and(header("cookie", "PHPSESSID=sess-abc"))
        .and(body_string_contains("moduleid=1234"))
        .and(body_string_contains("unitid=1"))
        .and(body_string_contains("application=android"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "returncode": "0",
            "moduleid": "1234",
            "type": "AQI",
            "country": "UK"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let info = client.device_info(&token(), "1234", "1").await.unwrap();
    assert_eq!(info["type"], "AQI");
    assert_eq!(info["country"], "UK");
}

#[tokio::test]
async fn test_device_info_session_lost() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(PUMPINFO))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "returncode": 1,
            "message": "Not logged in"
        })))
        .mount(&server)
        .await;

    let err = client.device_info(&token(), "1234", "1").await.unwrap_err();
    assert!(err.is_token_invalid(), "got: {err:?}");
}

#[tokio::test]
async fn test_device_info_forbidden_is_token_invalid() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(PUMPINFO))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client.device_info(&token(), "1234", "1").await.unwrap_err();
    assert!(err.is_token_invalid(), "got: {err:?}");
}

// ── Pump data tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_device_data_full_load() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(PUMPDATA))
        .and(body_string_contains("moduleId=1234"))
        .and(body_string_contains("deviceId=1"))
        .and(body_string_contains("lastUpdateTime=0"))
        .and(body_string_contains("fullRange=true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"errorId": 0, "errorMessage": ""},
            "messageId": 1,
            "timestamp": "1663341222",
            "data": {"varfile_mt1_config1": {"001": {"A_500": "46.2", "D_3": "1"}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let data = client.device_data(&token(), "1234", "1", None).await.unwrap();
    assert_eq!(data.timestamp, UpdateTime(1_663_341_222));
    assert_eq!(data.registers["A_500"], "46.2");
    assert_eq!(data.registers.len(), 2);
}

#[tokio::test]
async fn test_device_data_delta_sends_last_update_time() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(PUMPDATA))
        .and(body_string_contains("lastUpdateTime=1663341222"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"errorId": 0, "errorMessage": ""},
            "messageId": 1,
            "timestamp": "1663341282",
            "data": {"varfile_mt1_config1": {"001": {"A_500": "40.7"}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let data = client
        .device_data(&token(), "1234", "1", Some(UpdateTime(1_663_341_222)))
        .await
        .unwrap();
    assert_eq!(data.timestamp, UpdateTime(1_663_341_282));
    assert_eq!(data.registers.len(), 1);
}

#[tokio::test]
async fn test_device_data_unavailable_is_token_invalid() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(PUMPDATA))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"errorId": 9, "errorMessage": "Data unavailable"},
            "messageId": 1
        })))
        .mount(&server)
        .await;

    let err = client.device_data(&token(), "1234", "1", None).await.unwrap_err();
    assert!(err.is_token_invalid(), "got: {err:?}");
}

#[tokio::test]
async fn test_device_data_garbage_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(PUMPDATA))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.device_data(&token(), "1234", "1", None).await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}
