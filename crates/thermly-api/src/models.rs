// Wire-level models shared by both API surfaces
//
// The legacy and REST APIs disagree on login and module listing but return
// the same body shapes for pump info and pump data. Parsing for those two
// lives here so both clients classify failures identically.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Raw register map: register code (`"A_500"`, `"I_418"`) to raw value.
///
/// Values are kept exactly as the server sent them, stringified when the
/// server used JSON numbers or booleans.
pub type Registers = BTreeMap<String, String>;

/// Raw device info map as returned by the pump-info endpoint.
pub type RawInfo = Map<String, Value>;

/// Server-side data timestamp (`lastUpdateTime`), seconds since the epoch.
///
/// Opaque to the client except for ordering; it is echoed back to the
/// server to request a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateTime(pub i64);

impl UpdateTime {
    /// The value the data endpoint understands as "send everything".
    pub const FULL: Self = Self(0);

    /// Step back by `secs`, never below zero.
    #[must_use]
    pub fn saturating_sub_secs(self, secs: i64) -> Self {
        Self(self.0.saturating_sub(secs).max(0))
    }
}

impl fmt::Display for UpdateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A heat-pump unit attached to a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub name: String,
}

/// A communication module (one installation) and its units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub name: String,
    pub units: Vec<Unit>,
}

/// Successful login: session material plus the account's module list.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub token: SecretString,
    /// Client-visible expiry; `None` when the server enforces expiry opaquely.
    pub expires_at: Option<DateTime<Utc>>,
    pub role: Option<String>,
    pub modules: Vec<Module>,
}

/// One data fetch: the registers carried by the response and the server
/// timestamp to use for the next delta request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpData {
    pub timestamp: UpdateTime,
    pub registers: Registers,
}

// ── Lenient scalar handling ──────────────────────────────────────────

/// Render a JSON scalar the way the legacy API would have sent it.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_owned()),
        _ => None,
    }
}

/// Read an integer that may arrive as a JSON number or a numeric string.
pub(crate) fn scalar_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ── Info body ────────────────────────────────────────────────────────

/// Vendor `returncode` meaning the session is no longer recognised.
const RETURNCODE_SESSION_LOST: i64 = 1;

/// Classify a pump-info body.
///
/// `returncode` 0 yields the map, 1 means the session was dropped server
/// side, anything else is a protocol error (unknown unit, etc.).
pub(crate) fn parse_info_body(body: &str) -> Result<RawInfo, Error> {
    let info: RawInfo =
        serde_json::from_str(body).map_err(|e| Error::malformed(&e, body.to_owned()))?;

    let code = info.get("returncode").and_then(scalar_to_i64).unwrap_or(0);
    let message = info
        .get("message")
        .and_then(scalar_to_string)
        .unwrap_or_default();

    match code {
        0 => Ok(info),
        RETURNCODE_SESSION_LOST => Err(Error::TokenInvalid {
            message: if message.is_empty() {
                "pump info rejected the session".into()
            } else {
                message
            },
        }),
        other => Err(Error::Api {
            code: other.to_string(),
            message,
        }),
    }
}

// ── Data body ────────────────────────────────────────────────────────

/// Vendor `errorId` returned when the session behind the request is gone.
const ERROR_ID_SESSION_LOST: i64 = 9;

/// Keys under `data` that hold the register var-file, newest layout first.
const VAR_FILE_KEYS: [&str; 3] = ["varFileData", "varfile_mt1_config1", "varfile_mt1_config2"];

#[derive(Deserialize)]
struct DataEnvelope {
    #[serde(default)]
    error: Option<DataError>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct DataError {
    #[serde(rename = "errorId", default)]
    error_id: Option<Value>,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

/// Classify a pump-data body and extract the register map.
pub(crate) fn parse_data_body(body: &str) -> Result<PumpData, Error> {
    let envelope: DataEnvelope =
        serde_json::from_str(body).map_err(|e| Error::malformed(&e, body.to_owned()))?;

    if let Some(err) = envelope.error {
        let id = err.error_id.as_ref().and_then(scalar_to_i64).unwrap_or(0);
        let message = err.error_message.unwrap_or_default();
        match id {
            0 => {}
            ERROR_ID_SESSION_LOST => {
                return Err(Error::TokenInvalid {
                    message: if message.is_empty() {
                        "pump data unavailable for this session".into()
                    } else {
                        message
                    },
                });
            }
            other => {
                return Err(Error::Api {
                    code: other.to_string(),
                    message,
                });
            }
        }
    }

    let timestamp = envelope
        .timestamp
        .as_ref()
        .and_then(scalar_to_i64)
        .map(UpdateTime)
        .ok_or_else(|| Error::Deserialization {
            message: "pump data response carries no timestamp".into(),
            body: body.to_owned(),
        })?;

    let data = envelope.data.unwrap_or_default();
    let var_file = VAR_FILE_KEYS
        .iter()
        .find_map(|key| data.get(*key))
        .or_else(|| data.values().next())
        .and_then(|file| file.get("001"))
        .and_then(Value::as_object);

    let registers = var_file
        .map(|regs| {
            regs.iter()
                .filter_map(|(code, raw)| scalar_to_string(raw).map(|v| (code.clone(), v)))
                .collect()
        })
        .unwrap_or_default();

    Ok(PumpData {
        timestamp,
        registers,
    })
}
