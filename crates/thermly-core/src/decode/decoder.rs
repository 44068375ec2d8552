// ── Register decoder ──
//
// One generic routine over the tables in `rules`. Total over any input:
// a missing or unparsable register yields the kind's default and a trace
// line, never an error.

use std::collections::BTreeMap;

use serde::Serialize;
use thermly_api::Registers;
use tracing::trace;

use super::rules::{CHAR_MAP, FIELDS, FieldKind, FieldRule, PADS, PadName, PadRule};

/// A decoded scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Float(f64),
    Int(i64),
}

/// An enabled pad.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PadState {
    pub name: String,
    pub on: bool,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl PadState {
    pub fn float(&self, field: &str) -> Option<f64> {
        match self.fields.get(field)? {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Semantic view of one device's registers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedState {
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
    /// Enabled pads only, keyed by pad id.
    pub pads: BTreeMap<String, PadState>,
}

impl DecodedState {
    pub fn get(&self, field: &str) -> Option<FieldValue> {
        self.fields.get(field).copied()
    }

    pub fn bool(&self, field: &str) -> Option<bool> {
        match self.get(field)? {
            FieldValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn float(&self, field: &str) -> Option<f64> {
        match self.get(field)? {
            FieldValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn int(&self, field: &str) -> Option<i64> {
        match self.get(field)? {
            FieldValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn pad(&self, id: &str) -> Option<&PadState> {
        self.pads.get(id)
    }
}

/// Decode a register map. Pure and deterministic.
pub fn decode(registers: &Registers) -> DecodedState {
    DecodedState {
        fields: decode_fields(registers, FIELDS),
        pads: PADS
            .iter()
            .filter(|pad| read_bool(registers, pad.enabled))
            .map(|pad| (pad.id.to_owned(), decode_pad(registers, pad)))
            .collect(),
    }
}

fn decode_fields(registers: &Registers, rules: &[FieldRule]) -> BTreeMap<String, FieldValue> {
    rules
        .iter()
        .map(|rule| (rule.field.to_owned(), decode_field(registers, rule)))
        .collect()
}

fn decode_pad(registers: &Registers, pad: &PadRule) -> PadState {
    let name = match pad.name {
        PadName::Label(label) => label.to_owned(),
        PadName::Chars(codes) => decode_name(registers, codes),
    };
    PadState {
        name,
        on: read_bool(registers, pad.on),
        fields: decode_fields(registers, pad.fields),
    }
}

fn decode_field(registers: &Registers, rule: &FieldRule) -> FieldValue {
    match rule.kind {
        FieldKind::Bool => FieldValue::Bool(read_bool(registers, rule.register)),
        FieldKind::Flag { bit } => FieldValue::Bool(
            read_int(registers, rule.register)
                .and_then(|v| v.checked_shr(u32::from(bit)))
                .is_some_and(|v| v & 1 == 1),
        ),
        FieldKind::Equals(sentinel) => {
            FieldValue::Bool(read_int(registers, rule.register) == Some(sentinel))
        }
        FieldKind::Float { divisor } => FieldValue::Float(
            read_float(registers, rule.register).map_or(0.0, |v| v / divisor),
        ),
        FieldKind::Int => FieldValue::Int(read_int(registers, rule.register).unwrap_or(0)),
    }
}

/// Map character-code registers to text; unknown codes are skipped.
fn decode_name(registers: &Registers, codes: &[&str]) -> String {
    let name: String = codes
        .iter()
        .filter_map(|register| read_int(registers, register))
        .filter_map(|code| usize::try_from(code).ok())
        .filter_map(|index| CHAR_MAP.get(index).copied())
        .collect();
    name.trim().to_owned()
}

// ── Raw readers ──────────────────────────────────────────────────────

fn raw<'a>(registers: &'a Registers, register: &str) -> Option<&'a str> {
    let value = registers.get(register).map(|v| v.trim());
    if value.is_none() {
        trace!(register, "register missing, using default");
    }
    value
}

fn read_bool(registers: &Registers, register: &str) -> bool {
    let Some(value) = raw(registers, register) else {
        return false;
    };
    if value.eq_ignore_ascii_case("true") {
        return true;
    }
    match value.parse::<f64>() {
        Ok(v) => v.abs() > f64::EPSILON,
        Err(_) => {
            trace!(register, value, "unparsable boolean register");
            false
        }
    }
}

fn read_int(registers: &Registers, register: &str) -> Option<i64> {
    let value = raw(registers, register)?;
    let parsed = value.parse::<i64>().ok();
    if parsed.is_none() {
        trace!(register, value, "unparsable integer register");
    }
    parsed
}

fn read_float(registers: &Registers, register: &str) -> Option<f64> {
    let value = raw(registers, register)?;
    let parsed = value.parse::<f64>().ok().filter(|v| v.is_finite());
    if parsed.is_none() {
        trace!(register, value, "unparsable decimal register");
    }
    parsed
}
