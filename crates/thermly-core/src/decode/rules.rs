// ── Register decode table ──
//
// Static data only: which register feeds which field, and how its raw
// value is read. The decoder walks these tables; nothing here has
// control flow of its own.
//
// Register families: `A_n` analog (decimal strings), `D_n` digital (0/1),
// `I_n` integer (counters, bit sets, character codes).

/// How a raw register value becomes a field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Non-zero number or `"true"`.
    Bool,
    /// Bit `bit` of an integer register.
    Flag { bit: u8 },
    /// Integer register equal to a sentinel.
    Equals(i64),
    /// Decimal value divided by `divisor`.
    Float { divisor: f64 },
    /// Integer value as-is.
    Int,
}

/// One register-to-field mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRule {
    pub field: &'static str,
    pub register: &'static str,
    pub kind: FieldKind,
}

impl FieldRule {
    const fn new(field: &'static str, register: &'static str, kind: FieldKind) -> Self {
        Self {
            field,
            register,
            kind,
        }
    }
}

/// Where a pad's display name comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadName {
    /// A run of character-code registers, read through [`CHAR_MAP`].
    Chars(&'static [&'static str]),
    /// A fixed label.
    Label(&'static str),
}

/// A pad: an optional circuit gated by an enabling register.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadRule {
    pub id: &'static str,
    pub enabled: &'static str,
    pub name: PadName,
    pub on: &'static str,
    pub fields: &'static [FieldRule],
}

/// Character codes used by pad name registers. Index 0 is a space.
pub const CHAR_MAP: &[char] = &[
    ' ', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '-',
    '_', '.', '/',
];

const fn bool_field(field: &'static str, register: &'static str) -> FieldRule {
    FieldRule::new(field, register, FieldKind::Bool)
}

const fn temp_field(field: &'static str, register: &'static str) -> FieldRule {
    FieldRule::new(field, register, FieldKind::Float { divisor: 1.0 })
}

/// Top-level fields of the decoded state.
pub static FIELDS: &[FieldRule] = &[
    // Operating flags
    bool_field("on", "D_3"),
    bool_field("cooling_mode", "D_4"),
    bool_field("compressor_running", "D_5"),
    bool_field("compressor2_running", "D_32"),
    bool_field("circulation_pump_running", "D_10"),
    bool_field("fan_running", "D_8"),
    bool_field("defrost", "D_11"),
    bool_field("aux_heater_1", "D_6"),
    bool_field("aux_heater_2", "D_7"),
    FieldRule::new("season_summer", "I_418", FieldKind::Flag { bit: 0 }),
    FieldRule::new("season_auto", "I_418", FieldKind::Flag { bit: 1 }),
    FieldRule::new("dhw_heating", "I_50", FieldKind::Equals(2)),
    // Temperatures (°C)
    temp_field("outside_temp", "A_3"),
    temp_field("requested_temp", "A_500"),
    temp_field("supply_temp", "A_1"),
    temp_field("return_temp", "A_2"),
    temp_field("evaporator_temp", "A_4"),
    temp_field("dhw_temp", "A_126"),
    temp_field("dhw_required_temp", "A_129"),
    // Counters
    FieldRule::new("compressor_run_hours", "I_11", FieldKind::Int),
    FieldRule::new("compressor_starts", "I_12", FieldKind::Int),
    // Electrical power, tenths of a kW
    FieldRule::new("power_kw", "I_52", FieldKind::Float { divisor: 10.0 }),
];

/// Pad catalog. Pads `pada`..`padf` are heating and hot-water circuits
/// named by the installer; `pool` has a fixed label.
pub static PADS: &[PadRule] = &[
    PadRule {
        id: "pada",
        enabled: "D_212",
        name: PadName::Chars(&["I_211", "I_212", "I_213", "I_214", "I_215", "I_216"]),
        on: "D_213",
        fields: &[
            temp_field("ambient_temp", "A_211"),
            temp_field("ambient_requested", "A_191"),
            temp_field("water_requested", "A_101"),
        ],
    },
    PadRule {
        id: "padb",
        enabled: "D_222",
        name: PadName::Chars(&["I_221", "I_222", "I_223", "I_224", "I_225", "I_226"]),
        on: "D_223",
        fields: &[
            temp_field("ambient_temp", "A_221"),
            temp_field("ambient_requested", "A_192"),
            temp_field("water_requested", "A_102"),
        ],
    },
    PadRule {
        id: "padc",
        enabled: "D_232",
        name: PadName::Chars(&["I_231", "I_232", "I_233", "I_234", "I_235", "I_236"]),
        on: "D_233",
        fields: &[
            temp_field("ambient_temp", "A_231"),
            temp_field("ambient_requested", "A_193"),
            temp_field("water_requested", "A_103"),
        ],
    },
    PadRule {
        id: "padd",
        enabled: "D_242",
        name: PadName::Chars(&["I_241", "I_242", "I_243", "I_244", "I_245", "I_246"]),
        on: "D_243",
        fields: &[
            temp_field("ambient_temp", "A_241"),
            temp_field("ambient_requested", "A_194"),
            temp_field("water_requested", "A_104"),
        ],
    },
    PadRule {
        id: "pade",
        enabled: "D_252",
        name: PadName::Chars(&["I_251", "I_252", "I_253", "I_254", "I_255", "I_256"]),
        on: "D_253",
        fields: &[
            temp_field("ambient_temp", "A_251"),
            temp_field("ambient_requested", "A_195"),
            temp_field("water_requested", "A_105"),
        ],
    },
    PadRule {
        id: "padf",
        enabled: "D_262",
        name: PadName::Chars(&["I_261", "I_262", "I_263", "I_264", "I_265", "I_266"]),
        on: "D_263",
        fields: &[
            temp_field("ambient_temp", "A_261"),
            temp_field("ambient_requested", "A_196"),
            temp_field("water_requested", "A_106"),
        ],
    },
    PadRule {
        id: "pool",
        enabled: "D_272",
        name: PadName::Label("Pool"),
        on: "D_273",
        fields: &[
            temp_field("water_temp", "A_271"),
            temp_field("water_requested", "A_272"),
        ],
    },
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn family(register: &str) -> &str {
        register.split('_').next().unwrap_or_default()
    }

    fn kind_fits_register(rule: &FieldRule) -> bool {
        match rule.kind {
            FieldKind::Bool => matches!(family(rule.register), "D" | "I"),
            FieldKind::Flag { bit } => family(rule.register) == "I" && bit < 16,
            FieldKind::Equals(_) | FieldKind::Int => family(rule.register) == "I",
            FieldKind::Float { divisor } => {
                matches!(family(rule.register), "A" | "I") && divisor > 0.0
            }
        }
    }

    #[test]
    fn top_level_field_names_are_unique() {
        let mut seen = HashSet::new();
        for rule in FIELDS {
            assert!(seen.insert(rule.field), "duplicate field {}", rule.field);
        }
    }

    #[test]
    fn every_rule_reads_a_compatible_register_family() {
        let all = FIELDS.iter().chain(PADS.iter().flat_map(|p| p.fields));
        for rule in all {
            assert!(kind_fits_register(rule), "{rule:?}");
        }
    }

    #[test]
    fn pads_are_unique_and_gated_by_digital_registers() {
        let mut ids = HashSet::new();
        for pad in PADS {
            assert!(ids.insert(pad.id), "duplicate pad {}", pad.id);
            assert_eq!(family(pad.enabled), "D", "{}", pad.id);
            assert_eq!(family(pad.on), "D", "{}", pad.id);
            if let PadName::Chars(registers) = pad.name {
                assert!(registers.iter().all(|r| family(r) == "I"), "{}", pad.id);
            }
        }
    }

    #[test]
    fn char_map_covers_letters_digits_and_punctuation() {
        assert_eq!(CHAR_MAP.len(), 41);
        assert_eq!(CHAR_MAP[1], 'A');
        assert_eq!(CHAR_MAP[26], 'Z');
        assert_eq!(CHAR_MAP[27], '0');
        assert_eq!(CHAR_MAP[37], '-');
        assert_eq!(CHAR_MAP[40], '/');
    }
}
