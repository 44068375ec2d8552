// ── Decode engine ──
//
// Turns a raw register map into named, typed values. The mapping lives in
// `rules` as plain tables; `decoder` is the single routine that reads them.

mod decoder;
pub mod rules;

pub use decoder::{DecodedState, FieldValue, PadState, decode};
