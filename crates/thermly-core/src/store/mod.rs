// ── Data store ──
//
// Everything the controller has fetched: the device table with its info,
// and the per-device register snapshots.

mod devices;
mod registers;

pub use devices::{DeviceStore, Reconciled};
pub use registers::{RegisterSnapshot, RegisterStore};
