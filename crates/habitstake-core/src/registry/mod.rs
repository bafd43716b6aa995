//! Habit and device registries.
//!
//! - [`habits`]: client-side habit CRUD over the state snapshot
//! - [`devices`]: server-side per-device habit snapshots

pub mod devices;
pub mod habits;

pub use devices::{device_id_for_endpoint, DeviceRecord, DeviceRegistry, DeviceScan};
