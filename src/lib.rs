//! Thermoband firmware library.
//!
//! Two programs share this crate: the wearable control loop (`thermoband`)
//! and the BLE-to-web relay (`ble-relay`). Everything below builds for the
//! host as well; ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod pins;
pub mod relay;

pub mod adapters;
pub mod drivers;
pub mod sensors;
