//! BLE-to-web relay.
//!
//! A Wi-Fi access point serves a small web UI; each button press becomes a
//! single-byte write to one characteristic on a BLE peripheral. Everything
//! here is host-testable: the BLE central and the key-value store are
//! reached through [`link::BleCentralPort`] and
//! [`StoragePort`](crate::app::ports::StoragePort).

pub mod command;
pub mod config;
pub mod link;
pub mod web;

pub use command::LedCommand;
pub use config::{BleUuid, RelayConfig};
pub use link::{BleCentralPort, RelayLink};
pub use web::{Method, RelayWebApp, WebRequest, WebResponse};
