//! Application core: the control loop body, zero I/O.
//!
//! Sampling, the actuation/reference decisions and actuator writes are
//! orchestrated by [`service::ControlService`]. All hardware access goes
//! through the traits in [`ports`], keeping this layer testable without
//! real peripherals.

pub mod events;
pub mod ports;
pub mod service;
