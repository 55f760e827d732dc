//! Control rules: pure functions of the sampled values and config.

pub mod actuation;
pub mod reference;

/// Per-tick on/off intent for the three actuator pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorState {
    pub leds: bool,
    pub peltier: bool,
    pub lra: bool,
}

impl ActuatorState {
    pub const ALL_OFF: Self = Self {
        leds: false,
        peltier: false,
        lra: false,
    };
}
