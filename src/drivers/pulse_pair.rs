//! PWM-driven actuator pair (Peltier elements, LRAs).
//!
//! Both members get the same period and pulse. The driver tracks the last
//! commanded state; the hardware may disagree after a partial write, which
//! the next command corrects.

use super::pair::{ActuatorPair, PairWrite};
use super::pwm::PwmChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveState {
    Off,
    On { period_ns: u32, pulse_ns: u32 },
}

impl DriveState {
    /// State a `set(period_ns, pulse_ns)` command leaves the pair in.
    pub const fn from_pulse(period_ns: u32, pulse_ns: u32) -> Self {
        if pulse_ns == 0 {
            Self::Off
        } else {
            Self::On { period_ns, pulse_ns }
        }
    }

    /// Duty in percent, 0 when off.
    pub fn duty_percent(&self) -> u8 {
        match *self {
            Self::Off => 0,
            Self::On { period_ns, pulse_ns } if period_ns > 0 => {
                (u64::from(pulse_ns) * 100 / u64::from(period_ns)) as u8
            }
            Self::On { .. } => 0,
        }
    }
}

pub struct PulsePair<P> {
    pair: ActuatorPair<P>,
    state: DriveState,
}

impl<P: PwmChannel> PulsePair<P> {
    pub fn new(name: &'static str, first: P, second: P) -> Self {
        Self {
            pair: ActuatorPair::new(name, first, second),
            state: DriveState::Off,
        }
    }

    /// Drive both members. A zero pulse is "off".
    pub fn set(&mut self, period_ns: u32, pulse_ns: u32) -> PairWrite {
        let result = self.pair.drive(|ch| ch.set(period_ns, pulse_ns));
        self.state = DriveState::from_pulse(period_ns, pulse_ns);
        result
    }

    pub fn off(&mut self, period_ns: u32) -> PairWrite {
        self.set(period_ns, 0)
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        !matches!(self.state, DriveState::Off)
    }

    pub fn channels(&self) -> &[P; 2] {
        self.pair.members()
    }

    pub fn name(&self) -> &'static str {
        self.pair.name()
    }
}
