//! Mock board for integration tests.
//!
//! Scripts sensor readings, records every actuator write and can fail
//! individual pair members, so tests assert on the full command history
//! without touching real GPIO/PWM registers.

use std::collections::VecDeque;

use thermoband::app::events::AppEvent;
use thermoband::app::ports::{ActuatorPort, EventSink, SensorPort};
use thermoband::drivers::pair::PairWrite;
use thermoband::error::{ActuatorError, SensorError};
use thermoband::sensors::imu::{MotionSample, SensorValue};
use thermoband::sensors::thermistor::ThermistorReading;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Leds(bool),
    Peltier { period_ns: u32, pulse_ns: u32 },
    Lra { period_ns: u32, pulse_ns: u32 },
}

// ── MockBoard ─────────────────────────────────────────────────

pub struct MockBoard {
    pub calls: Vec<ActuatorCall>,
    motion: VecDeque<Result<MotionSample, SensorError>>,
    temperature: Result<f64, SensorError>,
    /// Pair member (0 or 1) whose writes fail, per actuator.
    pub led_fault: Option<usize>,
    pub peltier_fault: Option<usize>,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            motion: VecDeque::new(),
            temperature: Ok(25.0),
            led_fault: None,
            peltier_fault: None,
        }
    }

    /// Queue one sample with the given X acceleration (m/s^2).
    pub fn push_accel_x(&mut self, x: f64) {
        let mut s = MotionSample::default();
        s.accel[0] = SensorValue::from_f64(x);
        s.accel[2] = SensorValue::from_f64(9.81);
        self.motion.push_back(Ok(s));
    }

    pub fn push_motion_error(&mut self, e: SensorError) {
        self.motion.push_back(Err(e));
    }

    pub fn set_temperature(&mut self, t: Result<f64, SensorError>) {
        self.temperature = t;
    }

    pub fn last_leds(&self) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Leds(on) => Some(*on),
            _ => None,
        })
    }

    pub fn last_peltier_pulse(&self) -> Option<u32> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Peltier { pulse_ns, .. } => Some(*pulse_ns),
            _ => None,
        })
    }

    pub fn last_lra_pulse(&self) -> Option<u32> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Lra { pulse_ns, .. } => Some(*pulse_ns),
            _ => None,
        })
    }

    fn pair_result(fault: Option<usize>, err: ActuatorError) -> PairWrite {
        let fail = |i| if fault == Some(i) { Err(err) } else { Ok(()) };
        PairWrite {
            first: fail(0),
            second: fail(1),
        }
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockBoard {
    fn read_motion(&mut self) -> Result<MotionSample, SensorError> {
        self.motion.pop_front().unwrap_or(Err(SensorError::NoSample))
    }

    fn read_thermistor(&mut self) -> Result<ThermistorReading, SensorError> {
        self.temperature.map(|celsius| ThermistorReading {
            millivolts: 1500,
            celsius,
        })
    }
}

impl ActuatorPort for MockBoard {
    fn set_leds(&mut self, on: bool) -> PairWrite {
        self.calls.push(ActuatorCall::Leds(on));
        Self::pair_result(self.led_fault, ActuatorError::GpioWriteFailed)
    }

    fn set_peltier(&mut self, period_ns: u32, pulse_ns: u32) -> PairWrite {
        self.calls.push(ActuatorCall::Peltier { period_ns, pulse_ns });
        Self::pair_result(self.peltier_fault, ActuatorError::PwmWriteFailed)
    }

    fn set_lra(&mut self, period_ns: u32, pulse_ns: u32) -> PairWrite {
        self.calls.push(ActuatorCall::Lra { period_ns, pulse_ns });
        PairWrite::OK
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
