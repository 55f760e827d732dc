//! Outbound application events.
//!
//! The [`ControlService`](super::service::ControlService) emits these
//! through the [`EventSink`](super::ports::EventSink) port. The log
//! adapter turns them into the serial diagnostic stream.

use core::fmt;

use crate::config::ControlMode;
use crate::control::ActuatorState;
use crate::control::actuation::GuardState;
use crate::drivers::pair::PairWrite;
use crate::error::SensorError;
use crate::sensors::imu::MotionSample;
use crate::sensors::thermistor::ThermistorReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuator {
    Leds,
    Peltier,
    Lra,
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Leds => "LED",
            Self::Peltier => "Peltier",
            Self::Lra => "LRA",
        })
    }
}

/// Structured events emitted by the control core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Service started; initial actuator state applied (all off).
    Started(ControlMode),

    /// One completed control tick.
    Tick(TickReport),

    /// IMU sample could not be read; the tick did nothing.
    SampleSkipped(SensorError),

    /// Thermistor acquisition failed; temperature unavailable this tick.
    TemperatureUnavailable(SensorError),

    /// Reference captured from the current X acceleration.
    ReferenceLatched(f64),

    /// At least one member of a pair failed to write.
    ActuatorFault { actuator: Actuator, write: PairWrite },
}

/// Everything the diagnostic line reports about one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub mode: ControlMode,
    pub motion: MotionSample,
    pub thermistor: Option<ThermistorReading>,
    pub state: ActuatorState,
    /// Actuation mode only.
    pub guard: Option<GuardState>,
    /// Reference mode only.
    pub reference: Option<f64>,
    /// Reference mode only: `reference - current`.
    pub change: Option<f64>,
    pub peltier_duty: u8,
    pub lra_duty: u8,
    /// Member writes that failed this tick, across all pairs.
    pub failed_writes: u8,
}

fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [ax, ay, az] = self.motion.accel;
        let [gx, gy, gz] = self.motion.gyro;
        write!(f, "AX: {ax} AY: {ay} AZ: {az} | GX: {gx} GY: {gy} GZ: {gz}")?;

        match self.thermistor {
            Some(t) => write!(f, " [Therm={}mV, {:.1}C]", t.millivolts, t.celsius)?,
            None => write!(f, " [Therm=N/A]")?,
        }

        match self.mode {
            ControlMode::Actuation => write!(
                f,
                " [LED={}, Peltier={}({}%), LRA={}({}%)]",
                on_off(self.state.leds),
                on_off(self.state.peltier),
                self.peltier_duty,
                on_off(self.state.lra),
                self.lra_duty,
            )?,
            ControlMode::ReferenceLatch => {
                match (self.reference, self.change) {
                    (Some(r), Some(c)) => write!(f, " [Ref={r:.3}, Change={c:.3}]")?,
                    _ => write!(f, " [Ref=unset]")?,
                }
                write!(f, " [LED={}]", on_off(self.state.leds))?;
            }
        }

        if self.failed_writes > 0 {
            write!(f, " [failed writes={}]", self.failed_writes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::imu::SensorValue;

    fn report(mode: ControlMode) -> TickReport {
        TickReport {
            mode,
            motion: MotionSample {
                accel: [SensorValue::from_f64(1.25), SensorValue::ZERO, SensorValue::from_f64(-9.5)],
                gyro: [SensorValue::ZERO; 3],
            },
            thermistor: Some(ThermistorReading { millivolts: 1500, celsius: 25.0 }),
            state: ActuatorState { leds: true, peltier: true, lra: true },
            guard: None,
            reference: None,
            change: None,
            peltier_duty: 50,
            lra_duty: 50,
            failed_writes: 0,
        }
    }

    #[test]
    fn actuation_line_lists_every_pair() {
        let line = report(ControlMode::Actuation).to_string();
        assert!(line.starts_with("AX: 1.250000 AY: 0.000000 AZ: -9.500000"));
        assert!(line.contains("[Therm=1500mV, 25.0C]"));
        assert!(line.ends_with("[LED=ON, Peltier=ON(50%), LRA=ON(50%)]"));
    }

    #[test]
    fn reference_line_shows_unset_reference() {
        let mut r = report(ControlMode::ReferenceLatch);
        r.state = ActuatorState::ALL_OFF;
        r.thermistor = None;
        let line = r.to_string();
        assert!(line.contains("[Therm=N/A]"));
        assert!(line.ends_with("[Ref=unset] [LED=OFF]"));
    }
}
