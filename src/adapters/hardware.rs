//! Hardware adapter: bridges the drivers to the domain port traits.
//!
//! Owns the [`SensorHub`] and the three actuator pairs and exposes them
//! through [`SensorPort`] and [`ActuatorPort`]. Generic over the concrete
//! drivers: on the device these are `esp-idf-hal` types, on the host the
//! simulation stubs.

use embedded_hal::digital::OutputPin;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::leds::LedPair;
use crate::drivers::pair::PairWrite;
use crate::drivers::pulse_pair::PulsePair;
use crate::drivers::pwm::PwmChannel;
use crate::error::SensorError;
use crate::sensors::SensorHub;
use crate::sensors::adc::AdcPort;
use crate::sensors::imu::{ImuPort, MotionSample};
use crate::sensors::thermistor::ThermistorReading;

pub struct HardwareAdapter<I, A, L, P> {
    sensors: SensorHub<I, A>,
    leds: LedPair<L>,
    peltier: PulsePair<P>,
    lra: PulsePair<P>,
}

impl<I, A, L, P> HardwareAdapter<I, A, L, P>
where
    I: ImuPort,
    A: AdcPort,
    L: OutputPin,
    P: PwmChannel,
{
    pub fn new(sensors: SensorHub<I, A>, leds: LedPair<L>, peltier: PulsePair<P>, lra: PulsePair<P>) -> Self {
        Self {
            sensors,
            leds,
            peltier,
            lra,
        }
    }

    pub fn leds(&self) -> &LedPair<L> {
        &self.leds
    }

    pub fn peltier(&self) -> &PulsePair<P> {
        &self.peltier
    }

    pub fn lra(&self) -> &PulsePair<P> {
        &self.lra
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I, A, L, P> SensorPort for HardwareAdapter<I, A, L, P>
where
    I: ImuPort,
    A: AdcPort,
{
    fn read_motion(&mut self) -> Result<MotionSample, SensorError> {
        self.sensors.read_motion()
    }

    fn read_thermistor(&mut self) -> Result<ThermistorReading, SensorError> {
        self.sensors.read_thermistor()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<I, A, L, P> ActuatorPort for HardwareAdapter<I, A, L, P>
where
    L: OutputPin,
    P: PwmChannel,
{
    fn set_leds(&mut self, on: bool) -> PairWrite {
        self.leds.set(on)
    }

    fn set_peltier(&mut self, period_ns: u32, pulse_ns: u32) -> PairWrite {
        self.peltier.set(period_ns, pulse_ns)
    }

    fn set_lra(&mut self, period_ns: u32, pulse_ns: u32) -> PairWrite {
        self.lra.set(period_ns, pulse_ns)
    }
}
