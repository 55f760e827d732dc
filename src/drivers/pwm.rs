//! PWM channels for the Peltier and LRA pairs.
//!
//! The control loop speaks in `(period_ns, pulse_ns)` and always uses a
//! 10 ms period with a 0 or 5 ms pulse. [`DutyCyclePwm`] maps that onto any
//! `embedded_hal::pwm::SetDutyCycle` output; on the device that is an LEDC
//! channel whose timer runs at the configured period.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: `DutyCyclePwm<LedcDriver>`.
//! On host/test: [`SimPwm`] records the last write in memory.

use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::error::ActuatorError;

/// One PWM output.
pub trait PwmChannel {
    fn set(&mut self, period_ns: u32, pulse_ns: u32) -> Result<(), ActuatorError>;
}

fn check_pulse(period_ns: u32, pulse_ns: u32) -> Result<(), ActuatorError> {
    if period_ns == 0 || pulse_ns > period_ns {
        return Err(ActuatorError::InvalidPulse);
    }
    Ok(())
}

/// Adapter from period/pulse writes to a duty-cycle output with a fixed
/// hardware period.
pub struct DutyCyclePwm<P> {
    pwm: P,
    period_ns: u32,
}

impl<P: SetDutyCycle> DutyCyclePwm<P> {
    /// `period_ns` must match the timer the output is bound to.
    pub fn new(pwm: P, period_ns: u32) -> Self {
        Self { pwm, period_ns }
    }

    pub fn inner(&self) -> &P {
        &self.pwm
    }
}

impl<P: SetDutyCycle> PwmChannel for DutyCyclePwm<P> {
    fn set(&mut self, period_ns: u32, pulse_ns: u32) -> Result<(), ActuatorError> {
        check_pulse(period_ns, pulse_ns)?;
        if period_ns != self.period_ns {
            warn!(
                "PWM period {}ns requested, timer runs at {}ns",
                period_ns, self.period_ns
            );
            return Err(ActuatorError::UnsupportedPeriod);
        }

        let max = u64::from(self.pwm.max_duty_cycle());
        let duty = u64::from(pulse_ns) * max / u64::from(period_ns);
        self.pwm
            .set_duty_cycle(duty as u16)
            .map_err(|_| ActuatorError::PwmWriteFailed)
    }
}

// ── Host simulation ───────────────────────────────────────────

/// In-memory PWM output with fault injection.
#[derive(Debug, Default)]
pub struct SimPwm {
    last: Option<(u32, u32)>,
    fail: bool,
}

impl SimPwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fault(&mut self, fail: bool) {
        self.fail = fail;
    }

    /// Last successfully applied `(period_ns, pulse_ns)`.
    pub fn last(&self) -> Option<(u32, u32)> {
        self.last
    }
}

impl PwmChannel for SimPwm {
    fn set(&mut self, period_ns: u32, pulse_ns: u32) -> Result<(), ActuatorError> {
        check_pulse(period_ns, pulse_ns)?;
        if self.fail {
            return Err(ActuatorError::PwmWriteFailed);
        }
        self.last = Some((period_ns, pulse_ns));
        Ok(())
    }
}
