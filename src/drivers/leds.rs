//! Indicator LED pair.
//!
//! Two active-high GPIO outputs driven together. Pins are configured as
//! outputs when the `OutputPin` is constructed, so this driver only
//! sets levels.
//!
//! On host/test, [`SimPin`] tracks the level in memory.

use embedded_hal::digital::{ErrorType, OutputPin};

use super::pair::{ActuatorPair, PairWrite};
use crate::error::ActuatorError;

pub struct LedPair<P> {
    pair: ActuatorPair<P>,
    on: bool,
}

impl<P: OutputPin> LedPair<P> {
    pub fn new(first: P, second: P) -> Self {
        Self {
            pair: ActuatorPair::new("led", first, second),
            on: false,
        }
    }

    pub fn set(&mut self, on: bool) -> PairWrite {
        let result = self.pair.drive(|pin| {
            let r = if on { pin.set_high() } else { pin.set_low() };
            r.map_err(|_| ActuatorError::GpioWriteFailed)
        });
        self.on = on;
        result
    }

    /// Last commanded level (not necessarily applied to both pins).
    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn pins(&self) -> &[P; 2] {
        self.pair.members()
    }
}

// ── Host simulation ───────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
    fail: bool,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fault(&mut self, fail: bool) {
        self.fail = fail;
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    fn apply(&mut self, high: bool) -> Result<(), embedded_hal::digital::ErrorKind> {
        if self.fail {
            return Err(embedded_hal::digital::ErrorKind::Other);
        }
        self.high = high;
        Ok(())
    }
}

impl ErrorType for SimPin {
    type Error = embedded_hal::digital::ErrorKind;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.apply(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.apply(true)
    }
}
