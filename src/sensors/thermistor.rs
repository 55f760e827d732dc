//! NTC thermistor temperature estimator (10 kOhm @ 25 C, B = 3950).
//!
//! The thermistor sits on the low side of a divider with a fixed 10 kOhm
//! resistor, so the pin voltage rises with thermistor resistance. The
//! simplified Beta (Steinhart-Hart) equation converts resistance to
//! temperature.
//!
//! Input millivolts are clamped to `[1, Vref - 1]` before conversion, which
//! keeps the divider ratio and the logarithm finite for any input.

use crate::config::ThermistorParams;
use crate::error::SensorError;

use super::adc::AdcPort;

const KELVIN_OFFSET: f64 = 273.15;

/// Pure Beta-model conversion.
#[derive(Debug, Clone, Copy)]
pub struct ThermistorModel {
    params: ThermistorParams,
}

impl ThermistorModel {
    pub fn new(params: ThermistorParams) -> Self {
        Self { params }
    }

    pub fn vref_mv(&self) -> i32 {
        self.params.vref_mv
    }

    /// Divider millivolts → degrees Celsius. Finite for any positive Vref;
    /// never panics, whatever the parameters.
    pub fn celsius_from_mv(&self, mv: i32) -> f64 {
        let p = &self.params;
        let hi = p.vref_mv.saturating_sub(1).max(1);
        let v = f64::from(mv.clamp(1, hi));
        let vref = f64::from(p.vref_mv);

        let r_therm = p.r_fixed_ohm * v / (vref - v);
        let inv_t = (1.0 / p.t0_k) + (1.0 / p.beta) * (r_therm / p.r0_ohm).ln();
        (1.0 / inv_t) - KELVIN_OFFSET
    }
}

impl Default for ThermistorModel {
    fn default() -> Self {
        Self::new(ThermistorParams::default())
    }
}

/// One tick's thermistor acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermistorReading {
    pub millivolts: i32,
    pub celsius: f64,
}

/// ADC channel plus conversion model.
pub struct ThermistorSensor<A> {
    adc: A,
    model: ThermistorModel,
}

impl<A: AdcPort> ThermistorSensor<A> {
    pub fn new(adc: A, model: ThermistorModel) -> Self {
        Self { adc, model }
    }

    /// Acquire and convert. On error the caller treats temperature as
    /// unavailable for this tick; the conversion is never run on bad data.
    pub fn read(&mut self) -> Result<ThermistorReading, SensorError> {
        let millivolts = self.adc.read_millivolts()?;
        Ok(ThermistorReading {
            millivolts,
            celsius: self.model.celsius_from_mv(millivolts),
        })
    }

    pub fn model(&self) -> &ThermistorModel {
        &self.model
    }
}
