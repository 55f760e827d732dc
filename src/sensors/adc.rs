//! One-shot ADC channel feeding the thermistor divider.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: an `esp-idf-hal` oneshot channel with curve-fitting
//! calibration for the raw → millivolt step.
//! On host/test: reads a static raw code for injection, converted linearly.

use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::error::SensorError;

/// ADC driver boundary. Both steps can fail independently.
pub trait AdcPort {
    /// One conversion, raw code.
    fn read_raw(&mut self) -> Result<i32, SensorError>;

    /// Convert a raw code to millivolts at the pin.
    fn raw_to_millivolts(&self, raw: i32) -> Result<i32, SensorError>;

    /// Read and convert in one go.
    fn read_millivolts(&mut self) -> Result<i32, SensorError> {
        let raw = self.read_raw()?;
        self.raw_to_millivolts(raw)
    }
}

// ── Host simulation ───────────────────────────────────────────

static SIM_RAW: AtomicI32 = AtomicI32::new(2048);
static SIM_READ_FAULT: AtomicBool = AtomicBool::new(false);

/// Inject the next raw code returned by [`SimAdc`].
pub fn sim_set_raw(raw: i32) {
    SIM_RAW.store(raw, Ordering::Relaxed);
}

/// Make [`SimAdc::read_raw`] fail until cleared.
pub fn sim_set_read_fault(fault: bool) {
    SIM_READ_FAULT.store(fault, Ordering::Relaxed);
}

/// Linear 12-bit ADC backed by the injection statics above.
pub struct SimAdc {
    vref_mv: i32,
}

impl SimAdc {
    pub const FULL_SCALE: i32 = 4095;

    pub fn new(vref_mv: i32) -> Self {
        Self { vref_mv }
    }
}

impl AdcPort for SimAdc {
    fn read_raw(&mut self) -> Result<i32, SensorError> {
        if SIM_READ_FAULT.load(Ordering::Relaxed) {
            return Err(SensorError::AdcReadFailed);
        }
        Ok(SIM_RAW.load(Ordering::Relaxed))
    }

    fn raw_to_millivolts(&self, raw: i32) -> Result<i32, SensorError> {
        Ok(raw.clamp(0, Self::FULL_SCALE) * self.vref_mv / Self::FULL_SCALE)
    }
}

// ── ESP-IDF oneshot channel ───────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::OneshotAdc;

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_hal::adc::ADCPin;
    use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
    use esp_idf_hal::adc::oneshot::config::{AdcChannelConfig, Calibration};
    use esp_idf_hal::peripheral::Peripheral;
    use esp_idf_hal::sys::EspError;
    use log::{error, warn};

    use super::AdcPort;
    use crate::error::SensorError;

    pub struct OneshotAdc<'d, T: ADCPin> {
        channel: AdcChannelDriver<'d, T, AdcDriver<'d, T::Adc>>,
    }

    impl<'d, T: ADCPin> OneshotAdc<'d, T> {
        pub fn new(adc: AdcDriver<'d, T::Adc>, pin: impl Peripheral<P = T> + 'd) -> Result<Self, EspError> {
            let config = AdcChannelConfig {
                attenuation: esp_idf_hal::adc::attenuation::DB_11,
                calibration: Calibration::Curve,
                ..Default::default()
            };
            let channel = AdcChannelDriver::new(adc, pin, &config)?;
            Ok(Self { channel })
        }
    }

    impl<T: ADCPin> AdcPort for OneshotAdc<'_, T> {
        fn read_raw(&mut self) -> Result<i32, SensorError> {
            self.channel.read_raw().map(i32::from).map_err(|e| {
                error!("adc read failed ({})", e);
                SensorError::AdcReadFailed
            })
        }

        fn raw_to_millivolts(&self, raw: i32) -> Result<i32, SensorError> {
            self.channel.raw_to_mv(raw.clamp(0, i32::from(u16::MAX)) as u16)
                .map(i32::from)
                .map_err(|_| {
                    warn!("adc raw_to_millivolts not supported; raw={}", raw);
                    SensorError::ConversionUnsupported
                })
        }
    }
}
