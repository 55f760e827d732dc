//! System configuration parameters
//!
//! All tunable parameters for the Thermoband control loop.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::error::Error;

/// Which rule set the control loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    /// Motion threshold drives LEDs/LRA/Peltier, with the thermal guard.
    Actuation,
    /// Button-latched reference X acceleration drives the LEDs only.
    ReferenceLatch,
}

impl ControlMode {
    /// Mode this build runs: `ReferenceLatch` with the `reference-latch`
    /// feature, `Actuation` otherwise.
    pub const fn selected() -> Self {
        if cfg!(feature = "reference-latch") { Self::ReferenceLatch } else { Self::Actuation }
    }
}

/// NTC thermistor in a voltage divider (thermistor on the low side).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermistorParams {
    /// ADC reference voltage (mV); also the divider supply.
    pub vref_mv: i32,
    /// Fixed divider resistor (ohm).
    pub r_fixed_ohm: f64,
    /// Thermistor resistance at `t0_k` (ohm).
    pub r0_ohm: f64,
    /// Beta coefficient (K).
    pub beta: f64,
    /// Reference temperature for `r0_ohm` (K).
    pub t0_k: f64,
}

impl Default for ThermistorParams {
    fn default() -> Self {
        Self {
            vref_mv: 3000,
            r_fixed_ohm: 10_000.0,
            r0_ohm: 10_000.0,
            beta: 3950.0,
            t0_k: 298.15,
        }
    }
}

/// IMU attribute values applied once at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImuSettings {
    /// Accelerometer full scale (g).
    pub accel_full_scale_g: i32,
    /// Gyroscope full scale (degrees/s).
    pub gyro_full_scale_dps: i32,
    /// Output data rate for both channels (Hz).
    pub sampling_frequency_hz: i32,
    /// Oversampling / averaging factor (1 = normal mode).
    pub oversampling: i32,
}

impl Default for ImuSettings {
    fn default() -> Self {
        Self {
            accel_full_scale_g: 2,
            gyro_full_scale_dps: 500,
            sampling_frequency_hz: 100,
            oversampling: 1,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub mode: ControlMode,

    // --- Sensors ---
    pub thermistor: ThermistorParams,
    pub imu: ImuSettings,

    // --- Thresholds ---
    /// X acceleration (m/s^2) at or above which everything is switched off.
    pub motion_threshold_ms2: f64,
    /// Peltier cutoff (Celsius); strictly above this the Peltier pair is off.
    pub temperature_cutoff_c: f64,
    /// Reference mode: decrease of X acceleration (m/s^2) that lights the LED.
    pub reference_drop_ms2: f64,

    // --- PWM ---
    /// PWM period for Peltier and LRA pairs (ns).
    pub pwm_period_ns: u32,
    /// Peltier "on" pulse width (ns).
    pub peltier_on_pulse_ns: u32,
    /// LRA "on" pulse width (ns).
    pub lra_on_pulse_ns: u32,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub loop_interval_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            mode: ControlMode::selected(),

            thermistor: ThermistorParams::default(),
            imu: ImuSettings::default(),

            motion_threshold_ms2: 5.0,
            temperature_cutoff_c: 45.0,
            reference_drop_ms2: 3.0,

            pwm_period_ns: 10_000_000,     // 10 ms
            peltier_on_pulse_ns: 5_000_000, // 50 %
            lra_on_pulse_ns: 5_000_000,     // 50 %

            loop_interval_ms: 100, // matched to the 100 Hz IMU rate
        }
    }
}

impl SystemConfig {
    /// Range-check every field. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thermistor;
        if !(1000..=5000).contains(&t.vref_mv) {
            return Err(ConfigError::ValidationFailed("thermistor.vref_mv must be 1000–5000"));
        }
        if !(t.r_fixed_ohm > 0.0 && t.r0_ohm > 0.0 && t.beta > 0.0 && t.t0_k > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "thermistor resistances, beta and t0 must be positive",
            ));
        }
        if !(0.0..=20.0 * 9.81).contains(&self.motion_threshold_ms2) {
            return Err(ConfigError::ValidationFailed("motion_threshold_ms2 must be 0–196"));
        }
        if !(0.0..=85.0).contains(&self.temperature_cutoff_c) {
            return Err(ConfigError::ValidationFailed("temperature_cutoff_c must be 0–85"));
        }
        if !(self.reference_drop_ms2 > 0.0) {
            return Err(ConfigError::ValidationFailed("reference_drop_ms2 must be positive"));
        }
        if self.pwm_period_ns == 0 {
            return Err(ConfigError::ValidationFailed("pwm_period_ns must be non-zero"));
        }
        if self.peltier_on_pulse_ns > self.pwm_period_ns || self.lra_on_pulse_ns > self.pwm_period_ns {
            return Err(ConfigError::ValidationFailed("pulse widths must not exceed pwm_period_ns"));
        }
        if !(10..=5000).contains(&self.loop_interval_ms) {
            return Err(ConfigError::ValidationFailed("loop_interval_ms must be 10–5000"));
        }
        if self.imu.sampling_frequency_hz <= 0 || self.imu.oversampling <= 0 {
            return Err(ConfigError::ValidationFailed("imu rate and oversampling must be positive"));
        }
        Ok(())
    }

    /// Config to boot with: the stored one (defaults when it cannot be
    /// read) running `mode`. A stored mode that differs is overwritten so
    /// the blob matches what runs.
    pub fn for_boot(store: &impl ConfigPort, mode: ControlMode) -> crate::error::Result<Self> {
        let mut config = store.load().unwrap_or_else(|e| {
            warn!("config load failed ({}), using defaults", e);
            Self::default()
        });
        if config.mode != mode {
            info!("config: mode {:?} -> {:?}", config.mode, mode);
            config.mode = mode;
            if let Err(e) = store.save(&config) {
                warn!("config: mode not persisted ({})", e);
            }
        }
        config.validate().map_err(Error::from)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.mode, ControlMode::selected());
        assert!(c.peltier_on_pulse_ns <= c.pwm_period_ns);
        assert!(c.lra_on_pulse_ns <= c.pwm_period_ns);
    }

    #[test]
    fn default_pulses_are_half_duty() {
        let c = SystemConfig::default();
        assert_eq!(c.pwm_period_ns, 10_000_000);
        assert_eq!(c.peltier_on_pulse_ns * 2, c.pwm_period_ns);
        assert_eq!(c.lra_on_pulse_ns * 2, c.pwm_period_ns);
    }

    #[test]
    fn loop_interval_matches_imu_rate() {
        let c = SystemConfig::default();
        assert_eq!(c.imu.sampling_frequency_hz, 100);
        assert!(c.loop_interval_ms as i32 >= 1000 / c.imu.sampling_frequency_hz);
    }

    #[test]
    fn pulse_longer_than_period_is_rejected() {
        let mut c = SystemConfig::default();
        c.peltier_on_pulse_ns = c.pwm_period_ns + 1;
        assert!(matches!(c.validate(), Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let mut c = SystemConfig::default();
        c.reference_drop_ms2 = f64::NAN;
        assert!(c.validate().is_err());
        let mut c = SystemConfig::default();
        c.temperature_cutoff_c = f64::NAN;
        assert!(c.validate().is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn postcard_roundtrip() {
        let mut c = SystemConfig::default();
        c.mode = ControlMode::ReferenceLatch;
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: SystemConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c2.mode, ControlMode::ReferenceLatch);
        assert!((c.temperature_cutoff_c - c2.temperature_cutoff_c).abs() < 1e-9);
    }

    #[cfg(not(feature = "reference-latch"))]
    #[test]
    fn plain_build_runs_actuation() {
        assert_eq!(ControlMode::selected(), ControlMode::Actuation);
        assert_eq!(SystemConfig::default().mode, ControlMode::Actuation);
    }

    #[cfg(feature = "reference-latch")]
    #[test]
    fn feature_build_runs_reference_latch() {
        assert_eq!(ControlMode::selected(), ControlMode::ReferenceLatch);
        assert_eq!(SystemConfig::default().mode, ControlMode::ReferenceLatch);
    }

    #[cfg(not(target_os = "espidf"))]
    #[test]
    fn boot_applies_and_persists_the_selected_mode() {
        use crate::adapters::nvs::NvsAdapter;

        let nvs = NvsAdapter::new().unwrap();
        let mut stored = SystemConfig::default();
        stored.mode = ControlMode::Actuation;
        stored.motion_threshold_ms2 = 4.5;
        nvs.save(&stored).unwrap();

        let booted = SystemConfig::for_boot(&nvs, ControlMode::ReferenceLatch).unwrap();
        assert_eq!(booted.mode, ControlMode::ReferenceLatch);
        assert_eq!(booted.motion_threshold_ms2, 4.5);

        let reloaded = nvs.load().unwrap();
        assert_eq!(reloaded.mode, ControlMode::ReferenceLatch);
        assert_eq!(reloaded.motion_threshold_ms2, 4.5);
    }

    #[cfg(not(target_os = "espidf"))]
    #[test]
    fn boot_without_stored_config_uses_defaults_in_the_selected_mode() {
        use crate::adapters::nvs::NvsAdapter;

        let nvs = NvsAdapter::new().unwrap();
        let booted = SystemConfig::for_boot(&nvs, ControlMode::Actuation).unwrap();
        let mut expected = SystemConfig::default();
        expected.mode = ControlMode::Actuation;
        assert_eq!(booted, expected);
    }
}
