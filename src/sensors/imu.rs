//! Six-axis IMU port and the fixed-point sample types it produces.
//!
//! Values travel as `(integer, micro)` pairs so a driver never has to
//! round-trip through floating point; the control loop converts the X
//! acceleration to `f64` once per tick.

use core::fmt;

use log::error;

use crate::config::ImuSettings;
use crate::error::SensorError;

/// Fixed-point sensor value: `val1 + val2 / 1_000_000`.
///
/// `val1` and `val2` always carry the same sign (or are zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorValue {
    pub val1: i32,
    pub val2: i32,
}

impl SensorValue {
    pub const ZERO: Self = Self { val1: 0, val2: 0 };

    pub const fn from_int(v: i32) -> Self {
        Self { val1: v, val2: 0 }
    }

    pub fn from_f64(v: f64) -> Self {
        let val1 = v.trunc() as i32;
        let val2 = ((v - v.trunc()) * 1_000_000.0).round() as i32;
        // Rounding the fraction can carry into the integer part.
        if val2.abs() >= 1_000_000 {
            Self {
                val1: val1 + val2.signum(),
                val2: 0,
            }
        } else {
            Self { val1, val2 }
        }
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.val1) + f64::from(self.val2) / 1_000_000.0
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.val1 < 0 || self.val2 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:06}",
            sign,
            self.val1.unsigned_abs(),
            self.val2.unsigned_abs()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImuChannel {
    /// Acceleration, m/s^2 (full scale configured in g).
    Accel,
    /// Angular rate, rad/s (full scale configured in degrees/s).
    Gyro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImuAttribute {
    FullScale,
    Oversampling,
    /// Also selects the power mode, so it is applied last.
    SamplingFrequency,
}

/// One tick's worth of IMU data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionSample {
    pub accel: [SensorValue; 3],
    pub gyro: [SensorValue; 3],
}

impl MotionSample {
    /// X-axis acceleration in m/s^2: the only axis the decisions use.
    pub fn accel_x(&self) -> f64 {
        self.accel[0].to_f64()
    }
}

/// IMU driver boundary.
pub trait ImuPort {
    /// Set one attribute on one channel.
    fn configure(
        &mut self,
        channel: ImuChannel,
        attribute: ImuAttribute,
        value: SensorValue,
    ) -> Result<(), SensorError>;

    /// Latch a fresh sample of every channel.
    fn fetch_sample(&mut self) -> Result<(), SensorError>;

    /// Read the three axes of `channel` from the last fetched sample.
    fn channel(&self, channel: ImuChannel) -> Result<[SensorValue; 3], SensorError>;
}

/// Apply boot-time IMU settings, accelerometer first, sampling frequency
/// last on each channel. Failures are logged and counted, never fatal.
pub fn configure_imu(imu: &mut impl ImuPort, settings: &ImuSettings) -> u8 {
    let plan = [
        (ImuChannel::Accel, ImuAttribute::FullScale, settings.accel_full_scale_g),
        (ImuChannel::Accel, ImuAttribute::Oversampling, settings.oversampling),
        (ImuChannel::Accel, ImuAttribute::SamplingFrequency, settings.sampling_frequency_hz),
        (ImuChannel::Gyro, ImuAttribute::FullScale, settings.gyro_full_scale_dps),
        (ImuChannel::Gyro, ImuAttribute::Oversampling, settings.oversampling),
        (ImuChannel::Gyro, ImuAttribute::SamplingFrequency, settings.sampling_frequency_hz),
    ];

    let mut failures = 0;
    for (channel, attribute, value) in plan {
        if let Err(e) = imu.configure(channel, attribute, SensorValue::from_int(value)) {
            error!("IMU {:?} {:?}={} set failed ({})", channel, attribute, value, e);
            failures += 1;
        }
    }
    failures
}
