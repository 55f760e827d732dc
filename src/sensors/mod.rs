//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns the IMU and the thermistor channel and produces one
//! [`MotionSample`] plus one thermistor reading per control tick.

pub mod adc;
pub mod imu;
pub mod mpu6050;
pub mod thermistor;

use log::{error, warn};

use crate::error::SensorError;
use adc::AdcPort;
use imu::{ImuChannel, ImuPort, MotionSample, SensorValue};
use thermistor::{ThermistorReading, ThermistorSensor};

/// Aggregates the sensor drivers behind one per-tick read path.
pub struct SensorHub<I, A> {
    imu: I,
    thermistor: ThermistorSensor<A>,
}

impl<I: ImuPort, A: AdcPort> SensorHub<I, A> {
    /// Construct a new hub from pre-built drivers (built in main where
    /// peripheral ownership is established).
    pub fn new(imu: I, thermistor: ThermistorSensor<A>) -> Self {
        Self { imu, thermistor }
    }

    /// Fetch one IMU sample.
    ///
    /// A failed fetch or accelerometer read fails the whole sample (the tick
    /// has nothing to decide on). A failed gyro read is logged and the gyro
    /// axes read as zero.
    pub fn read_motion(&mut self) -> Result<MotionSample, SensorError> {
        self.imu.fetch_sample().inspect_err(|e| {
            error!("sensor_sample_fetch failed ({})", e);
        })?;

        let accel = self.imu.channel(ImuChannel::Accel).inspect_err(|e| {
            error!("ACCEL_XYZ read failed ({})", e);
        })?;

        let gyro = match self.imu.channel(ImuChannel::Gyro) {
            Ok(g) => g,
            Err(e) => {
                warn!("GYRO_XYZ read failed ({})", e);
                [SensorValue::ZERO; 3]
            }
        };

        Ok(MotionSample { accel, gyro })
    }

    /// Read the thermistor divider and convert to Celsius.
    pub fn read_thermistor(&mut self) -> Result<ThermistorReading, SensorError> {
        self.thermistor.read()
    }

    pub fn imu_mut(&mut self) -> &mut I {
        &mut self.imu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::thermistor::ThermistorModel;
    use imu::ImuAttribute;

    struct ScriptedImu {
        fetch_ok: bool,
        gyro_ok: bool,
    }

    impl ImuPort for ScriptedImu {
        fn configure(&mut self, _: ImuChannel, _: ImuAttribute, _: SensorValue) -> Result<(), SensorError> {
            Ok(())
        }

        fn fetch_sample(&mut self) -> Result<(), SensorError> {
            if self.fetch_ok { Ok(()) } else { Err(SensorError::FetchFailed) }
        }

        fn channel(&self, channel: ImuChannel) -> Result<[SensorValue; 3], SensorError> {
            match channel {
                ImuChannel::Accel => Ok([SensorValue::from_f64(1.5), SensorValue::ZERO, SensorValue::from_int(9)]),
                ImuChannel::Gyro if self.gyro_ok => Ok([SensorValue::from_f64(0.1); 3]),
                ImuChannel::Gyro => Err(SensorError::Bus),
            }
        }
    }

    struct FixedAdc(i32);

    impl AdcPort for FixedAdc {
        fn read_raw(&mut self) -> Result<i32, SensorError> {
            Ok(self.0)
        }

        fn raw_to_millivolts(&self, raw: i32) -> Result<i32, SensorError> {
            Ok(raw)
        }
    }

    fn hub(fetch_ok: bool, gyro_ok: bool) -> SensorHub<ScriptedImu, FixedAdc> {
        SensorHub::new(
            ScriptedImu { fetch_ok, gyro_ok },
            ThermistorSensor::new(FixedAdc(1500), ThermistorModel::default()),
        )
    }

    #[test]
    fn fetch_failure_fails_the_sample() {
        assert_eq!(hub(false, true).read_motion(), Err(SensorError::FetchFailed));
    }

    #[test]
    fn gyro_failure_zeroes_gyro_only() {
        let sample = hub(true, false).read_motion().unwrap();
        assert!((sample.accel_x() - 1.5).abs() < 1e-9);
        assert_eq!(sample.gyro, [SensorValue::ZERO; 3]);
    }

    #[test]
    fn thermistor_reads_through_the_model() {
        let reading = hub(true, true).read_thermistor().unwrap();
        assert_eq!(reading.millivolts, 1500);
        assert!((reading.celsius - 25.0).abs() < 0.5);
    }
}
