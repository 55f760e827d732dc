//! MPU-6050 six-axis IMU driver.
//!
//! Register-level driver over any `embedded_hal::i2c::I2c` bus, exposed
//! through [`ImuPort`]. Host tests drive it with an emulated register file.
//!
//! Accel/gyro share one sample-rate divider and one digital low-pass
//! filter, so `SamplingFrequency` and `Oversampling` apply to both channels
//! whichever channel they are set on.

use core::f64::consts::PI;

use embedded_hal::i2c::I2c;
use log::info;

use super::imu::{ImuAttribute, ImuChannel, ImuPort, SensorValue};
use crate::error::SensorError;

pub const DEFAULT_ADDRESS: u8 = 0x68;

const REG_SMPLRT_DIV: u8 = 0x19;
const REG_CONFIG: u8 = 0x1A;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B; // Start of 14-byte burst
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I_EXPECTED: u8 = 0x68;

/// Gyro output rate with the low-pass filter enabled.
const BASE_RATE_HZ: i32 = 1000;
const STANDARD_GRAVITY: f64 = 9.80665;

pub struct Mpu6050<I2C> {
    i2c: I2C,
    address: u8,
    accel_lsb_per_g: f64,
    gyro_lsb_per_dps: f64,
    /// ax, ay, az, temp, gx, gy, gz
    raw: Option<[i16; 7]>,
}

impl<I2C: I2c> Mpu6050<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            accel_lsb_per_g: 16_384.0,
            gyro_lsb_per_dps: 131.0,
            raw: None,
        }
    }

    /// Probe WHO_AM_I, wake the device and enable the low-pass filter.
    /// `NotReady` here is fatal for the caller.
    pub fn init(&mut self) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(self.address, &[REG_WHO_AM_I], &mut id)
            .map_err(|_| SensorError::NotReady)?;
        if id[0] != WHO_AM_I_EXPECTED {
            return Err(SensorError::NotReady);
        }

        self.write_reg(REG_PWR_MGMT_1, 0x00)?;
        self.write_reg(REG_CONFIG, 0x01)?;
        info!("MPU6050 ready at 0x{:02x}", self.address);
        Ok(())
    }

    /// Give the bus back (e.g. to share it after a failed probe).
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(|_| SensorError::Bus)
    }

    fn set_accel_full_scale(&mut self, g: i32) -> Result<(), SensorError> {
        let (bits, lsb) = match g {
            2 => (0x00, 16_384.0),
            4 => (0x08, 8_192.0),
            8 => (0x10, 4_096.0),
            16 => (0x18, 2_048.0),
            _ => return Err(SensorError::Unsupported),
        };
        self.write_reg(REG_ACCEL_CONFIG, bits)?;
        self.accel_lsb_per_g = lsb;
        Ok(())
    }

    fn set_gyro_full_scale(&mut self, dps: i32) -> Result<(), SensorError> {
        let (bits, lsb) = match dps {
            250 => (0x00, 131.0),
            500 => (0x08, 65.5),
            1000 => (0x10, 32.8),
            2000 => (0x18, 16.4),
            _ => return Err(SensorError::Unsupported),
        };
        self.write_reg(REG_GYRO_CONFIG, bits)?;
        self.gyro_lsb_per_dps = lsb;
        Ok(())
    }

    fn set_sampling_frequency(&mut self, hz: i32) -> Result<(), SensorError> {
        if !(4..=BASE_RATE_HZ).contains(&hz) {
            return Err(SensorError::Unsupported);
        }
        let divider = (BASE_RATE_HZ / hz - 1) as u8;
        self.write_reg(REG_SMPLRT_DIV, divider)
    }

    /// Averaging maps onto the low-pass filter setting (1 = widest band).
    fn set_oversampling(&mut self, factor: i32) -> Result<(), SensorError> {
        if !(1..=6).contains(&factor) {
            return Err(SensorError::Unsupported);
        }
        self.write_reg(REG_CONFIG, factor as u8)
    }
}

impl<I2C: I2c> ImuPort for Mpu6050<I2C> {
    fn configure(
        &mut self,
        channel: ImuChannel,
        attribute: ImuAttribute,
        value: SensorValue,
    ) -> Result<(), SensorError> {
        // Every supported value is integral.
        if value.val2 != 0 {
            return Err(SensorError::Unsupported);
        }
        match (channel, attribute) {
            (ImuChannel::Accel, ImuAttribute::FullScale) => self.set_accel_full_scale(value.val1),
            (ImuChannel::Gyro, ImuAttribute::FullScale) => self.set_gyro_full_scale(value.val1),
            (_, ImuAttribute::SamplingFrequency) => self.set_sampling_frequency(value.val1),
            (_, ImuAttribute::Oversampling) => self.set_oversampling(value.val1),
        }
    }

    fn fetch_sample(&mut self) -> Result<(), SensorError> {
        let mut buf = [0u8; 14];
        self.i2c
            .write_read(self.address, &[REG_ACCEL_XOUT_H], &mut buf)
            .map_err(|_| SensorError::FetchFailed)?;

        let mut raw = [0i16; 7];
        for (i, word) in raw.iter_mut().enumerate() {
            *word = i16::from_be_bytes([buf[2 * i], buf[2 * i + 1]]);
        }
        self.raw = Some(raw);
        Ok(())
    }

    fn channel(&self, channel: ImuChannel) -> Result<[SensorValue; 3], SensorError> {
        let raw = self.raw.ok_or(SensorError::NoSample)?;
        let (axes, scale) = match channel {
            ImuChannel::Accel => (&raw[0..3], STANDARD_GRAVITY / self.accel_lsb_per_g),
            ImuChannel::Gyro => (&raw[4..7], PI / 180.0 / self.gyro_lsb_per_dps),
        };
        Ok([
            SensorValue::from_f64(f64::from(axes[0]) * scale),
            SensorValue::from_f64(f64::from(axes[1]) * scale),
            SensorValue::from_f64(f64::from(axes[2]) * scale),
        ])
    }
}
