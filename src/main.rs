//! Thermoband firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  HardwareAdapter          LogEventSink      NvsAdapter       │
//! │  (Sensor + Actuator)      (EventSink)       (ConfigPort)     │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ───────────────         │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │        ControlService (pure logic)                 │      │
//! │  │  actuation decision · reference tracker            │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  Button ISR ──▶ REFERENCE_LATCH        Watchdog (TWDT)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::adc::oneshot::AdcDriver;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{OutputPin as _, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, config::TimerConfig};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{error, info, warn};

use thermoband::adapters::hardware::HardwareAdapter;
use thermoband::adapters::log_sink::LogEventSink;
use thermoband::adapters::nvs::NvsAdapter;
use thermoband::app::service::ControlService;
use thermoband::config::{ControlMode, SystemConfig};
use thermoband::drivers::hw_init::init_button_isr;
use thermoband::drivers::leds::LedPair;
use thermoband::drivers::pulse_pair::PulsePair;
use thermoband::drivers::pwm::DutyCyclePwm;
use thermoband::drivers::watchdog::{DEFAULT_TIMEOUT_MS, Watchdog};
use thermoband::error::Error;
use thermoband::events::REFERENCE_LATCH;
use thermoband::pins;
use thermoband::sensors::SensorHub;
use thermoband::sensors::adc::{AdcPort, OneshotAdc};
use thermoband::sensors::imu::configure_imu;
use thermoband::sensors::mpu6050::{DEFAULT_ADDRESS, Mpu6050};
use thermoband::sensors::thermistor::{ThermistorModel, ThermistorSensor};

const NS_PER_SEC: u64 = 1_000_000_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("Thermoband v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config from NVS (or defaults), build-selected mode ─
    let mode = ControlMode::selected();
    let config = match NvsAdapter::new() {
        Ok(nvs) => SystemConfig::for_boot(&nvs, mode)?,
        Err(e) => {
            warn!("NVS init failed ({}), using defaults", e);
            SystemConfig { mode, ..SystemConfig::default() }
        }
    };
    info!(
        "mode={:?} threshold={} m/s^2 cutoff={} C period={} ns",
        config.mode, config.motion_threshold_ms2, config.temperature_cutoff_c, config.pwm_period_ns
    );

    let p = Peripherals::take()?;

    // ── 3. IMU over I2C ───────────────────────────────────────
    let i2c = I2cDriver::new(
        p.i2c0,
        p.pins.gpio21, // SDA
        p.pins.gpio19, // SCL
        &I2cConfig::new().baudrate(Hertz(pins::I2C_BAUDRATE_HZ)),
    )?;
    let mut imu = Mpu6050::new(i2c, DEFAULT_ADDRESS);
    imu.init().map_err(Error::not_ready("IMU"))?;
    let failed = configure_imu(&mut imu, &config.imu);
    if failed > 0 {
        warn!("{} IMU attribute(s) not applied", failed);
    }

    // ── 4. Thermistor ADC ─────────────────────────────────────
    let mut adc = OneshotAdc::new(AdcDriver::new(p.adc1)?, p.pins.gpio34)?;
    match adc.read_raw() {
        Ok(raw) => info!("ADC test read: raw={}", raw),
        Err(e) => warn!("ADC test read failed ({}); temperature will be N/A until it recovers", e),
    }
    let thermistor = ThermistorSensor::new(adc, ThermistorModel::new(config.thermistor));

    // ── 5. Actuators: LEDC PWM pairs + GPIO LEDs ──────────────
    let period_ns = config.pwm_period_ns;
    let freq_hz = (NS_PER_SEC / u64::from(period_ns)) as u32;
    let timer = LedcTimerDriver::new(p.ledc.timer0, &TimerConfig::new().frequency(Hertz(freq_hz)))?;
    let pwm = |driver: LedcDriver<'static>| DutyCyclePwm::new(driver, period_ns);

    let peltier = PulsePair::new(
        "peltier",
        pwm(LedcDriver::new(p.ledc.channel0, &timer, p.pins.gpio25)?),
        pwm(LedcDriver::new(p.ledc.channel1, &timer, p.pins.gpio26)?),
    );
    let lra = PulsePair::new(
        "lra",
        pwm(LedcDriver::new(p.ledc.channel2, &timer, p.pins.gpio27)?),
        pwm(LedcDriver::new(p.ledc.channel3, &timer, p.pins.gpio14)?),
    );
    let leds = LedPair::new(
        PinDriver::output(p.pins.gpio22.downgrade_output())?,
        PinDriver::output(p.pins.gpio23.downgrade_output())?,
    );

    let mut hw = HardwareAdapter::new(SensorHub::new(imu, thermistor), leds, peltier, lra);

    // ── 6. Button ISR + watchdog ──────────────────────────────
    if let Err(e) = init_button_isr() {
        error!("button ISR setup failed ({}); reference latch unavailable", e);
    }
    let watchdog = Watchdog::new(DEFAULT_TIMEOUT_MS);

    // ── 7. Control loop ───────────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut service = ControlService::new(config);
    service.start(&mut hw, &mut sink);

    let interval_ms = service.config().loop_interval_ms;
    loop {
        service.tick(&mut hw, &REFERENCE_LATCH, &mut sink);
        watchdog.feed();
        FreeRtos::delay_ms(interval_ms);
    }
}
