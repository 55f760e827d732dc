//! Unified error types for the Thermoband firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level control loop's error handling uniform. All variants are `Copy`
//! so they can be passed through the control service and the relay without
//! allocation.

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned unusable data.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// The BLE relay could not complete an operation.
    Relay(RelayError),
    /// Peripheral initialisation failed (device not ready).
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Relay(e) => write!(f, "relay: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Maps a device readiness check onto the funnel: `NotReady` becomes
    /// `Init(device)`, any other sensor error is kept as is.
    pub fn not_ready(device: &'static str) -> impl FnOnce(SensorError) -> Self {
        move |e| match e {
            SensorError::NotReady => Self::Init(device),
            other => Self::Sensor(other),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(match e {
            ConfigError::ValidationFailed(msg) => msg,
            ConfigError::NotFound => "not found",
            ConfigError::Corrupted => "corrupted",
            ConfigError::StorageFull => "storage full",
            ConfigError::IoError => "storage I/O failed",
        })
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Device did not answer its identity probe.
    NotReady,
    /// I2C transaction failed.
    Bus,
    /// Sample fetch failed; no fresh data this tick.
    FetchFailed,
    /// Channel read before any sample was fetched.
    NoSample,
    /// ADC read returned an error.
    AdcReadFailed,
    /// Raw-to-millivolt conversion is not available for this channel.
    ConversionUnsupported,
    /// Channel/attribute/value combination not supported by the driver.
    Unsupported,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "device not ready"),
            Self::Bus => write!(f, "bus transaction failed"),
            Self::FetchFailed => write!(f, "sample fetch failed"),
            Self::NoSample => write!(f, "no sample fetched"),
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::ConversionUnsupported => write!(f, "raw to millivolts not supported"),
            Self::Unsupported => write!(f, "attribute not supported"),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
    /// GPIO set failed.
    GpioWriteFailed,
    /// Pulse width longer than the period, or a zero period.
    InvalidPulse,
    /// Period differs from the one the PWM timer was configured with.
    UnsupportedPeriod,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::InvalidPulse => write!(f, "invalid pulse width"),
            Self::UnsupportedPeriod => write!(f, "unsupported PWM period"),
        }
    }
}

impl std::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Relay errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    /// A required configuration field was empty.
    MissingField(&'static str),
    /// A configuration field does not fit its fixed-capacity buffer.
    FieldTooLong(&'static str),
    /// The target name contains non-printable characters.
    InvalidName,
    /// A UUID string could not be parsed.
    InvalidUuid,
    /// No advertising device matched the target name or service.
    TargetNotFound,
    /// The link-layer connection could not be established.
    ConnectFailed,
    /// The peer does not expose the configured service.
    ServiceNotFound,
    /// No writable characteristic under the configured service.
    NoWritableCharacteristic,
    /// Operation needs a connected peer with a selected characteristic.
    NotConnected,
    /// The characteristic write was rejected or timed out.
    WriteFailed,
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing field '{field}'"),
            Self::FieldTooLong(field) => write!(f, "field '{field}' too long"),
            Self::InvalidName => write!(f, "name must be printable ASCII"),
            Self::InvalidUuid => write!(f, "invalid UUID"),
            Self::TargetNotFound => write!(f, "target not found"),
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::ServiceNotFound => write!(f, "service not found on peer"),
            Self::NoWritableCharacteristic => write!(f, "no writable characteristic under the service"),
            Self::NotConnected => write!(f, "not connected"),
            Self::WriteFailed => write!(f, "characteristic write failed"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<RelayError> for Error {
    fn from(e: RelayError) -> Self {
        Self::Relay(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
