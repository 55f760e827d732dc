//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each application event to the
//! `log` facade: the ESP-IDF logger on the device, whatever logger the
//! host installs otherwise.

use log::{Level, error, info, log, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::control::actuation::GuardState;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// Thermal guard outcome as a log line. Nothing when the guard was skipped.
fn guard_line(guard: &GuardState) -> Option<(Level, String)> {
    match *guard {
        GuardState::NotEvaluated => None,
        GuardState::Tripped { celsius } => Some((
            Level::Warn,
            format!("Temp {:.1}C above cutoff -> Peltier OFF", celsius),
        )),
        GuardState::Clear { celsius: Some(t) } => Some((Level::Info, format!("Peltier ON (Temp={:.1}C)", t))),
        GuardState::Clear { celsius: None } => Some((Level::Info, "Peltier ON (Temp=N/A)".to_owned())),
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(mode) => info!("START | mode={:?}, all actuators off", mode),
            AppEvent::Tick(report) => {
                if let Some((level, line)) = report.guard.as_ref().and_then(guard_line) {
                    log!(level, "{}", line);
                }
                info!("{}", report);
            }
            AppEvent::SampleSkipped(e) => warn!("TICK | IMU sample skipped ({})", e),
            AppEvent::TemperatureUnavailable(e) => warn!("TICK | thermistor unavailable ({})", e),
            AppEvent::ReferenceLatched(x) => info!("REF | reference X set to {:.3}", x),
            AppEvent::ActuatorFault { actuator, write } => {
                error!("FAULT | {} pair write {}", actuator, write);
            }
        }
    }
}
