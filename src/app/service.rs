//! Control service: the hexagonal core.
//!
//! [`ControlService`] owns the configuration and the reference-latch state
//! that would otherwise be module globals. All I/O flows through port
//! traits injected at call sites, so the whole loop body is testable with
//! mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                 │      ControlService      │
//! ActuatorPort ◀──│ actuation · reference    │◀── LatchFlag (ISR)
//!                 └──────────────────────────┘
//! ```

use log::info;

use crate::config::{ControlMode, SystemConfig};
use crate::control::actuation;
use crate::control::reference::ReferenceTracker;
use crate::control::ActuatorState;
use crate::drivers::pair::PairWrite;
use crate::drivers::pulse_pair::DriveState;
use crate::events::LatchFlag;

use super::events::{Actuator, AppEvent, TickReport};
use super::ports::{ActuatorPort, ConfigError, EventSink, SensorPort};

pub struct ControlService {
    config: SystemConfig,
    reference: ReferenceTracker,
    tick_count: u64,
}

impl ControlService {
    pub fn new(config: SystemConfig) -> Self {
        let reference = ReferenceTracker::new(config.reference_drop_ms2);
        Self {
            config,
            reference,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive every pair off and announce the mode.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        let failed = hw.all_off(self.config.pwm_period_ns);
        if failed > 0 {
            log::warn!("{} actuator writes failed while switching off at start", failed);
        }
        sink.emit(&AppEvent::Started(self.config.mode));
        info!("ControlService started in {:?} mode", self.config.mode);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one loop body: sample → decide → apply → report.
    ///
    /// `hw` satisfies both [`SensorPort`] and [`ActuatorPort`] to avoid a
    /// double mutable borrow. The latch is consumed only once a sample has
    /// been read, so an edge is not lost to a failed fetch.
    ///
    /// Returns `None` when the IMU sample could not be read.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        latch: &LatchFlag,
        sink: &mut impl EventSink,
    ) -> Option<TickReport> {
        self.tick_count += 1;

        let motion = match hw.read_motion() {
            Ok(m) => m,
            Err(e) => {
                sink.emit(&AppEvent::SampleSkipped(e));
                return None;
            }
        };

        let thermistor = match hw.read_thermistor() {
            Ok(r) => Some(r),
            Err(e) => {
                sink.emit(&AppEvent::TemperatureUnavailable(e));
                None
            }
        };

        let accel_x = motion.accel_x();
        let latched = latch.take();
        let period = self.config.pwm_period_ns;

        let mut report = TickReport {
            mode: self.config.mode,
            motion,
            thermistor,
            state: ActuatorState::ALL_OFF,
            guard: None,
            reference: None,
            change: None,
            peltier_duty: 0,
            lra_duty: 0,
            failed_writes: 0,
        };

        match self.config.mode {
            ControlMode::Actuation => {
                let decision = actuation::decide(accel_x, thermistor.map(|t| t.celsius), &self.config);
                let state = decision.state;
                let peltier_pulse = if state.peltier { self.config.peltier_on_pulse_ns } else { 0 };
                let lra_pulse = if state.lra { self.config.lra_on_pulse_ns } else { 0 };

                let leds = hw.set_leds(state.leds);
                let lra = hw.set_lra(period, lra_pulse);
                let peltier = hw.set_peltier(period, peltier_pulse);

                report.failed_writes = Self::report_faults(
                    sink,
                    &[(Actuator::Leds, leds), (Actuator::Lra, lra), (Actuator::Peltier, peltier)],
                );
                report.state = state;
                report.guard = Some(decision.guard);
                report.peltier_duty = DriveState::from_pulse(period, peltier_pulse).duty_percent();
                report.lra_duty = DriveState::from_pulse(period, lra_pulse).duty_percent();
            }
            ControlMode::ReferenceLatch => {
                let outcome = self.reference.update(accel_x, latched);
                if outcome.latched {
                    sink.emit(&AppEvent::ReferenceLatched(accel_x));
                }

                let leds = hw.set_leds(outcome.led_on);
                report.failed_writes = Self::report_faults(sink, &[(Actuator::Leds, leds)]);
                report.state.leds = outcome.led_on;
                report.reference = self.reference.reference();
                report.change = outcome.change;
            }
        }

        sink.emit(&AppEvent::Tick(report));
        Some(report)
    }

    fn report_faults(sink: &mut impl EventSink, writes: &[(Actuator, PairWrite)]) -> u8 {
        let mut failed = 0;
        for &(actuator, write) in writes {
            if !write.is_ok() {
                failed += write.failures();
                sink.emit(&AppEvent::ActuatorFault { actuator, write });
            }
        }
        failed
    }

    // ── Configuration ─────────────────────────────────────────

    /// Swap in a new configuration at runtime. Invalid configs are rejected
    /// and the current one is kept. The reference survives unless the mode
    /// changes.
    pub fn update_config(&mut self, config: SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if config.mode != self.config.mode {
            info!("Control mode {:?} -> {:?}", self.config.mode, config.mode);
            self.reference = ReferenceTracker::new(config.reference_drop_ms2);
        } else {
            self.reference.set_drop_threshold(config.reference_drop_ms2);
        }
        self.config = config;
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn mode(&self) -> ControlMode {
        self.config.mode
    }

    /// Latched reference X acceleration, if any.
    pub fn reference(&self) -> Option<f64> {
        self.reference.reference()
    }

    /// Ticks attempted since construction, including skipped ones.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_update_is_rejected() {
        let mut svc = ControlService::new(SystemConfig::default());
        let mut bad = SystemConfig::default();
        bad.pwm_period_ns = 0;
        assert!(svc.update_config(bad).is_err());
        assert_eq!(svc.config(), &SystemConfig::default());
    }

    #[test]
    fn mode_change_drops_the_reference() {
        let mut cfg = SystemConfig::default();
        cfg.mode = ControlMode::ReferenceLatch;
        let mut svc = ControlService::new(cfg.clone());
        svc.reference.update(1.0, true);
        assert_eq!(svc.reference(), Some(1.0));

        cfg.reference_drop_ms2 = 2.0;
        svc.update_config(cfg.clone()).unwrap();
        assert_eq!(svc.reference(), Some(1.0));

        cfg.mode = ControlMode::Actuation;
        svc.update_config(cfg).unwrap();
        assert_eq!(svc.reference(), None);
    }
}
