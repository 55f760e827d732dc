//! Integration tests for the sample → decide → actuate → report pipeline.
//!
//! These run on the host and drive `ControlService` against `MockBoard`,
//! checking the actuator command history and the emitted events.

use crate::mock_hw::{ActuatorCall, MockBoard, RecordingSink};

use thermoband::app::events::{Actuator, AppEvent};
use thermoband::app::service::ControlService;
use thermoband::config::{ControlMode, SystemConfig};
use thermoband::control::actuation::GuardState;
use thermoband::error::SensorError;
use thermoband::events::LatchFlag;

const PERIOD: u32 = 10_000_000;
const HALF: u32 = 5_000_000;

fn actuation() -> (ControlService, MockBoard, RecordingSink) {
    let mut service = ControlService::new(SystemConfig::default());
    let mut hw = MockBoard::new();
    let mut sink = RecordingSink::new();
    service.start(&mut hw, &mut sink);
    hw.calls.clear();
    (service, hw, sink)
}

fn reference_mode() -> (ControlService, MockBoard, RecordingSink) {
    let config = SystemConfig {
        mode: ControlMode::ReferenceLatch,
        ..SystemConfig::default()
    };
    let mut service = ControlService::new(config);
    let mut hw = MockBoard::new();
    let mut sink = RecordingSink::new();
    service.start(&mut hw, &mut sink);
    hw.calls.clear();
    (service, hw, sink)
}

// ── Start-up ─────────────────────────────────────────────────

#[test]
fn start_drives_everything_off_and_announces_mode() {
    let mut service = ControlService::new(SystemConfig::default());
    let mut hw = MockBoard::new();
    let mut sink = RecordingSink::new();
    service.start(&mut hw, &mut sink);

    assert_eq!(hw.last_leds(), Some(false));
    assert_eq!(hw.last_peltier_pulse(), Some(0));
    assert_eq!(hw.last_lra_pulse(), Some(0));
    assert!(matches!(sink.events[0], AppEvent::Started(ControlMode::Actuation)));
}

// ── Actuation mode ───────────────────────────────────────────

#[test]
fn still_and_cool_turns_everything_on() {
    let (mut service, mut hw, mut sink) = actuation();
    hw.push_accel_x(0.5);
    hw.set_temperature(Ok(30.0));

    let report = service.tick(&mut hw, &LatchFlag::new(), &mut sink).unwrap();

    assert_eq!(
        hw.calls,
        vec![
            ActuatorCall::Leds(true),
            ActuatorCall::Lra { period_ns: PERIOD, pulse_ns: HALF },
            ActuatorCall::Peltier { period_ns: PERIOD, pulse_ns: HALF },
        ]
    );
    assert!(report.state.leds && report.state.lra && report.state.peltier);
    assert_eq!(report.peltier_duty, 50);
    assert_eq!(report.lra_duty, 50);
}

#[test]
fn motion_at_threshold_turns_everything_off() {
    let (mut service, mut hw, mut sink) = actuation();
    hw.push_accel_x(5.0);

    let report = service.tick(&mut hw, &LatchFlag::new(), &mut sink).unwrap();

    assert_eq!(hw.last_leds(), Some(false));
    assert_eq!(hw.last_lra_pulse(), Some(0));
    assert_eq!(hw.last_peltier_pulse(), Some(0));
    assert_eq!(report.guard, Some(GuardState::NotEvaluated));
}

#[test]
fn hot_band_keeps_lra_but_cuts_peltier() {
    let (mut service, mut hw, mut sink) = actuation();
    hw.push_accel_x(1.0);
    hw.set_temperature(Ok(46.0));

    let report = service.tick(&mut hw, &LatchFlag::new(), &mut sink).unwrap();

    assert_eq!(hw.last_leds(), Some(true));
    assert_eq!(hw.last_lra_pulse(), Some(HALF));
    assert_eq!(hw.last_peltier_pulse(), Some(0));
    assert!(matches!(report.guard, Some(GuardState::Tripped { .. })));
}

#[test]
fn missing_temperature_does_not_block_peltier() {
    let (mut service, mut hw, mut sink) = actuation();
    hw.push_accel_x(4.0);
    hw.set_temperature(Err(SensorError::AdcReadFailed));

    let report = service.tick(&mut hw, &LatchFlag::new(), &mut sink).unwrap();

    assert_eq!(hw.last_peltier_pulse(), Some(HALF));
    assert_eq!(report.thermistor, None);
    assert_eq!(report.guard, Some(GuardState::Clear { celsius: None }));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::TemperatureUnavailable(SensorError::AdcReadFailed))),
        1
    );
}

#[test]
fn failed_sample_skips_the_tick_without_writes() {
    let (mut service, mut hw, mut sink) = actuation();
    hw.push_motion_error(SensorError::FetchFailed);

    assert!(service.tick(&mut hw, &LatchFlag::new(), &mut sink).is_none());
    assert!(hw.calls.is_empty());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::SampleSkipped(_))), 1);
    assert_eq!(service.tick_count(), 1);
}

#[test]
fn partial_pair_write_is_reported_and_retried_next_tick() {
    let (mut service, mut hw, mut sink) = actuation();
    hw.peltier_fault = Some(1);
    hw.push_accel_x(0.0);
    hw.push_accel_x(0.0);

    let first = service.tick(&mut hw, &LatchFlag::new(), &mut sink).unwrap();
    assert_eq!(first.failed_writes, 1);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ActuatorFault { actuator: Actuator::Peltier, write } if write.is_partial())),
        1
    );

    hw.peltier_fault = None;
    let second = service.tick(&mut hw, &LatchFlag::new(), &mut sink).unwrap();
    assert_eq!(second.failed_writes, 0);
    let peltier_writes = hw
        .calls
        .iter()
        .filter(|c| matches!(c, ActuatorCall::Peltier { pulse_ns: HALF, .. }))
        .count();
    assert_eq!(peltier_writes, 2);
}

#[test]
fn actuation_ignores_the_latch() {
    let (mut service, mut hw, mut sink) = actuation();
    let latch = LatchFlag::new();
    latch.raise();
    hw.push_accel_x(0.0);

    service.tick(&mut hw, &latch, &mut sink).unwrap();

    assert_eq!(service.reference(), None);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ReferenceLatched(_))), 0);
}

// ── Reference-latch mode ─────────────────────────────────────

#[test]
fn no_reference_keeps_leds_off() {
    let (mut service, mut hw, mut sink) = reference_mode();
    hw.push_accel_x(-20.0);

    let report = service.tick(&mut hw, &LatchFlag::new(), &mut sink).unwrap();

    assert_eq!(hw.calls, vec![ActuatorCall::Leds(false)]);
    assert_eq!(report.reference, None);
    assert_eq!(report.change, None);
}

#[test]
fn latch_then_drop_lights_leds() {
    let (mut service, mut hw, mut sink) = reference_mode();
    let latch = LatchFlag::new();

    latch.raise();
    hw.push_accel_x(2.0);
    let latched = service.tick(&mut hw, &latch, &mut sink).unwrap();
    assert_eq!(latched.reference, Some(2.0));
    assert_eq!(latched.change, Some(0.0));
    assert!(!latched.state.leds);
    assert!(!latch.is_pending());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ReferenceLatched(x) if *x == 2.0)), 1);

    hw.push_accel_x(-1.5);
    let dropped = service.tick(&mut hw, &latch, &mut sink).unwrap();
    assert_eq!(dropped.change, Some(3.5));
    assert_eq!(hw.last_leds(), Some(true));

    hw.push_accel_x(-0.5);
    service.tick(&mut hw, &latch, &mut sink).unwrap();
    assert_eq!(hw.last_leds(), Some(false));
}

#[test]
fn reference_mode_never_touches_pwm() {
    let (mut service, mut hw, mut sink) = reference_mode();
    let latch = LatchFlag::new();
    latch.raise();
    for x in [0.0, -5.0, 3.0] {
        hw.push_accel_x(x);
        service.tick(&mut hw, &latch, &mut sink).unwrap();
    }
    assert!(hw.calls.iter().all(|c| matches!(c, ActuatorCall::Leds(_))));
}

#[test]
fn latch_survives_a_failed_sample() {
    let (mut service, mut hw, mut sink) = reference_mode();
    let latch = LatchFlag::new();
    latch.raise();

    hw.push_motion_error(SensorError::FetchFailed);
    assert!(service.tick(&mut hw, &latch, &mut sink).is_none());
    assert!(latch.is_pending());

    hw.push_accel_x(1.0);
    service.tick(&mut hw, &latch, &mut sink).unwrap();
    assert_eq!(service.reference(), Some(1.0));
}

#[test]
fn relatching_replaces_the_reference() {
    let (mut service, mut hw, mut sink) = reference_mode();
    let latch = LatchFlag::new();

    latch.raise();
    hw.push_accel_x(1.0);
    service.tick(&mut hw, &latch, &mut sink).unwrap();

    latch.raise();
    hw.push_accel_x(-4.0);
    service.tick(&mut hw, &latch, &mut sink).unwrap();

    assert_eq!(service.reference(), Some(-4.0));
}

// ── Runtime config ───────────────────────────────────────────

#[test]
fn mode_switch_clears_the_reference() {
    let (mut service, mut hw, mut sink) = reference_mode();
    let latch = LatchFlag::new();
    latch.raise();
    hw.push_accel_x(1.0);
    service.tick(&mut hw, &latch, &mut sink).unwrap();
    assert!(service.reference().is_some());

    service.update_config(SystemConfig::default()).unwrap();
    assert_eq!(service.mode(), ControlMode::Actuation);
    assert_eq!(service.reference(), None);
}

#[test]
fn invalid_config_is_rejected_and_current_kept() {
    let (mut service, _, _) = actuation();
    let bad = SystemConfig {
        pwm_period_ns: 0,
        ..SystemConfig::default()
    };
    assert!(service.update_config(bad).is_err());
    assert_eq!(service.config().pwm_period_ns, PERIOD);
}
