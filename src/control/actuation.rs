//! Motion-gated actuation with a thermal cutoff on the Peltier pair.
//!
//! Rule, in evaluation order:
//! 1. `ax >= motion threshold` (or `ax` is NaN): everything off, the thermal
//!    guard is not evaluated.
//! 2. Otherwise LEDs and LRAs on, Peltier on, then the guard runs last:
//!    a temperature that is available and above the cutoff forces the
//!    Peltier off.

use super::ActuatorState;
use crate::config::SystemConfig;

/// What the thermal guard saw this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuardState {
    /// Motion gate closed; guard skipped.
    NotEvaluated,
    /// Temperature above the cutoff; Peltier forced off.
    Tripped { celsius: f64 },
    /// Peltier allowed; `None` when temperature was unavailable.
    Clear { celsius: Option<f64> },
}

impl GuardState {
    pub fn tripped(&self) -> bool {
        matches!(self, Self::Tripped { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: ActuatorState,
    pub guard: GuardState,
}

/// Decide the actuator intent for one tick.
pub fn decide(accel_x: f64, temperature_c: Option<f64>, config: &SystemConfig) -> Decision {
    if accel_x.is_nan() || accel_x >= config.motion_threshold_ms2 {
        return Decision {
            state: ActuatorState::ALL_OFF,
            guard: GuardState::NotEvaluated,
        };
    }

    let guard = match temperature_c {
        Some(t) if t > config.temperature_cutoff_c => GuardState::Tripped { celsius: t },
        other => GuardState::Clear { celsius: other },
    };

    Decision {
        state: ActuatorState {
            leds: true,
            lra: true,
            peltier: !guard.tripped(),
        },
        guard,
    }
}
