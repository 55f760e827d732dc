//! Reference-latch mode: light the LEDs when X acceleration drops more than
//! a fixed amount below a user-captured reference.
//!
//! `NoReference -> ReferenceSet` on the first latch. Every later latch
//! overwrites the reference; there is no way back to `NoReference`.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceState {
    NoReference,
    ReferenceSet(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceOutcome {
    pub led_on: bool,
    /// `reference - current`, once a reference exists.
    pub change: Option<f64>,
    /// A latch was consumed on this tick.
    pub latched: bool,
}

#[derive(Debug, Clone)]
pub struct ReferenceTracker {
    state: ReferenceState,
    drop_threshold: f64,
}

impl ReferenceTracker {
    pub fn new(drop_threshold: f64) -> Self {
        Self {
            state: ReferenceState::NoReference,
            drop_threshold,
        }
    }

    pub fn state(&self) -> ReferenceState {
        self.state
    }

    pub fn reference(&self) -> Option<f64> {
        match self.state {
            ReferenceState::NoReference => None,
            ReferenceState::ReferenceSet(r) => Some(r),
        }
    }

    pub fn set_drop_threshold(&mut self, drop_threshold: f64) {
        self.drop_threshold = drop_threshold;
    }

    /// One tick. When `latch` is set the current sample becomes the
    /// reference before the comparison, so a latch tick reads change 0.
    pub fn update(&mut self, accel_x: f64, latch: bool) -> ReferenceOutcome {
        if latch {
            self.state = ReferenceState::ReferenceSet(accel_x);
        }

        match self.state {
            ReferenceState::NoReference => ReferenceOutcome {
                led_on: false,
                change: None,
                latched: false,
            },
            ReferenceState::ReferenceSet(reference) => {
                let change = reference - accel_x;
                ReferenceOutcome {
                    led_on: change > self.drop_threshold,
                    change: Some(change),
                    latched: latch,
                }
            }
        }
    }
}
