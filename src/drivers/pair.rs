//! Redundant actuator pairs.
//!
//! The band drives two LEDs, two Peltier elements and two LRAs, each pair
//! wired identically. [`ActuatorPair`] attempts the same write on both
//! members and reports each outcome in a [`PairWrite`]; a failed first
//! member never prevents the second from being written.
//!
//! A partial write is not rolled back. The caller re-applies its intent
//! on the next tick.

use core::fmt;

use log::error;

use crate::error::ActuatorError;

/// Outcome of driving both members of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairWrite {
    pub first: Result<(), ActuatorError>,
    pub second: Result<(), ActuatorError>,
}

impl PairWrite {
    pub const OK: Self = Self {
        first: Ok(()),
        second: Ok(()),
    };

    pub fn is_ok(&self) -> bool {
        self.first.is_ok() && self.second.is_ok()
    }

    /// Exactly one member was written.
    pub fn is_partial(&self) -> bool {
        self.first.is_ok() != self.second.is_ok()
    }

    pub fn failures(&self) -> u8 {
        u8::from(self.first.is_err()) + u8::from(self.second.is_err())
    }

    /// First error encountered, for callers that want a single result.
    pub fn into_result(self) -> Result<(), ActuatorError> {
        self.first.and(self.second)
    }
}

impl fmt::Display for PairWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let member = |r: &Result<(), ActuatorError>| match r {
            Ok(()) => "ok",
            Err(_) => "FAIL",
        };
        write!(f, "[{}, {}]", member(&self.first), member(&self.second))
    }
}

/// Two identical outputs addressed as one.
pub struct ActuatorPair<T> {
    name: &'static str,
    members: [T; 2],
}

impl<T> ActuatorPair<T> {
    pub fn new(name: &'static str, first: T, second: T) -> Self {
        Self {
            name,
            members: [first, second],
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Apply `write` to both members independently, logging each failure.
    pub fn drive(&mut self, mut write: impl FnMut(&mut T) -> Result<(), ActuatorError>) -> PairWrite {
        let [a, b] = &mut self.members;
        let first = write(a);
        if let Err(e) = &first {
            error!("{}[0] write failed ({})", self.name, e);
        }
        let second = write(b);
        if let Err(e) = &second {
            error!("{}[1] write failed ({})", self.name, e);
        }
        PairWrite { first, second }
    }

    pub fn members(&self) -> &[T; 2] {
        &self.members
    }
}
