//! Interrupt-to-loop signalling.
//!
//! The button ISR is the only producer; the control loop is the only
//! consumer. A single atomic boolean is enough: the ISR raises it, the
//! next tick reads-and-clears it. Several edges between two ticks coalesce
//! into one consumption.
//!
//! ```text
//! ┌─────────────┐  raise()   ┌────────────┐  take()   ┌─────────────┐
//! │ Button ISR  │──────────▶│ LatchFlag  │─────────▶│ Control loop│
//! └─────────────┘            └────────────┘           └─────────────┘
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

/// Single-producer / single-consumer edge flag.
#[derive(Debug)]
pub struct LatchFlag {
    pending: AtomicBool,
}

impl LatchFlag {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Mark an edge. Lock-free: safe to call from interrupt context.
    pub fn raise(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Consume the flag. Returns `true` at most once per batch of edges.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Peek without consuming.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl Default for LatchFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference-latch request raised by the button ISR.
pub static REFERENCE_LATCH: LatchFlag = LatchFlag::new();
