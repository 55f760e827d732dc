//! Reference-latch button.
//!
//! Active-low momentary switch with pull-up. The GPIO ISR calls
//! [`button_isr_handler`], which raises [`REFERENCE_LATCH`] unless the edge
//! falls inside the debounce window of the previous accepted edge. The
//! control loop consumes the flag on its next tick.
//!
//! Rapid presses coalesce: the loop sees at most one latch per tick.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::events::{LatchFlag, REFERENCE_LATCH};

const DEBOUNCE_MS: u32 = 50;

/// Timestamp of the last accepted edge (ms since boot, truncated).
/// `u32::MAX` means no edge yet.
static LAST_EDGE_MS: AtomicU32 = AtomicU32::new(u32::MAX);

/// Debounce one edge against `last` and raise `flag` if accepted.
/// Returns whether the edge was accepted.
fn accept_edge(last: &AtomicU32, flag: &LatchFlag, now_ms: u32) -> bool {
    let prev = last.load(Ordering::Relaxed);
    if prev != u32::MAX && now_ms.wrapping_sub(prev) < DEBOUNCE_MS {
        return false;
    }
    last.store(now_ms, Ordering::Relaxed);
    flag.raise();
    true
}

/// ISR handler for the button's falling edge.
/// Lock-free; safe to call from interrupt context.
pub fn button_isr_handler(now_ms: u32) {
    accept_edge(&LAST_EDGE_MS, &REFERENCE_LATCH, now_ms);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_edge_raises_the_latch() {
        let last = AtomicU32::new(u32::MAX);
        let flag = LatchFlag::new();
        assert!(accept_edge(&last, &flag, 0));
        assert!(flag.take());
    }

    #[test]
    fn bounce_inside_window_is_ignored() {
        let last = AtomicU32::new(u32::MAX);
        let flag = LatchFlag::new();
        assert!(accept_edge(&last, &flag, 1000));
        assert!(flag.take());
        assert!(!accept_edge(&last, &flag, 1020));
        assert!(!flag.is_pending());
        assert!(accept_edge(&last, &flag, 1060));
        assert!(flag.take());
    }

    #[test]
    fn window_survives_timer_wrap() {
        let last = AtomicU32::new(u32::MAX);
        let flag = LatchFlag::new();
        assert!(accept_edge(&last, &flag, u32::MAX - 10));
        flag.take();
        assert!(!accept_edge(&last, &flag, 5));
        assert!(accept_edge(&last, &flag, 60));
    }
}
