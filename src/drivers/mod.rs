//! Actuator drivers, interrupt setup, and the task watchdog.

pub mod button;
pub mod hw_init;
pub mod leds;
pub mod pair;
pub mod pulse_pair;
pub mod pwm;
pub mod watchdog;
