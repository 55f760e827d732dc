//! GPIO / peripheral pin assignments for the Thermoband board (ESP32).
//!
//! `main` claims the typed `esp-idf-hal` pins directly:
//!
//! | Function              | GPIO      | Peripheral        |
//! |-----------------------|-----------|-------------------|
//! | LED0 / LED1           | 22 / 23   | GPIO out          |
//! | Peltier 0 / 1         | 25 / 26   | LEDC ch 0 / 1     |
//! | LRA 0 / 1             | 27 / 14   | LEDC ch 2 / 3     |
//! | Thermistor divider    | 34        | ADC1 channel 6    |
//! | IMU SDA / SCL         | 21 / 19   | I2C0              |
//! | Reference button      | 0         | GPIO in, ISR      |
//!
//! Only the values needed as raw numbers live here.

/// I²C bus speed to the IMU.
pub const I2C_BAUDRATE_HZ: u32 = 400_000;

/// Reference-latch button (active low, internal pull-up). Raw number for
/// the ISR setup in `hw_init`.
pub const BUTTON_GPIO: i32 = 0;
