//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                  |
//! |----------------|--------------------|------------------------------|
//! | `hardware`     | SensorPort         | MPU6050 (I2C), ADC thermistor|
//! |                | ActuatorPort       | LEDC PWM, GPIO LEDs          |
//! | `log_sink`     | EventSink          | Serial log output            |
//! | `nvs`          | ConfigPort         | NVS / in-memory store        |
//! |                | StoragePort        |                              |
//! | `ble_central`  | BleCentralPort     | Bluedroid GATTC / sim        |
//! | `http_server`  | -                  | esp-idf HTTP server          |
//! | `wifi`         | -                  | ESP-IDF WiFi AP              |
//! | `time`         | -                  | ESP32 system timer           |

pub mod ble_central;
pub mod hardware;
#[cfg(target_os = "espidf")]
pub mod http_server;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod wifi;
