//! BLE relay: web UI on an open AP, single-byte writes to a peripheral.
//!
//! ```text
//!  phone ──HTTP──▶ EspHttpServer ─┐
//!                                 ├─▶ RelayWebApp ──▶ RelayLink ──GATT──▶ peripheral
//!  serial '1'/'0'/'T' ────────────┘        │
//!                                     NvsAdapter (cfg/bleName, svcUUID, chrUUID)
//! ```

#![deny(unused_must_use)]

use std::io::Read;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use log::{info, warn};

use thermoband::adapters::ble_central::EspBleCentral;
use thermoband::adapters::http_server::start_http_server;
use thermoband::adapters::nvs::NvsAdapter;
use thermoband::adapters::time::MonotonicClock;
use thermoband::adapters::wifi::{AccessPointSettings, start_access_point};
use thermoband::relay::RelayWebApp;

const LOOP_INTERVAL_MS: u32 = 10;

/// Forward console bytes to the main loop.
fn spawn_serial_reader() -> Result<Receiver<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("serial-in".into())
        .stack_size(4 * 1024)
        .spawn(move || {
            let mut stdin = std::io::stdin();
            let mut byte = [0u8; 1];
            loop {
                match stdin.read(&mut byte) {
                    Ok(1) => {
                        if tx.send(byte[0]).is_err() {
                            return;
                        }
                    }
                    _ => thread::sleep(Duration::from_millis(u64::from(LOOP_INTERVAL_MS))),
                }
            }
        })?;
    Ok(rx)
}

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("=== Thermoband BLE relay v{} ===", env!("CARGO_PKG_VERSION"));

    let p = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    let storage = NvsAdapter::new()?;
    let _wifi = start_access_point(p.modem, sysloop, None, &AccessPointSettings::open_default())?;
    let central = EspBleCentral::new()?;

    let app = Arc::new(Mutex::new(RelayWebApp::new(central, storage)));
    let _server = start_http_server(app.clone())?;
    let serial = spawn_serial_reader()?;
    let clock = MonotonicClock::new();

    loop {
        {
            let mut app = app.lock().map_err(|_| anyhow!("relay state poisoned"))?;
            app.poll(clock.now_ms());
            while let Ok(b) = serial.try_recv() {
                if let Some(Err(e)) = app.serial_byte(b) {
                    warn!("[Serial] command '{}' failed: {}", b as char, e);
                }
            }
        }
        FreeRtos::delay_ms(LOOP_INTERVAL_MS);
    }
}
