//! Integration tests for the BLE relay: web routes → link → central.
//!
//! `SimCentral` stands in for Bluedroid and `NvsAdapter` runs on its
//! in-memory backend.

use thermoband::adapters::ble_central::{SimCentral, SimPeripheral};
use thermoband::adapters::nvs::NvsAdapter;
use thermoband::app::ports::StoragePort;
use thermoband::error::RelayError;
use thermoband::relay::config::{KEY_BLE_NAME, PREFS_NAMESPACE};
use thermoband::relay::link::{
    AdvertisedDevice, BleAddress, CharProps, RECONNECT_INTERVAL_MS, RemoteCharacteristic, RemoteService,
};
use thermoband::relay::{BleUuid, LedCommand, Method, RelayConfig, RelayLink, RelayWebApp, WebRequest};

const SVC: BleUuid = BleUuid::from_u16(0xffff);
const CHR: BleUuid = BleUuid::from_u16(0xff01);

fn addr(last: u8) -> BleAddress {
    BleAddress {
        bytes: [0xc0, 0, 0, 0, 0, last],
        random: true,
    }
}

fn chr(uuid: BleUuid, bits: u8) -> RemoteCharacteristic {
    RemoteCharacteristic {
        uuid,
        props: CharProps::from_bits(bits),
    }
}

fn peripheral(name: &str, last: u8, advertised: Vec<BleUuid>, chars: Vec<RemoteCharacteristic>) -> SimPeripheral {
    SimPeripheral {
        device: AdvertisedDevice {
            address: addr(last),
            name: Some(name.to_owned()),
            rssi: -60,
            services: advertised,
        },
        services: vec![RemoteService {
            uuid: SVC,
            characteristics: chars,
        }],
    }
}

/// Writable with and without response.
fn board() -> SimPeripheral {
    peripheral("nRF5340DK", 1, vec![], vec![chr(CHR, 0x08 | 0x04)])
}

fn app_with(central: SimCentral) -> RelayWebApp<SimCentral, NvsAdapter> {
    RelayWebApp::new(central, NvsAdapter::new().unwrap())
}

fn post(uri: &str, body: &str) -> WebRequest {
    WebRequest::new(Method::Post, uri, body)
}

fn get(uri: &str) -> WebRequest {
    WebRequest::new(Method::Get, uri, "")
}

// ── Link: discovery and selection ────────────────────────────

#[test]
fn connects_by_name_case_insensitively() {
    let central = SimCentral::new()
        .with_peripheral(peripheral("other", 9, vec![], vec![chr(CHR, 0x08)]))
        .with_peripheral(peripheral("NRF5340dk", 1, vec![], vec![chr(CHR, 0x08)]));
    let mut link = RelayLink::new(central, RelayConfig::default());

    assert!(link.ensure_connected(0));
    assert_eq!(link.central().connected_address(), Some(addr(1)));
    assert_eq!(link.selected().map(|c| c.uuid), Some(CHR));
}

#[test]
fn connects_by_advertised_service_when_name_differs() {
    let central = SimCentral::new().with_peripheral(peripheral("band", 2, vec![SVC], vec![chr(CHR, 0x08)]));
    let mut link = RelayLink::new(central, RelayConfig::default());
    assert!(link.ensure_connected(0));
    assert!(link.is_ready());
}

#[test]
fn missing_target_is_reported() {
    let central = SimCentral::new().with_peripheral(peripheral("other", 9, vec![], vec![]));
    let mut link = RelayLink::new(central, RelayConfig::default());
    assert_eq!(link.connect_to_target(), Err(RelayError::TargetNotFound));
    assert!(link.central().connected_address().is_none());
}

#[test]
fn falls_back_to_first_writable_characteristic() {
    let other = BleUuid::from_u16(0xff02);
    let central = SimCentral::new().with_peripheral(peripheral(
        "nRF5340DK",
        1,
        vec![],
        vec![chr(BleUuid::from_u16(0xff05), 0x02), chr(other, 0x08)],
    ));
    let mut link = RelayLink::new(central, RelayConfig::default());
    link.connect_to_target().unwrap();
    assert_eq!(link.selected().map(|c| c.uuid), Some(other));
}

#[test]
fn read_only_configured_characteristic_disconnects() {
    let central = SimCentral::new().with_peripheral(peripheral("nRF5340DK", 1, vec![], vec![chr(CHR, 0x02 | 0x10)]));
    let mut link = RelayLink::new(central, RelayConfig::default());
    assert_eq!(link.connect_to_target(), Err(RelayError::NoWritableCharacteristic));
    assert!(link.central().connected_address().is_none());
    assert!(!link.is_ready());
}

#[test]
fn missing_service_disconnects() {
    let mut p = board();
    p.services[0].uuid = BleUuid::from_u16(0x180d);
    let mut link = RelayLink::new(SimCentral::new().with_peripheral(p), RelayConfig::default());
    assert_eq!(link.connect_to_target(), Err(RelayError::ServiceNotFound));
    assert!(link.central().connected_address().is_none());
}

// ── Link: pacing ─────────────────────────────────────────────

#[test]
fn reconnect_attempts_are_paced() {
    let mut link = RelayLink::new(SimCentral::new(), RelayConfig::default());

    assert!(!link.ensure_connected(1_000));
    assert!(!link.ensure_connected(1_000 + RECONNECT_INTERVAL_MS - 1));
    assert_eq!(link.central().scan_count(), 1);

    assert!(!link.ensure_connected(1_000 + RECONNECT_INTERVAL_MS));
    assert_eq!(link.central().scan_count(), 2);
}

#[test]
fn pacing_survives_clock_wrap() {
    let mut link = RelayLink::new(SimCentral::new(), RelayConfig::default());
    link.ensure_connected(u32::MAX - 1_000);
    link.ensure_connected(2_000);
    assert_eq!(link.central().scan_count(), 1);
    link.ensure_connected(4_000);
    assert_eq!(link.central().scan_count(), 2);
}

#[test]
fn connected_link_does_not_rescan() {
    let mut link = RelayLink::new(SimCentral::new().with_peripheral(board()), RelayConfig::default());
    assert!(link.ensure_connected(0));
    assert!(link.ensure_connected(60_000));
    assert_eq!(link.central().scan_count(), 1);
}

#[test]
fn dropped_link_reconnects_after_interval() {
    let mut link = RelayLink::new(SimCentral::new().with_peripheral(board()), RelayConfig::default());
    link.ensure_connected(0);
    link.central_mut().drop_link();

    assert!(!link.ensure_connected(100));
    assert!(!link.is_ready());
    assert!(link.ensure_connected(RECONNECT_INTERVAL_MS));
}

// ── Link: writes and discovery ───────────────────────────────

#[test]
fn prefers_write_without_response() {
    let mut link = RelayLink::new(SimCentral::new().with_peripheral(board()), RelayConfig::default());
    link.ensure_connected(0);
    link.write_command(LedCommand::Toggle).unwrap();

    let w = &link.central().writes()[0];
    assert_eq!(w.data, b"T");
    assert_eq!((w.service, w.characteristic), (SVC, CHR));
    assert!(!w.with_response);
}

#[test]
fn uses_write_with_response_when_only_option() {
    let central =
        SimCentral::new().with_peripheral(peripheral("nRF5340DK", 1, vec![], vec![chr(CHR, 0x08)]));
    let mut link = RelayLink::new(central, RelayConfig::default());
    link.ensure_connected(0);
    link.write_command(LedCommand::On).unwrap();
    assert!(link.central().writes()[0].with_response);
}

#[test]
fn write_fails_when_disconnected() {
    let mut link = RelayLink::new(SimCentral::new(), RelayConfig::default());
    assert_eq!(link.write_command(LedCommand::On), Err(RelayError::NotConnected));
}

#[test]
fn discover_lists_services_and_props() {
    let mut link = RelayLink::new(SimCentral::new().with_peripheral(board()), RelayConfig::default());
    assert!(link.discover().is_empty());

    link.ensure_connected(0);
    assert_eq!(
        link.discover(),
        vec![
            "SVC 0000ffff-0000-1000-8000-00805f9b34fb".to_owned(),
            "  CHR 0000ff01-0000-1000-8000-00805f9b34fb props:WWN".to_owned(),
        ]
    );
}

// ── Web routes ───────────────────────────────────────────────

#[test]
fn index_shows_escaped_values() {
    let mut app = app_with(SimCentral::new());
    let resp = app.handle(&post(
        "/save",
        "bleName=%3Cb%3Eband&svcUUID=ffff&chrUUID=ff01",
    ));
    assert_eq!(resp.status, 302);

    let page = app.handle(&get("/"));
    assert_eq!(page.status, 200);
    assert!(page.content_type.starts_with("text/html"));
    assert!(page.body.contains("value=\"&lt;b&gt;band\""));
    assert!(page.body.contains("0000ff01-0000-1000-8000-00805f9b34fb"));
}

#[test]
fn save_persists_and_redirects() {
    let mut app = app_with(SimCentral::new().with_peripheral(board()));
    app.poll(0);
    assert!(app.link().is_ready());

    let resp = app.handle(&post(
        "/save",
        "bleName=Band+7&svcUUID=0000ffff-0000-1000-8000-00805f9b34fb&chrUUID=FF01",
    ));
    assert_eq!(resp.status, 302);
    assert_eq!(resp.header("location"), Some("/"));
    assert_eq!(resp.body, "Saved.");

    assert_eq!(app.link().config().target_name(), "Band 7");
    assert!(!app.link().is_ready(), "reconfigure drops the link");

    let mut buf = [0u8; 32];
    let n = app.storage().read(PREFS_NAMESPACE, KEY_BLE_NAME, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"Band 7");
}

#[test]
fn save_retries_immediately() {
    let mut app = app_with(SimCentral::new());
    app.poll(10_000);
    app.handle(&post("/save", "bleName=x&svcUUID=ffff&chrUUID=ff01"));
    app.poll(10_001);
    assert_eq!(app.link().central().scan_count(), 2);
}

#[test]
fn save_rejects_missing_and_invalid_fields() {
    let mut app = app_with(SimCentral::new());

    let missing = app.handle(&post("/save", "bleName=x&svcUUID=ffff"));
    assert_eq!((missing.status, missing.body.as_str()), (400, "Missing parameters"));

    let empty = app.handle(&post("/save", "bleName=&svcUUID=ffff&chrUUID=ff01"));
    assert_eq!(empty.status, 400);

    let bad = app.handle(&post("/save", "bleName=x&svcUUID=nothex&chrUUID=ff01"));
    assert_eq!(bad.status, 400);
    assert_eq!(app.link().config(), &RelayConfig::default());
}

#[test]
fn save_requires_post() {
    let mut app = app_with(SimCentral::new());
    let resp = app.handle(&get("/save?bleName=x&svcUUID=ffff&chrUUID=ff01"));
    assert_eq!((resp.status, resp.body.as_str()), (405, "Method Not Allowed"));
}

#[test]
fn status_reports_link_state() {
    let mut app = app_with(SimCentral::new().with_peripheral(board()));

    let before: serde_json::Value = serde_json::from_str(&app.handle(&get("/status")).body).unwrap();
    assert_eq!(before["connected"], false);
    assert_eq!(before["msg"], "Not connected. ESP32 is trying to reconnect.");
    assert_eq!(before["bleName"], "nRF5340DK");
    assert_eq!(before["svcUUID"], "0000ffff-0000-1000-8000-00805f9b34fb");
    assert_eq!(before["chrUUID"], "0000ff01-0000-1000-8000-00805f9b34fb");

    app.poll(0);
    let after: serde_json::Value = serde_json::from_str(&app.handle(&get("/status")).body).unwrap();
    assert_eq!(after["connected"], true);
    assert_eq!(after["msg"], "BLE is connected, ready to write.");
}

#[test]
fn led_route_writes_command_byte() {
    let mut app = app_with(SimCentral::new().with_peripheral(board()));
    app.poll(0);

    let resp = app.handle(&post("/led?state=off", ""));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.content_type, "application/json");
    assert_eq!(resp.body, r#"{"ok":true,"msg":"Write succeeded."}"#);
    assert_eq!(app.link().central().writes()[0].data, b"0");
}

#[test]
fn led_route_reports_write_failure() {
    let mut app = app_with(SimCentral::new());
    let resp = app.handle(&post("/led?state=on", ""));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, r#"{"ok":false,"msg":"Write failed (not connected?)."}"#);
}

#[test]
fn led_route_validates_method_and_state() {
    let mut app = app_with(SimCentral::new());

    let wrong_method = app.handle(&get("/led?state=on"));
    assert_eq!(wrong_method.status, 405);
    assert_eq!(wrong_method.body, r#"{"msg":"Method Not Allowed"}"#);

    let bad_state = app.handle(&post("/led?state=blink", ""));
    assert_eq!(bad_state.status, 400);
    assert_eq!(bad_state.body, r#"{"msg":"Use state=on/off/toggle"}"#);
}

#[test]
fn discover_route_returns_list() {
    let mut app = app_with(SimCentral::new().with_peripheral(board()));
    assert_eq!(app.handle(&get("/discover")).body, r#"{"list":[]}"#);

    app.poll(0);
    let v: serde_json::Value = serde_json::from_str(&app.handle(&get("/discover")).body).unwrap();
    assert_eq!(v["list"].as_array().map(Vec::len), Some(2));
}

#[test]
fn read_routes_are_get_only() {
    let mut app = app_with(SimCentral::new().with_peripheral(board()));
    app.poll(0);
    for path in ["/", "/status", "/discover"] {
        let resp = app.handle(&post(path, ""));
        assert_eq!((resp.status, resp.body.as_str()), (405, "Method Not Allowed"), "{path}");
        let other = app.handle(&WebRequest::new(Method::Other, path, ""));
        assert_eq!(other.status, 405, "{path}");
    }
    assert!(app.link().central().writes().is_empty());
}

#[test]
fn unknown_route_is_404() {
    let mut app = app_with(SimCentral::new());
    assert_eq!(app.handle(&get("/nope")).status, 404);
}

#[test]
fn serial_bytes_drive_the_link() {
    let mut app = app_with(SimCentral::new().with_peripheral(board()));
    app.poll(0);

    assert_eq!(app.serial_byte(b'\n'), None);
    assert_eq!(app.serial_byte(b'1'), Some(Ok(())));
    app.link_mut().central_mut().set_write_fault(true);
    assert_eq!(app.serial_byte(b'T'), Some(Err(RelayError::WriteFailed)));
}

#[test]
fn stored_config_is_loaded_at_start() {
    let mut nvs = NvsAdapter::new().unwrap();
    RelayConfig::new("Band-9", "180d", "2a39").unwrap().save(&mut nvs).unwrap();
    let app = RelayWebApp::new(SimCentral::new(), nvs);
    assert_eq!(app.link().config().target_name(), "Band-9");
    assert_eq!(app.link().config().service(), BleUuid::from_u16(0x180d));
}
