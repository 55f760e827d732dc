//! BLE central adapters implementing [`BleCentralPort`].
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`EspBleCentral`], a Bluedroid GATT client
//!   driven through raw `esp_idf_svc::sys` calls. Bluedroid callbacks are C
//!   function pointers, so results are handed back through a static
//!   `Mutex` + `Condvar` pair and the blocking port methods wait on it.
//! - **all targets**: [`SimCentral`], a scripted set of peripherals for
//!   host tests and the simulation build.

use log::info;

use crate::error::RelayError;
use crate::relay::config::BleUuid;
use crate::relay::link::{AdvertisedDevice, BleAddress, BleCentralPort, RemoteService};

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

/// A peripheral the simulated central can find.
#[derive(Debug, Clone)]
pub struct SimPeripheral {
    pub device: AdvertisedDevice,
    pub services: Vec<RemoteService>,
}

/// One recorded characteristic write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimWrite {
    pub service: BleUuid,
    pub characteristic: BleUuid,
    pub data: Vec<u8>,
    pub with_response: bool,
}

#[derive(Debug, Default)]
pub struct SimCentral {
    peripherals: Vec<SimPeripheral>,
    connected: Option<usize>,
    connect_fault: bool,
    write_fault: bool,
    scans: u32,
    writes: Vec<SimWrite>,
}

impl SimCentral {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peripheral(mut self, p: SimPeripheral) -> Self {
        self.peripherals.push(p);
        self
    }

    pub fn set_connect_fault(&mut self, fault: bool) {
        self.connect_fault = fault;
    }

    pub fn set_write_fault(&mut self, fault: bool) {
        self.write_fault = fault;
    }

    /// Peer-initiated disconnect.
    pub fn drop_link(&mut self) {
        self.connected = None;
    }

    pub fn scan_count(&self) -> u32 {
        self.scans
    }

    pub fn writes(&self) -> &[SimWrite] {
        &self.writes
    }

    pub fn connected_address(&self) -> Option<BleAddress> {
        self.connected.map(|i| self.peripherals[i].device.address)
    }
}

impl BleCentralPort for SimCentral {
    fn scan(&mut self, duration_ms: u32) -> Result<Vec<AdvertisedDevice>, RelayError> {
        self.scans += 1;
        info!("BLE(sim): scan {} ms, {} peripheral(s)", duration_ms, self.peripherals.len());
        Ok(self.peripherals.iter().map(|p| p.device.clone()).collect())
    }

    fn connect(&mut self, address: &BleAddress) -> Result<(), RelayError> {
        if self.connect_fault {
            return Err(RelayError::ConnectFailed);
        }
        let idx = self
            .peripherals
            .iter()
            .position(|p| p.device.address == *address)
            .ok_or(RelayError::ConnectFailed)?;
        self.connected = Some(idx);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = None;
    }

    fn is_connected(&self) -> bool {
        self.connected.is_some()
    }

    fn services(&mut self) -> Result<Vec<RemoteService>, RelayError> {
        let idx = self.connected.ok_or(RelayError::NotConnected)?;
        Ok(self.peripherals[idx].services.clone())
    }

    fn write(
        &mut self,
        service: BleUuid,
        characteristic: BleUuid,
        data: &[u8],
        with_response: bool,
    ) -> Result<(), RelayError> {
        if self.connected.is_none() {
            return Err(RelayError::NotConnected);
        }
        if self.write_fault {
            return Err(RelayError::WriteFailed);
        }
        self.writes.push(SimWrite {
            service,
            characteristic,
            data: data.to_vec(),
            with_response,
        });
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF Bluedroid GATT client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::EspBleCentral;

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::{Condvar, Mutex, MutexGuard};
    use std::time::{Duration, Instant};

    use esp_idf_svc::sys::*;
    use log::{error, info, warn};

    use crate::error::RelayError;
    use crate::relay::config::BleUuid;
    use crate::relay::link::{
        AdvertisedDevice, AdvertisementFields, BleAddress, BleCentralPort, CharProps,
        RemoteCharacteristic, RemoteService,
    };

    const APP_ID: u16 = 0;
    const OPEN_TIMEOUT_MS: u64 = 10_000;
    const GATT_TIMEOUT_MS: u64 = 5_000;
    /// 45 ms interval / 30 ms window in 0.625 ms units.
    const SCAN_INTERVAL: u16 = 72;
    const SCAN_WINDOW: u16 = 48;

    /// Callback results, written by the Bluedroid task.
    struct Shared {
        gattc_if: Option<esp_gatt_if_t>,
        conn_id: Option<u16>,
        scan_params_set: bool,
        scanning: bool,
        scan_results: Vec<AdvertisedDevice>,
        open_status: Option<bool>,
        search_done: bool,
        found: Vec<(BleUuid, u16, u16)>,
        write_status: Option<bool>,
    }

    static SHARED: Mutex<Shared> = Mutex::new(Shared {
        gattc_if: None,
        conn_id: None,
        scan_params_set: false,
        scanning: false,
        scan_results: Vec::new(),
        open_status: None,
        search_done: false,
        found: Vec::new(),
        write_status: None,
    });
    static SIGNAL: Condvar = Condvar::new();

    fn shared() -> Result<MutexGuard<'static, Shared>, RelayError> {
        SHARED.lock().map_err(|_| RelayError::ConnectFailed)
    }

    /// Block until `ready` yields a value or `timeout_ms` elapses.
    fn wait_for<T>(timeout_ms: u64, mut ready: impl FnMut(&mut Shared) -> Option<T>) -> Option<T> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let mut guard = SHARED.lock().ok()?;
        loop {
            if let Some(v) = ready(&mut guard) {
                return Some(v);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            guard = SIGNAL.wait_timeout(guard, deadline - now).ok()?.0;
        }
    }

    fn update(f: impl FnOnce(&mut Shared)) {
        if let Ok(mut s) = SHARED.lock() {
            f(&mut s);
        }
        SIGNAL.notify_all();
    }

    fn uuid_from_esp(u: &esp_bt_uuid_t) -> BleUuid {
        // SAFETY: `len` selects the active union member.
        unsafe {
            match u.len {
                2 => BleUuid::from_u16(u.uuid.uuid16),
                4 => BleUuid::from_u32(u.uuid.uuid32),
                _ => BleUuid::from_u128(u128::from_le_bytes(u.uuid.uuid128)),
            }
        }
    }

    fn record_scan_result(r: &esp_ble_gap_cb_param_t_ble_scan_result_evt_param) {
        let len = (r.adv_data_len as usize + r.scan_rsp_len as usize).min(r.ble_adv.len());
        let ad = AdvertisementFields::parse(&r.ble_adv[..len]);
        let address = BleAddress {
            bytes: r.bda,
            random: r.ble_addr_type == esp_ble_addr_type_t_BLE_ADDR_TYPE_RANDOM,
        };

        update(|s| {
            if let Some(dev) = s.scan_results.iter_mut().find(|d| d.address == address) {
                // Scan response arrives as a second result for the same address.
                if dev.name.is_none() {
                    dev.name = ad.name;
                }
                for svc in ad.services {
                    if !dev.services.contains(&svc) {
                        dev.services.push(svc);
                    }
                }
                dev.rssi = r.rssi as i8;
            } else {
                s.scan_results.push(AdvertisedDevice {
                    address,
                    name: ad.name,
                    rssi: r.rssi as i8,
                    services: ad.services,
                });
            }
        });
    }

    unsafe extern "C" fn gap_event_handler(event: esp_gap_ble_cb_event_t, param: *mut esp_ble_gap_cb_param_t) {
        match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_PARAM_SET_COMPLETE_EVT => {
                update(|s| s.scan_params_set = true);
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RESULT_EVT => {
                // SAFETY: Bluedroid passes a valid param for this event.
                let r = unsafe { &(*param).scan_rst };
                if r.search_evt == esp_gap_search_evt_t_ESP_GAP_SEARCH_INQ_RES_EVT {
                    record_scan_result(r);
                } else if r.search_evt == esp_gap_search_evt_t_ESP_GAP_SEARCH_INQ_CMPL_EVT {
                    update(|s| s.scanning = false);
                }
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_STOP_COMPLETE_EVT => {
                update(|s| s.scanning = false);
            }
            _ => {}
        }
    }

    unsafe extern "C" fn gattc_event_handler(
        event: esp_gattc_cb_event_t,
        gattc_if: esp_gatt_if_t,
        param: *mut esp_ble_gattc_cb_param_t,
    ) {
        match event {
            esp_gattc_cb_event_t_ESP_GATTC_REG_EVT => {
                info!("BLE GATTC: app registered (if={})", gattc_if);
                update(|s| s.gattc_if = Some(gattc_if));
            }
            esp_gattc_cb_event_t_ESP_GATTC_OPEN_EVT => {
                // SAFETY: Bluedroid passes a valid param for this event.
                let p = unsafe { &(*param).open };
                let ok = p.status == esp_gatt_status_t_ESP_GATT_OK;
                if !ok {
                    warn!("BLE GATTC: open failed (status={})", p.status);
                }
                update(|s| {
                    s.conn_id = ok.then_some(p.conn_id);
                    s.open_status = Some(ok);
                });
            }
            esp_gattc_cb_event_t_ESP_GATTC_SEARCH_RES_EVT => {
                // SAFETY: as above.
                let p = unsafe { &(*param).search_res };
                let uuid = uuid_from_esp(&p.srvc_id.uuid);
                update(|s| s.found.push((uuid, p.start_handle, p.end_handle)));
            }
            esp_gattc_cb_event_t_ESP_GATTC_SEARCH_CMPL_EVT => {
                update(|s| s.search_done = true);
            }
            esp_gattc_cb_event_t_ESP_GATTC_WRITE_CHAR_EVT => {
                // SAFETY: as above.
                let p = unsafe { &(*param).write };
                let ok = p.status == esp_gatt_status_t_ESP_GATT_OK;
                update(|s| s.write_status = Some(ok));
            }
            esp_gattc_cb_event_t_ESP_GATTC_DISCONNECT_EVT | esp_gattc_cb_event_t_ESP_GATTC_CLOSE_EVT => {
                info!("BLE GATTC: link closed");
                update(|s| {
                    s.conn_id = None;
                    if s.open_status.is_none() {
                        s.open_status = Some(false);
                    }
                });
            }
            _ => {}
        }
    }

    /// Bluedroid-backed central. Only one instance may exist.
    pub struct EspBleCentral {
        /// (service, characteristic, handle) of the connected peer.
        handles: Vec<(BleUuid, BleUuid, u16)>,
    }

    impl EspBleCentral {
        pub fn new() -> anyhow::Result<Self> {
            // SAFETY: one-time stack bring-up from the main task.
            unsafe {
                esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

                let mut bt_cfg = esp_bt_controller_config_t::default();
                let ret = esp_bt_controller_init(&mut bt_cfg);
                if ret != ESP_OK as i32 {
                    anyhow::bail!("bt_controller_init failed ({})", ret);
                }
                let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
                if ret != ESP_OK as i32 {
                    anyhow::bail!("bt_controller_enable failed ({})", ret);
                }
                let ret = esp_bluedroid_init();
                if ret != ESP_OK as i32 {
                    anyhow::bail!("bluedroid_init failed ({})", ret);
                }
                let ret = esp_bluedroid_enable();
                if ret != ESP_OK as i32 {
                    anyhow::bail!("bluedroid_enable failed ({})", ret);
                }

                esp_ble_gap_register_callback(Some(gap_event_handler));
                esp_ble_gattc_register_callback(Some(gattc_event_handler));
                let ret = esp_ble_gattc_app_register(APP_ID);
                if ret != ESP_OK as i32 {
                    anyhow::bail!("gattc_app_register failed ({})", ret);
                }
            }

            if wait_for(GATT_TIMEOUT_MS, |s| s.gattc_if).is_none() {
                anyhow::bail!("GATTC registration timed out");
            }
            info!("BLE(espidf): Bluedroid central ready");
            Ok(Self { handles: Vec::new() })
        }

        fn link(&self) -> Result<(esp_gatt_if_t, u16), RelayError> {
            let s = shared()?;
            match (s.gattc_if, s.conn_id) {
                (Some(gif), Some(conn)) => Ok((gif, conn)),
                _ => Err(RelayError::NotConnected),
            }
        }

        fn characteristics(
            gattc_if: esp_gatt_if_t,
            conn_id: u16,
            start: u16,
            end: u16,
        ) -> Vec<esp_gattc_char_elem_t> {
            let mut count: u16 = 0;
            // SAFETY: `count` outlives the call.
            let ret = unsafe {
                esp_ble_gattc_get_attr_count(
                    gattc_if,
                    conn_id,
                    esp_gatt_db_attr_type_t_ESP_GATT_DB_CHARACTERISTIC,
                    start,
                    end,
                    0,
                    &mut count,
                )
            };
            if ret != esp_gatt_status_t_ESP_GATT_OK || count == 0 {
                return Vec::new();
            }

            // SAFETY: plain C struct; all-zero is a valid value.
            let mut elems = vec![unsafe { core::mem::zeroed::<esp_gattc_char_elem_t>() }; count as usize];
            // SAFETY: `elems` has room for `count` entries.
            let ret = unsafe {
                esp_ble_gattc_get_all_char(gattc_if, conn_id, start, end, elems.as_mut_ptr(), &mut count, 0)
            };
            if ret != esp_gatt_status_t_ESP_GATT_OK {
                warn!("BLE GATTC: get_all_char failed ({})", ret);
                return Vec::new();
            }
            elems.truncate(count as usize);
            elems
        }
    }

    impl BleCentralPort for EspBleCentral {
        fn scan(&mut self, duration_ms: u32) -> Result<Vec<AdvertisedDevice>, RelayError> {
            update(|s| {
                s.scan_results.clear();
                s.scan_params_set = false;
                s.scanning = true;
            });

            let mut params = esp_ble_scan_params_t {
                scan_type: esp_ble_scan_type_t_BLE_SCAN_TYPE_ACTIVE,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                scan_filter_policy: esp_ble_scan_filter_t_BLE_SCAN_FILTER_ALLOW_ALL,
                scan_interval: SCAN_INTERVAL,
                scan_window: SCAN_WINDOW,
                scan_duplicate: esp_ble_scan_duplicate_t_BLE_SCAN_DUPLICATE_DISABLE,
            };
            // SAFETY: `params` is copied by the stack before the call returns.
            let ret = unsafe { esp_ble_gap_set_scan_params(&mut params) };
            if ret != ESP_OK as i32 {
                error!("BLE GAP: set_scan_params failed ({})", ret);
                return Err(RelayError::TargetNotFound);
            }
            if wait_for(GATT_TIMEOUT_MS, |s| s.scan_params_set.then_some(())).is_none() {
                return Err(RelayError::TargetNotFound);
            }

            let seconds = duration_ms.div_ceil(1000);
            // SAFETY: plain FFI call.
            let ret = unsafe { esp_ble_gap_start_scanning(seconds) };
            if ret != ESP_OK as i32 {
                error!("BLE GAP: start_scanning failed ({})", ret);
                return Err(RelayError::TargetNotFound);
            }

            let done = wait_for(duration_ms as u64 + GATT_TIMEOUT_MS, |s| (!s.scanning).then_some(()));
            if done.is_none() {
                // SAFETY: plain FFI call.
                unsafe { esp_ble_gap_stop_scanning() };
            }
            Ok(core::mem::take(&mut shared()?.scan_results))
        }

        fn connect(&mut self, address: &BleAddress) -> Result<(), RelayError> {
            let gattc_if = shared()?.gattc_if.ok_or(RelayError::ConnectFailed)?;
            update(|s| s.open_status = None);

            let mut bda = address.bytes;
            let addr_type = if address.random {
                esp_ble_addr_type_t_BLE_ADDR_TYPE_RANDOM
            } else {
                esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC
            };
            // SAFETY: `bda` is copied by the stack before the call returns.
            let ret = unsafe { esp_ble_gattc_open(gattc_if, bda.as_mut_ptr(), addr_type, true) };
            if ret != ESP_OK as i32 {
                warn!("BLE GATTC: open request failed ({})", ret);
                return Err(RelayError::ConnectFailed);
            }

            match wait_for(OPEN_TIMEOUT_MS, |s| s.open_status) {
                Some(true) => {
                    self.handles.clear();
                    Ok(())
                }
                _ => Err(RelayError::ConnectFailed),
            }
        }

        fn disconnect(&mut self) {
            if let Ok((gattc_if, conn_id)) = self.link() {
                // SAFETY: plain FFI call.
                unsafe { esp_ble_gattc_close(gattc_if, conn_id) };
            }
            self.handles.clear();
            update(|s| s.conn_id = None);
        }

        fn is_connected(&self) -> bool {
            SHARED.lock().map(|s| s.conn_id.is_some()).unwrap_or(false)
        }

        fn services(&mut self) -> Result<Vec<RemoteService>, RelayError> {
            let (gattc_if, conn_id) = self.link()?;
            update(|s| {
                s.found.clear();
                s.search_done = false;
            });

            // SAFETY: null filter searches every service.
            let ret = unsafe { esp_ble_gattc_search_service(gattc_if, conn_id, core::ptr::null_mut()) };
            if ret != ESP_OK as i32 {
                return Err(RelayError::ServiceNotFound);
            }
            if wait_for(GATT_TIMEOUT_MS, |s| s.search_done.then_some(())).is_none() {
                return Err(RelayError::ServiceNotFound);
            }
            let found = core::mem::take(&mut shared()?.found);

            self.handles.clear();
            let mut services = Vec::with_capacity(found.len());
            for (svc_uuid, start, end) in found {
                let characteristics = Self::characteristics(gattc_if, conn_id, start, end)
                    .iter()
                    .map(|e| {
                        let uuid = uuid_from_esp(&e.uuid);
                        self.handles.push((svc_uuid, uuid, e.char_handle));
                        RemoteCharacteristic {
                            uuid,
                            props: CharProps::from_bits(e.properties as u8),
                        }
                    })
                    .collect();
                services.push(RemoteService {
                    uuid: svc_uuid,
                    characteristics,
                });
            }
            Ok(services)
        }

        fn write(
            &mut self,
            service: BleUuid,
            characteristic: BleUuid,
            data: &[u8],
            with_response: bool,
        ) -> Result<(), RelayError> {
            let (gattc_if, conn_id) = self.link()?;
            let handle = self
                .handles
                .iter()
                .find(|(s, c, _)| *s == service && *c == characteristic)
                .map(|(_, _, h)| *h)
                .ok_or(RelayError::NotConnected)?;

            update(|s| s.write_status = None);
            let write_type = if with_response {
                esp_gatt_write_type_t_ESP_GATT_WRITE_TYPE_RSP
            } else {
                esp_gatt_write_type_t_ESP_GATT_WRITE_TYPE_NO_RSP
            };
            let mut buf = data.to_vec();
            // SAFETY: `buf` is copied by the stack before the call returns.
            let ret = unsafe {
                esp_ble_gattc_write_char(
                    gattc_if,
                    conn_id,
                    handle,
                    buf.len() as u16,
                    buf.as_mut_ptr(),
                    write_type,
                    esp_gatt_auth_req_t_ESP_GATT_AUTH_REQ_NONE,
                )
            };
            if ret != ESP_OK as i32 {
                return Err(RelayError::WriteFailed);
            }
            if !with_response {
                return Ok(());
            }
            match wait_for(GATT_TIMEOUT_MS, |s| s.write_status) {
                Some(true) => Ok(()),
                _ => Err(RelayError::WriteFailed),
            }
        }
    }
}
