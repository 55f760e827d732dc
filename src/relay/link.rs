//! BLE central link to the relay's target peripheral.
//!
//! [`RelayLink`] owns a [`BleCentralPort`] and keeps it pointed at the
//! configured peripheral: scan, connect, pick the characteristic, write
//! one-byte commands. The port is the hexagonal boundary: Bluedroid GATTC
//! on the device, a scripted central in tests.

use core::fmt;

use log::{info, warn};

use super::command::LedCommand;
use super::config::{BleUuid, RelayConfig};
use crate::error::RelayError;

/// Active scan window per connection attempt.
pub const SCAN_DURATION_MS: u32 = 7_000;
/// Minimum spacing between connection attempts while disconnected.
pub const RECONNECT_INTERVAL_MS: u32 = 5_000;

// ───────────────────────────────────────────────────────────────
// Peer description types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BleAddress {
    pub bytes: [u8; 6],
    /// Random (vs public) address type, needed again at connect time.
    pub random: bool,
}

impl fmt::Display for BleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvertisedDevice {
    pub address: BleAddress,
    pub name: Option<String>,
    pub rssi: i8,
    pub services: Vec<BleUuid>,
}

impl AdvertisedDevice {
    fn matches(&self, config: &RelayConfig) -> bool {
        let name_hit = self
            .name
            .as_deref()
            .is_some_and(|n| !n.is_empty() && n.eq_ignore_ascii_case(config.target_name()));
        name_hit || self.services.contains(&config.service())
    }
}

/// GATT characteristic property bits the relay cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharProps {
    pub read: bool,
    pub write: bool,
    pub write_no_response: bool,
    pub notify: bool,
    pub indicate: bool,
}

impl CharProps {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            read: bits & 0x02 != 0,
            write_no_response: bits & 0x04 != 0,
            write: bits & 0x08 != 0,
            notify: bits & 0x10 != 0,
            indicate: bits & 0x20 != 0,
        }
    }

    pub fn writable(self) -> bool {
        self.write || self.write_no_response
    }
}

impl fmt::Display for CharProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (set, tag) in [
            (self.read, "R"),
            (self.write, "W"),
            (self.write_no_response, "WN"),
            (self.notify, "N"),
            (self.indicate, "I"),
        ] {
            if set {
                f.write_str(tag)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteCharacteristic {
    pub uuid: BleUuid,
    pub props: CharProps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteService {
    pub uuid: BleUuid,
    pub characteristics: Vec<RemoteCharacteristic>,
}

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

/// A BLE central able to reach one peripheral at a time.
pub trait BleCentralPort {
    /// Active scan for `duration_ms`; returns every device seen.
    fn scan(&mut self, duration_ms: u32) -> Result<Vec<AdvertisedDevice>, RelayError>;
    fn connect(&mut self, address: &BleAddress) -> Result<(), RelayError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    /// Full service/characteristic table of the connected peer.
    fn services(&mut self) -> Result<Vec<RemoteService>, RelayError>;
    fn write(
        &mut self,
        service: BleUuid,
        characteristic: BleUuid,
        data: &[u8],
        with_response: bool,
    ) -> Result<(), RelayError>;
}

// ───────────────────────────────────────────────────────────────
// RelayLink
// ───────────────────────────────────────────────────────────────

pub struct RelayLink<C> {
    central: C,
    config: RelayConfig,
    selected: Option<RemoteCharacteristic>,
    last_attempt_ms: Option<u32>,
}

impl<C: BleCentralPort> RelayLink<C> {
    pub fn new(central: C, config: RelayConfig) -> Self {
        Self {
            central,
            config,
            selected: None,
            last_attempt_ms: None,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn central(&self) -> &C {
        &self.central
    }

    pub fn central_mut(&mut self) -> &mut C {
        &mut self.central
    }

    /// Characteristic commands are written to, if one is selected.
    pub fn selected(&self) -> Option<RemoteCharacteristic> {
        self.selected
    }

    /// Connected with a writable characteristic selected.
    pub fn is_ready(&self) -> bool {
        self.central.is_connected() && self.selected.is_some()
    }

    /// Reconnect pacing. Call often; attempts are at least
    /// [`RECONNECT_INTERVAL_MS`] apart, the first one immediate.
    pub fn ensure_connected(&mut self, now_ms: u32) -> bool {
        if self.central.is_connected() {
            return true;
        }
        self.selected = None;

        if let Some(last) = self.last_attempt_ms {
            if now_ms.wrapping_sub(last) < RECONNECT_INTERVAL_MS {
                return false;
            }
        }
        self.last_attempt_ms = Some(now_ms);

        match self.connect_to_target() {
            Ok(()) => true,
            Err(e) => {
                warn!("[BLE] connect attempt failed: {}", e);
                false
            }
        }
    }

    /// Scan, connect and select the characteristic.
    pub fn connect_to_target(&mut self) -> Result<(), RelayError> {
        if self.is_ready() {
            return Ok(());
        }

        info!(
            "[BLE] Scanning for: name='{}' or service={}",
            self.config.target_name(),
            self.config.service()
        );
        let devices = self.central.scan(SCAN_DURATION_MS)?;
        info!("[BLE] Scan done, {} device(s)", devices.len());

        let candidate = devices
            .iter()
            .inspect(|d| {
                log::debug!(
                    "[BLE] Dev: {} RSSI={} Name='{}'",
                    d.address,
                    d.rssi,
                    d.name.as_deref().unwrap_or("")
                )
            })
            .find(|d| d.matches(&self.config))
            .ok_or(RelayError::TargetNotFound)?;

        info!("[BLE] Connecting to {} ...", candidate.address);
        self.central.connect(&candidate.address)?;

        match self.select_characteristic() {
            Ok(chr) => {
                info!("[BLE] Using characteristic {} (props: {})", chr.uuid, chr.props);
                self.selected = Some(chr);
                Ok(())
            }
            Err(e) => {
                self.central.disconnect();
                self.selected = None;
                Err(e)
            }
        }
    }

    fn select_characteristic(&mut self) -> Result<RemoteCharacteristic, RelayError> {
        let services = self.central.services()?;
        let service = services
            .iter()
            .find(|s| s.uuid == self.config.service())
            .ok_or(RelayError::ServiceNotFound)?;

        let chr = match service
            .characteristics
            .iter()
            .find(|c| c.uuid == self.config.characteristic())
        {
            Some(c) => *c,
            None => {
                info!("[BLE] Configured characteristic not found, picking a writable one");
                *service
                    .characteristics
                    .iter()
                    .find(|c| c.props.writable())
                    .ok_or(RelayError::NoWritableCharacteristic)?
            }
        };

        if !chr.props.writable() {
            return Err(RelayError::NoWritableCharacteristic);
        }
        Ok(chr)
    }

    /// Write one command byte. Prefers write-without-response.
    pub fn write_command(&mut self, cmd: LedCommand) -> Result<(), RelayError> {
        if !self.central.is_connected() {
            self.selected = None;
        }
        let chr = self.selected.ok_or(RelayError::NotConnected)?;
        let with_response = !chr.props.write_no_response;

        let result = self
            .central
            .write(self.config.service(), chr.uuid, &[cmd.as_byte()], with_response);
        info!(
            "[BLE] Write '{}' -> {}",
            cmd.as_byte() as char,
            if result.is_ok() { "OK" } else { "FAIL" }
        );
        result
    }

    /// Human-readable service table of the connected peer.
    pub fn discover(&mut self) -> Vec<String> {
        if !self.central.is_connected() {
            return Vec::new();
        }
        let services = match self.central.services() {
            Ok(s) => s,
            Err(e) => {
                warn!("[BLE] discover failed: {}", e);
                return Vec::new();
            }
        };

        let mut lines = Vec::new();
        for svc in &services {
            lines.push(format!("SVC {}", svc.uuid));
            for chr in &svc.characteristics {
                lines.push(format!("  CHR {} props:{}", chr.uuid, chr.props));
            }
        }
        lines
    }

    /// Swap in a new target. The next [`ensure_connected`](Self::ensure_connected)
    /// attempts immediately.
    pub fn reconfigure(&mut self, config: RelayConfig) {
        if self.central.is_connected() {
            self.central.disconnect();
        }
        self.selected = None;
        self.last_attempt_ms = None;
        self.config = config;
        info!("[BLE] Target reconfigured to '{}'", self.config.target_name());
    }
}

// ───────────────────────────────────────────────────────────────
// Advertising data
// ───────────────────────────────────────────────────────────────

const AD_UUID16_INCOMPLETE: u8 = 0x02;
const AD_UUID16_COMPLETE: u8 = 0x03;
const AD_UUID32_INCOMPLETE: u8 = 0x04;
const AD_UUID32_COMPLETE: u8 = 0x05;
const AD_UUID128_INCOMPLETE: u8 = 0x06;
const AD_UUID128_COMPLETE: u8 = 0x07;
const AD_NAME_SHORT: u8 = 0x08;
const AD_NAME_COMPLETE: u8 = 0x09;

/// Name and service UUIDs pulled out of raw advertising/scan-response data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisementFields {
    pub name: Option<String>,
    pub services: Vec<BleUuid>,
}

impl AdvertisementFields {
    /// Walk the length-type-value AD structures. A truncated trailing
    /// structure ends the walk; earlier fields are kept.
    pub fn parse(data: &[u8]) -> Self {
        let mut out = Self::default();
        let mut rest = data;

        while let Some((&len, tail)) = rest.split_first() {
            let len = len as usize;
            if len == 0 || len > tail.len() {
                break;
            }
            let (field, next) = tail.split_at(len);
            rest = next;
            let (ad_type, value) = (field[0], &field[1..]);

            match ad_type {
                AD_UUID16_INCOMPLETE | AD_UUID16_COMPLETE => out.services.extend(
                    value
                        .chunks_exact(2)
                        .map(|c| BleUuid::from_u16(u16::from_le_bytes([c[0], c[1]]))),
                ),
                AD_UUID32_INCOMPLETE | AD_UUID32_COMPLETE => out.services.extend(
                    value
                        .chunks_exact(4)
                        .map(|c| BleUuid::from_u32(u32::from_le_bytes([c[0], c[1], c[2], c[3]]))),
                ),
                AD_UUID128_INCOMPLETE | AD_UUID128_COMPLETE => {
                    out.services.extend(value.chunks_exact(16).map(|c| {
                        let mut le = [0u8; 16];
                        le.copy_from_slice(c);
                        BleUuid::from_u128(u128::from_le_bytes(le))
                    }))
                }
                AD_NAME_COMPLETE => out.name = Some(String::from_utf8_lossy(value).into_owned()),
                AD_NAME_SHORT if out.name.is_none() => {
                    out.name = Some(String::from_utf8_lossy(value).into_owned())
                }
                _ => {}
            }
        }
        out
    }
}
