//! Relay target configuration and its persisted preferences.
//!
//! Three values select the peripheral the relay drives: its advertising
//! name, the service UUID and the writable characteristic UUID. They live
//! in the `cfg` storage namespace under `bleName`, `svcUUID` and `chrUUID`;
//! a missing or unreadable key falls back to its default.

use core::fmt;
use core::str::FromStr;

use log::{info, warn};

use crate::app::ports::{StorageError, StoragePort};
use crate::error::RelayError;

pub const PREFS_NAMESPACE: &str = "cfg";
pub const KEY_BLE_NAME: &str = "bleName";
pub const KEY_SVC_UUID: &str = "svcUUID";
pub const KEY_CHR_UUID: &str = "chrUUID";

pub const DEFAULT_TARGET_NAME: &str = "nRF5340DK";
pub const DEFAULT_SERVICE_UUID: BleUuid = BleUuid::from_u16(0xffff);
pub const DEFAULT_CHAR_UUID: BleUuid = BleUuid::from_u16(0xff01);

/// Longest advertising name accepted (bytes).
pub const NAME_CAPACITY: usize = 32;

// ───────────────────────────────────────────────────────────────
// BleUuid
// ───────────────────────────────────────────────────────────────

/// Bluetooth SIG base UUID `00000000-0000-1000-8000-00805f9b34fb`.
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;
const BASE_MASK: u128 = (1 << 96) - 1;

/// A GATT UUID, always held in its 128-bit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BleUuid(u128);

impl BleUuid {
    pub const fn from_u128(v: u128) -> Self {
        Self(v)
    }

    /// Expand a 16-bit SIG-assigned UUID onto the base UUID.
    pub const fn from_u16(v: u16) -> Self {
        Self(((v as u128) << 96) | BASE_UUID)
    }

    pub const fn from_u32(v: u32) -> Self {
        Self(((v as u128) << 96) | BASE_UUID)
    }

    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// The 16-bit form, if this UUID is one.
    pub fn as_u16(self) -> Option<u16> {
        let short = self.0 >> 96;
        if self.0 & BASE_MASK == BASE_UUID & BASE_MASK && short <= 0xffff {
            Some(short as u16)
        } else {
            None
        }
    }
}

impl FromStr for BleUuid {
    type Err = RelayError;

    /// Accepts `xxxx`, `0xxxxx`, `xxxxxxxx`, 32 bare hex digits, or the
    /// hyphenated 8-4-4-4-12 form. Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        let hyphenated = s.len() == 36;
        if hyphenated {
            let dashes_ok = s
                .char_indices()
                .all(|(i, c)| matches!(i, 8 | 13 | 18 | 23) == (c == '-'));
            if !dashes_ok {
                return Err(RelayError::InvalidUuid);
            }
        }

        let mut digits: heapless::String<32> = heapless::String::new();
        for c in s.chars().filter(|&c| c != '-' || !hyphenated) {
            if !c.is_ascii_hexdigit() {
                return Err(RelayError::InvalidUuid);
            }
            digits.push(c).map_err(|_| RelayError::InvalidUuid)?;
        }

        let parse = |d: &str| u128::from_str_radix(d, 16).map_err(|_| RelayError::InvalidUuid);
        match digits.len() {
            4 => Ok(Self::from_u16(parse(&digits)? as u16)),
            8 => Ok(Self::from_u32(parse(&digits)? as u32)),
            32 => Ok(Self(parse(&digits)?)),
            _ => Err(RelayError::InvalidUuid),
        }
    }
}

impl fmt::Display for BleUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xffff_ffff_ffff,
        )
    }
}

// ───────────────────────────────────────────────────────────────
// RelayConfig
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    target_name: heapless::String<NAME_CAPACITY>,
    service: BleUuid,
    characteristic: BleUuid,
}

fn check_name(name: &str) -> Result<heapless::String<NAME_CAPACITY>, RelayError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RelayError::MissingField(KEY_BLE_NAME));
    }
    if !name.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        return Err(RelayError::InvalidName);
    }
    heapless::String::try_from(name).map_err(|_| RelayError::FieldTooLong(KEY_BLE_NAME))
}

fn check_uuid(raw: &str, field: &'static str) -> Result<BleUuid, RelayError> {
    if raw.trim().is_empty() {
        return Err(RelayError::MissingField(field));
    }
    raw.parse()
}

impl RelayConfig {
    /// Validate the three form values. Empty values are `MissingField`.
    pub fn new(target_name: &str, service: &str, characteristic: &str) -> Result<Self, RelayError> {
        Ok(Self {
            target_name: check_name(target_name)?,
            service: check_uuid(service, KEY_SVC_UUID)?,
            characteristic: check_uuid(characteristic, KEY_CHR_UUID)?,
        })
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn service(&self) -> BleUuid {
        self.service
    }

    pub fn characteristic(&self) -> BleUuid {
        self.characteristic
    }

    /// Read each key independently; any missing or invalid key keeps its
    /// default.
    pub fn load(storage: &impl StoragePort) -> Self {
        let mut cfg = Self::default();
        let mut buf = [0u8; STORED_VALUE_MAX];

        if let Some(raw) = read_str(storage, KEY_BLE_NAME, &mut buf) {
            match check_name(raw) {
                Ok(name) => cfg.target_name = name,
                Err(e) => warn!("[CFG] stored {} ignored ({})", KEY_BLE_NAME, e),
            }
        }
        if let Some(raw) = read_str(storage, KEY_SVC_UUID, &mut buf) {
            match check_uuid(raw, KEY_SVC_UUID) {
                Ok(u) => cfg.service = u,
                Err(e) => warn!("[CFG] stored {} ignored ({})", KEY_SVC_UUID, e),
            }
        }
        if let Some(raw) = read_str(storage, KEY_CHR_UUID, &mut buf) {
            match check_uuid(raw, KEY_CHR_UUID) {
                Ok(u) => cfg.characteristic = u,
                Err(e) => warn!("[CFG] stored {} ignored ({})", KEY_CHR_UUID, e),
            }
        }

        info!("[CFG] Target: {}", cfg.target_name);
        info!("[CFG] Service: {}", cfg.service);
        info!("[CFG] Char   : {}", cfg.characteristic);
        cfg
    }

    /// Write all three keys. When a write fails the keys already written
    /// get their previous values back, so storage never mixes two configs.
    pub fn save(&self, storage: &mut impl StoragePort) -> Result<(), StorageError> {
        let service = uuid_text(self.service)?;
        let characteristic = uuid_text(self.characteristic)?;
        let entries: [(&str, &[u8]); 3] = [
            (KEY_BLE_NAME, self.target_name.as_bytes()),
            (KEY_SVC_UUID, service.as_bytes()),
            (KEY_CHR_UUID, characteristic.as_bytes()),
        ];

        let mut previous: [Option<StoredValue>; 3] = Default::default();
        for (slot, (key, _)) in previous.iter_mut().zip(&entries) {
            *slot = snapshot(storage, key);
        }

        for (i, (key, value)) in entries.iter().enumerate() {
            if let Err(e) = storage.write(PREFS_NAMESPACE, key, value) {
                warn!("[CFG] write {} failed ({}), restoring previous values", key, e);
                for ((key, _), old) in entries[..i].iter().zip(&previous) {
                    let restored = match old {
                        Some(v) => storage.write(PREFS_NAMESPACE, key, v),
                        None => storage.delete(PREFS_NAMESPACE, key),
                    };
                    if let Err(re) = restored {
                        warn!("[CFG] restore {} failed ({})", key, re);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

const STORED_VALUE_MAX: usize = 64;
type StoredValue = heapless::Vec<u8, STORED_VALUE_MAX>;

fn uuid_text(uuid: BleUuid) -> Result<heapless::String<36>, StorageError> {
    let mut out = heapless::String::new();
    fmt::write(&mut out, format_args!("{}", uuid)).map_err(|_| StorageError::IoError)?;
    Ok(out)
}

fn snapshot(storage: &impl StoragePort, key: &str) -> Option<StoredValue> {
    let mut buf = [0u8; STORED_VALUE_MAX];
    let len = storage.read(PREFS_NAMESPACE, key, &mut buf).ok()?;
    heapless::Vec::from_slice(&buf[..len]).ok()
}

fn read_str<'b>(storage: &impl StoragePort, key: &str, buf: &'b mut [u8]) -> Option<&'b str> {
    match storage.read(PREFS_NAMESPACE, key, buf) {
        Ok(len) => core::str::from_utf8(&buf[..len]).ok(),
        Err(StorageError::NotFound) => None,
        Err(e) => {
            warn!("[CFG] read {} failed ({})", key, e);
            None
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        let mut target_name = heapless::String::new();
        // Fits: the default is well under NAME_CAPACITY.
        let _ = target_name.push_str(DEFAULT_TARGET_NAME);
        Self {
            target_name,
            service: DEFAULT_SERVICE_UUID,
            characteristic: DEFAULT_CHAR_UUID,
        }
    }
}
