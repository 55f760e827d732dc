//! Wi-Fi access-point adapter for the BLE relay.
//!
//! The relay never joins a network; it hosts its own AP so a phone can
//! reach the config page directly.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi` in AP mode.
//! - **all other targets**: settings validation only.

use core::fmt;

#[cfg(target_os = "espidf")]
use log::info;

pub const DEFAULT_AP_SSID: &str = "ESP32_Config";

const MAX_SSID_LEN: usize = 32;
const MIN_WPA2_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApError {
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for ApError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
        }
    }
}

impl std::error::Error for ApError {}

/// Validated AP credentials. An empty password means an open network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPointSettings {
    ssid: heapless::String<MAX_SSID_LEN>,
    password: heapless::String<MAX_PASSWORD_LEN>,
    channel: u8,
}

impl AccessPointSettings {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ApError> {
        if ssid.is_empty() || !ssid.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
            return Err(ApError::InvalidSsid);
        }
        if !password.is_empty() && !(MIN_WPA2_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password.len()) {
            return Err(ApError::InvalidPassword);
        }
        Ok(Self {
            ssid: heapless::String::try_from(ssid).map_err(|_| ApError::InvalidSsid)?,
            password: heapless::String::try_from(password).map_err(|_| ApError::InvalidPassword)?,
            channel: 1,
        })
    }

    /// The relay's open `ESP32_Config` network.
    pub fn open_default() -> Self {
        let mut ssid = heapless::String::new();
        let _ = ssid.push_str(DEFAULT_AP_SSID);
        Self {
            ssid,
            password: heapless::String::new(),
            channel: 1,
        }
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

/// Bring the AP up and wait for its netif.
#[cfg(target_os = "espidf")]
pub fn start_access_point(
    modem: esp_idf_svc::hal::modem::Modem,
    sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
    nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
    settings: &AccessPointSettings,
) -> anyhow::Result<esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>> {
    use anyhow::anyhow;
    use esp_idf_svc::wifi::{AccessPointConfiguration, AuthMethod, BlockingWifi, Configuration, EspWifi};

    let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
    let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

    wifi.set_configuration(&Configuration::AccessPoint(AccessPointConfiguration {
        ssid: settings
            .ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("AP SSID too long"))?,
        password: settings
            .password
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("AP password too long"))?,
        auth_method: if settings.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        channel: settings.channel,
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.wait_netif_up()?;

    let ip = wifi.wifi().ap_netif().get_ip_info()?.ip;
    info!("[WiFi] AP started: {}", settings.ssid);
    info!("[WiFi] AP IP: {}", ip);
    Ok(wifi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_open() {
        let s = AccessPointSettings::open_default();
        assert_eq!(s.ssid(), "ESP32_Config");
        assert!(s.is_open());
    }

    #[test]
    fn rejects_empty_or_long_ssid() {
        assert_eq!(AccessPointSettings::new("", ""), Err(ApError::InvalidSsid));
        assert_eq!(AccessPointSettings::new(&"s".repeat(33), ""), Err(ApError::InvalidSsid));
        assert_eq!(AccessPointSettings::new("tab\there", ""), Err(ApError::InvalidSsid));
    }

    #[test]
    fn rejects_short_password() {
        assert_eq!(AccessPointSettings::new("relay", "short"), Err(ApError::InvalidPassword));
    }

    #[test]
    fn accepts_wpa2() {
        let s = AccessPointSettings::new("relay", "longenough").unwrap();
        assert!(!s.is_open());
    }
}
