//! One-byte LED commands written to the peripheral's characteristic.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    On,
    Off,
    Toggle,
}

impl LedCommand {
    /// Byte written to the characteristic.
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::On => b'1',
            Self::Off => b'0',
            Self::Toggle => b'T',
        }
    }

    /// Parse the `state` parameter of `/led`.
    pub fn from_state(state: &str) -> Option<Self> {
        match state {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "toggle" => Some(Self::Toggle),
            _ => None,
        }
    }

    /// Serial console accepts the wire bytes themselves.
    pub fn from_serial_byte(b: u8) -> Option<Self> {
        match b {
            b'1' => Some(Self::On),
            b'0' => Some(Self::Off),
            b'T' => Some(Self::Toggle),
            _ => None,
        }
    }
}

impl fmt::Display for LedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
            Self::Toggle => write!(f, "toggle"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_map_to_bytes() {
        assert_eq!(LedCommand::from_state("on").map(LedCommand::as_byte), Some(b'1'));
        assert_eq!(LedCommand::from_state("off").map(LedCommand::as_byte), Some(b'0'));
        assert_eq!(LedCommand::from_state("toggle").map(LedCommand::as_byte), Some(b'T'));
    }

    #[test]
    fn state_is_case_sensitive() {
        assert_eq!(LedCommand::from_state("ON"), None);
        assert_eq!(LedCommand::from_state(""), None);
    }

    #[test]
    fn serial_accepts_only_wire_bytes() {
        for cmd in [LedCommand::On, LedCommand::Off, LedCommand::Toggle] {
            assert_eq!(LedCommand::from_serial_byte(cmd.as_byte()), Some(cmd));
        }
        assert_eq!(LedCommand::from_serial_byte(b't'), None);
        assert_eq!(LedCommand::from_serial_byte(b'\n'), None);
    }
}
