//! The configuration record — the sole mutable source of truth.
//!
//! Every string field is a fixed-capacity [`heapless::String`]; assignment
//! goes through [`bounded`], which truncates at the capacity so a field can
//! never overflow its slot.  Field capacities and default values mirror the
//! persisted on-disk schema (see [`crate::config_store`]).
//!
//! The record is constructed with hard-coded defaults at first boot or on
//! load failure, loaded once at startup, mutated by the shell/dashboard
//! command paths or by migration, and persisted whenever its content hash
//! changes.  It is never destroyed except by process restart.

use heapless::String;
use serde::{Deserialize, Serialize};

/// Current on-disk schema version.  Version 0 predates secret-field
/// encryption and stores passwords in plaintext.
pub const CFG_VERSION: u32 = 1;

/// Capacity of long string fields (ssid, passwords, hostnames, servers).
pub const STR_LONG: usize = 127;
/// Capacity of dotted-quad address fields.
pub const STR_ADDR: usize = 16;

/// Copy `src` into a fixed-capacity string, truncating at the capacity.
/// Truncation is part of the assignment contract, never an overflow.
pub fn bounded<const N: usize>(src: &str) -> String<N> {
    let mut out = String::new();
    for ch in src.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

// ───────────────────────────────────────────────────────────────
// Nested sections
// ───────────────────────────────────────────────────────────────

/// Wireless network settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfig {
    pub enable: bool,
    pub ssid: String<STR_LONG>,
    /// Plaintext in memory; encrypted on disk for schema version >= 1.
    pub password: String<STR_LONG>,
    pub hostname: String<STR_LONG>,
    pub static_ip: bool,
    pub ipaddress: String<STR_ADDR>,
    pub subnet: String<STR_ADDR>,
    pub gateway: String<STR_ADDR>,
    pub dns: String<STR_ADDR>,
}

/// Wired (SPI ethernet) network settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthConfig {
    pub enable: bool,
    pub hostname: String<STR_LONG>,
    pub static_ip: bool,
    pub ipaddress: String<STR_ADDR>,
    pub subnet: String<STR_ADDR>,
    pub gateway: String<STR_ADDR>,
    pub dns: String<STR_ADDR>,
    pub gpio_sck: i32,
    pub gpio_mosi: i32,
    pub gpio_miso: i32,
    pub gpio_cs: i32,
    pub gpio_irq: i32,
    pub gpio_rst: i32,
}

/// Message-bus (MQTT) settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub enable: bool,
    pub server: String<STR_LONG>,
    pub user: String<STR_LONG>,
    /// Plaintext in memory; encrypted on disk for schema version >= 1.
    pub password: String<STR_LONG>,
    /// Base topic; all device topics hang below this.
    pub topic: String<STR_LONG>,
    pub port: u16,
    /// Third-party discovery (Home Assistant) integration.
    pub ha_enable: bool,
    pub ha_topic: String<63>,
    pub ha_device: String<31>,
}

/// Time synchronisation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NtpConfig {
    pub enable: bool,
    pub server: String<STR_LONG>,
    pub tz: String<STR_LONG>,
}

/// Dashboard authentication settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub enable: bool,
    pub user: String<63>,
    pub password: String<63>,
}

/// Logging settings.  `level`: 1 = error, 2 = warn, 3 = info, else debug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub enable: bool,
    pub level: u8,
    pub order: u8,
}

// ───────────────────────────────────────────────────────────────
// The record
// ───────────────────────────────────────────────────────────────

/// The in-memory configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Schema version of the document this record was loaded from.
    pub version: u32,
    /// UI language index.
    pub lang: u8,
    pub wifi: WifiConfig,
    pub eth: EthConfig,
    pub mqtt: MqttConfig,
    pub ntp: NtpConfig,
    pub auth: AuthConfig,
    pub logger: LoggerConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            version: CFG_VERSION,
            lang: 0,
            wifi: WifiConfig {
                enable: true,
                hostname: bounded("EspWebUI"),
                ..WifiConfig::default()
            },
            eth: EthConfig::default(),
            mqtt: MqttConfig {
                enable: false,
                port: 1883,
                ha_topic: bounded("homeassistant"),
                ha_device: bounded("EspWebUI"),
                ..MqttConfig::default()
            },
            ntp: NtpConfig {
                enable: true,
                server: bounded("de.pool.ntp.org"),
                tz: bounded("CET-1CEST,M3.5.0,M10.5.0/3"),
            },
            auth: AuthConfig {
                enable: true,
                ..AuthConfig::default()
            },
            logger: LoggerConfig {
                enable: true,
                level: 4,
                order: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert_eq!(c.version, CFG_VERSION);
        assert!(c.wifi.enable);
        assert!(!c.mqtt.enable);
        assert_eq!(c.mqtt.port, 1883);
        assert_eq!(c.wifi.hostname.as_str(), "EspWebUI");
        assert_eq!(c.ntp.server.as_str(), "de.pool.ntp.org");
        assert_eq!(c.logger.level, 4);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn bounded_copy_truncates() {
        let long = "x".repeat(300);
        let s: String<STR_LONG> = bounded(&long);
        assert_eq!(s.len(), STR_LONG);

        let s: String<STR_ADDR> = bounded("192.168.178.100");
        assert_eq!(s.as_str(), "192.168.178.100");
    }

    #[test]
    fn bounded_copy_respects_char_boundaries() {
        // A multi-byte char that would straddle the capacity is dropped whole.
        let s: String<4> = bounded("abcé");
        assert_eq!(s.as_str(), "abc");
    }
}
