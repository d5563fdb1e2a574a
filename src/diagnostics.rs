//! Read-only device diagnostics shared with the shell and dashboard.

use heapless::String;
use log::LevelFilter;

/// Persisted `logger.level` semantics: 1 = error, 2 = warn, 3 = info,
/// anything else = debug.
fn level_filter(level: u8) -> LevelFilter {
    match level {
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Apply the persisted log level to the log facade.
pub fn apply_log_level(level: u8) {
    log::set_max_level(level_filter(level));
}

/// Snapshot of device state, assembled once per cycle by the main loop and
/// handed read-only to consumers (shell `info`, dashboard).
#[derive(Debug, Clone, Default)]
pub struct DiagSnapshot {
    pub uptime: String<32>,
    pub date_time: String<32>,
    pub ip_address: String<16>,
    pub rssi: Option<i8>,
    pub restart_reason: String<64>,
    pub bus_connected: bool,
    pub bus_last_error: String<64>,
    pub setup_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_mapping_matches_config_semantics() {
        assert_eq!(level_filter(1), LevelFilter::Error);
        assert_eq!(level_filter(2), LevelFilter::Warn);
        assert_eq!(level_filter(3), LevelFilter::Info);
        assert_eq!(level_filter(0), LevelFilter::Debug);
        assert_eq!(level_filter(4), LevelFilter::Debug);
        assert_eq!(level_filter(255), LevelFilter::Debug);
    }
}
