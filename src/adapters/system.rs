//! System services adapter: restart with recorded reason, bounded delays.
//!
//! Cross-boot persistence of the restart reason lives in the reset-cause
//! bookkeeping layer, which is outside this core; here the reason is held
//! in memory, logged on restart, and seeded from that layer at startup.

use heapless::String;
use log::info;

use crate::app::ports::SystemPort;
use crate::config::bounded;

pub struct DeviceSystem {
    reason: String<64>,
}

impl DeviceSystem {
    /// `previous_reason` is the cause recorded before the last reboot, as
    /// reported by the reset-cause layer.
    pub fn new(previous_reason: &str) -> Self {
        Self {
            reason: bounded(previous_reason),
        }
    }
}

impl SystemPort for DeviceSystem {
    fn save_restart_reason(&mut self, reason: &str) {
        self.reason = bounded(reason);
    }

    fn restart_reason(&self) -> String<64> {
        self.reason.clone()
    }

    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        info!("restarting device ({})", self.reason);
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        info!("restart requested ({}), exiting host process", self.reason);
        std::process::exit(0);
    }

    fn delay_ms(&mut self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_is_recorded_and_truncated() {
        let mut sys = DeviceSystem::new("power on");
        assert_eq!(sys.restart_reason().as_str(), "power on");

        sys.save_restart_reason("mqtt command");
        assert_eq!(sys.restart_reason().as_str(), "mqtt command");

        let long: std::string::String = core::iter::repeat('r').take(100).collect();
        sys.save_restart_reason(&long);
        assert_eq!(sys.restart_reason().len(), 64);
    }
}
