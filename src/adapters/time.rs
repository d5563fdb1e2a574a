//! System clock adapter.
//!
//! - **`target_os = "espidf"`** — monotonic time from `esp_timer_get_time()`,
//!   wall clock from `gettimeofday`/`localtime_r` (valid once NTP synced).
//! - **`not(target_os = "espidf")`** — `std::time::Instant` for host runs;
//!   the wall clock reads as unsynced.

use heapless::String;

use crate::app::ports::ClockPort;
use crate::config::bounded;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1000
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(target_os = "espidf")]
    fn date_time(&self) -> String<32> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval { tv_sec: 0, tv_usec: 0 };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return bounded("---");
        }
        // Before 2020-01-01 the clock has clearly never been synced.
        const EPOCH_2020: i64 = 1_577_836_800;
        if tv.tv_sec < EPOCH_2020 {
            return bounded("---");
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return bounded("---");
        }
        bounded(&format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            tm.tm_year + 1900,
            tm.tm_mon + 1,
            tm.tm_mday,
            tm.tm_hour,
            tm.tm_min,
            tm.tm_sec
        ))
    }

    #[cfg(not(target_os = "espidf"))]
    fn date_time(&self) -> String<32> {
        bounded("---")
    }

    fn uptime(&self) -> String<32> {
        format_uptime(self.now_ms() / 1000)
    }
}

/// `Nd HH:MM:SS` from whole seconds since boot.
pub fn format_uptime(secs: u64) -> String<32> {
    let days = secs / 86_400;
    let hours = (secs / 3600) % 24;
    let mins = (secs / 60) % 60;
    let s = secs % 60;
    bounded(&format!("{days}d {hours:02}:{mins:02}:{s:02}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(0).as_str(), "0d 00:00:00");
        assert_eq!(format_uptime(59).as_str(), "0d 00:00:59");
        assert_eq!(format_uptime(3_723).as_str(), "0d 01:02:03");
        assert_eq!(format_uptime(90_061).as_str(), "1d 01:01:01");
        assert_eq!(format_uptime(30 * 86_400 + 4 * 3600).as_str(), "30d 04:00:00");
    }

    #[test]
    fn monotonic_clock_advances() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(clock.now_ms() >= a);
    }
}
