//! Port traits — the hexagonal boundary between the connectivity core and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ core (config store / bus manager / shell)
//! ```
//!
//! Driven adapters (filesystem, MQTT client, telnet server, system services)
//! implement these traits.  The core consumes them via `&mut dyn` references
//! threaded through the cooperative cycle, so no subsystem touches hardware
//! or sockets directly and everything is testable with mocks.
//!
//! Transport callbacks never block: each implementation performs only a
//! bounded copy into its own buffer and hands events out of [`poll`]
//! (`BusTransportPort::poll`) on the next cycle.

use heapless::String;

use crate::bus::{BusEvent, BusSettings};
use crate::error::{BusError, StorageError};

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: config store ↔ persisted file)
// ───────────────────────────────────────────────────────────────

/// Persistence for the single configuration document.
///
/// Writes replace the whole file (remove-then-write).  A partial write
/// leaves the device without a valid config until the next successful
/// save — acceptable, because defaults plus setup mode cover that case.
pub trait StoragePort {
    /// Read the whole persisted document.
    fn read(&mut self) -> Result<Vec<u8>, StorageError>;

    /// Write the whole document, replacing any previous content.
    fn write(&mut self, data: &[u8]) -> Result<(), StorageError>;

    /// Remove the persisted document.  Ok even if it did not exist.
    fn remove(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Network link port (read-only view of the excluded network layer)
// ───────────────────────────────────────────────────────────────

/// Link status as reported by the network bring-up layer (out of scope
/// here; DHCP/static assignment happen behind this trait).
pub trait NetLinkPort {
    fn wifi_connected(&self) -> bool;
    fn eth_connected(&self) -> bool;

    /// Either interface is up.
    fn any_connected(&self) -> bool {
        self.wifi_connected() || self.eth_connected()
    }

    /// Current IP address as text; empty when no link.
    fn ip_address(&self) -> String<16>;

    /// Wireless signal strength in dBm, when associated.
    fn rssi(&self) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// System port (restart, bounded delays)
// ───────────────────────────────────────────────────────────────

/// Process-level services: recorded restart reason and device restart.
///
/// [`delay_ms`](SystemPort::delay_ms) is the only intentional blocking wait
/// in the core and is used exclusively on fatal/restart paths to let
/// in-flight I/O flush before the reboot.
pub trait SystemPort {
    /// Record a human-readable reason for the next restart.
    fn save_restart_reason(&mut self, reason: &str);

    /// The reason recorded before the previous restart.
    fn restart_reason(&self) -> String<64>;

    /// Restart the device.  Mock implementations record the call instead.
    fn restart(&mut self);

    /// Bounded blocking delay.
    fn delay_ms(&mut self, ms: u64);
}

// ───────────────────────────────────────────────────────────────
// Clock port (monotonic time + formatted strings)
// ───────────────────────────────────────────────────────────────

/// Monotonic time source and human-readable time strings.
pub trait ClockPort {
    /// Milliseconds since boot (monotonic).
    fn now_ms(&self) -> u64;

    /// Wall-clock date-time string, `---` before time sync.
    fn date_time(&self) -> String<32>;

    /// Formatted uptime, e.g. `3d 04:12:59`.
    fn uptime(&self) -> String<32>;
}

// ───────────────────────────────────────────────────────────────
// Bus transport port (driven adapter: MQTT client)
// ───────────────────────────────────────────────────────────────

/// The message-bus client transport.
///
/// `connect` only begins an attempt; the outcome arrives later as a
/// [`BusEvent`] from `poll`.  `poll` returns at most one event per call
/// and must never block.
pub trait BusTransportPort {
    /// Apply connection settings (server, credentials, last will).
    fn configure(&mut self, settings: &BusSettings);

    /// Begin a connection attempt (non-blocking).
    fn connect(&mut self);

    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str);

    fn publish(&mut self, topic: &str, payload: &str, retained: bool) -> Result<(), BusError>;

    /// Next pending transport event, if any.
    fn poll(&mut self) -> Option<BusEvent>;
}

// ───────────────────────────────────────────────────────────────
// Discovery port (third-party discovery announcements)
// ───────────────────────────────────────────────────────────────

/// Third-party (Home Assistant) discovery descriptor publisher.
pub trait DiscoveryPort {
    /// Publish the discovery descriptors; `withdraw` removes them instead.
    fn announce(&mut self, withdraw: bool);
}

// ───────────────────────────────────────────────────────────────
// Shell output port (driven adapter: telnet session)
// ───────────────────────────────────────────────────────────────

/// Output side of the interactive session.  Input lines arrive through the
/// cooperative cycle (see [`crate::shell::ShellSession::on_line`]).
pub trait ShellIo {
    fn print(&mut self, text: &str);

    fn println(&mut self, text: &str) {
        self.print(text);
        self.print("\n");
    }

    /// Close the current session.
    fn disconnect(&mut self);
}
