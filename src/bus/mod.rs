//! Message-bus session lifecycle.
//!
//! The [`BusManager`] owns the client connection state machine:
//!
//! ```text
//!   Disabled ⇄ Disconnected → Connecting → Connected → Disconnected
//! ```
//!
//! Connecting is entered only when the bus feature is enabled, the device is
//! not in setup mode and the network link is up.  The first attempt fires
//! immediately; subsequent attempts are gated by a fixed 10 s delay, and the
//! fifth failed attempt is terminal: the manager records a restart reason
//! and reboots the device.  On a successful connect the attempt counter
//! resets, presence is published retained and the command subscriptions are
//! re-established.
//!
//! Inbound messages land in the bounded [`queue::CommandQueue`]; the
//! [`processor`] drains one per cycle.

pub mod processor;
pub mod queue;

use heapless::String;
use log::{debug, info, warn};

use crate::app::ports::{BusTransportPort, ClockPort, DiscoveryPort, NetLinkPort, SystemPort};
use crate::config::{bounded, SystemConfig, STR_LONG};
use crate::timer::{CycleTimer, DelayTimer};

pub use queue::{BusMessage, CommandQueue};

/// Attempts before the reconnect policy escalates to a reboot.
const MAX_ATTEMPTS: u8 = 5;
/// Delay between connection attempts, logical milliseconds.
const RETRY_DELAY_MS: u64 = 10_000;
/// Cadence of the cyclic device-info publish while connected.
const INFO_INTERVAL_MS: u64 = 10_000;
/// Flush delay before a policy-driven reboot.
const REBOOT_DELAY_MS: u64 = 1000;

/// Capacity of an assembled topic string (base topic plus suffix).
pub const TOPIC_LEN: usize = queue::TOPIC_LEN;

// ───────────────────────────────────────────────────────────────
// Transport-facing types
// ───────────────────────────────────────────────────────────────

/// Connection settings handed to the transport adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusSettings {
    pub server: String<STR_LONG>,
    pub port: u16,
    pub user: String<STR_LONG>,
    pub password: String<STR_LONG>,
    pub client_id: String<STR_LONG>,
    /// Presence topic; the broker publishes `offline` here (retained) as the
    /// last will when the session dies.
    pub will_topic: String<TOPIC_LEN>,
}

impl BusSettings {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            server: config.mqtt.server.clone(),
            port: config.mqtt.port,
            user: config.mqtt.user.clone(),
            password: config.mqtt.password.clone(),
            client_id: bounded(config.wifi.hostname.as_str()),
            will_topic: full_topic(config.mqtt.topic.as_str(), "/status"),
        }
    }
}

/// Why the transport dropped the session, as a short descriptive string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    TcpDisconnected,
    UnacceptableProtocolVersion,
    IdentifierRejected,
    ServerUnavailable,
    MalformedCredentials,
    NotAuthorized,
    BadFingerprint,
    Unknown,
}

impl DisconnectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TcpDisconnected => "TCP DISCONNECTED",
            Self::UnacceptableProtocolVersion => "MQTT UNACCEPTABLE PROTOCOL VERSION",
            Self::IdentifierRejected => "MQTT IDENTIFIER REJECTED",
            Self::ServerUnavailable => "MQTT SERVER UNAVAILABLE",
            Self::MalformedCredentials => "MQTT MALFORMED CREDENTIALS",
            Self::NotAuthorized => "MQTT NOT AUTHORIZED",
            Self::BadFingerprint => "TLS BAD FINGERPRINT",
            Self::Unknown => "UNKNOWN ERROR",
        }
    }
}

/// Event handed out of the transport adapter's `poll`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Connected,
    Disconnected(DisconnectReason),
    Message(BusMessage),
}

/// Assemble `<base><suffix>` with a truncating copy.
pub fn full_topic(base: &str, suffix: &str) -> String<TOPIC_LEN> {
    let mut t: String<TOPIC_LEN> = String::new();
    let _ = t.push_str(base);
    let _ = t.push_str(suffix);
    t
}

// ───────────────────────────────────────────────────────────────
// Session manager
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BusState {
    Disabled,
    Disconnected,
    Connecting,
    Connected,
}

/// Owns the bus connection lifecycle and the inbound command queue.
pub struct BusManager {
    state: BusState,
    configured: bool,
    attempts: u8,
    retry_timer: DelayTimer,
    info_timer: CycleTimer,
    /// One-shot guard for the boot announcement and initial discovery
    /// broadcast; never re-fires across reconnects.
    boot_announced: bool,
    queue: CommandQueue,
    last_error: String<64>,
}

impl BusManager {
    pub fn new() -> Self {
        let mut last_error = String::new();
        let _ = last_error.push_str("---");
        Self {
            state: BusState::Disabled,
            configured: false,
            attempts: 0,
            retry_timer: DelayTimer::new(),
            info_timer: CycleTimer::new(),
            boot_announced: false,
            queue: CommandQueue::new(),
            last_error,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == BusState::Connected
    }

    /// The most recent disconnect reason, `---` before the first one.
    pub fn last_error(&self) -> &str {
        self.last_error.as_str()
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// One cooperative cycle: drain transport events, drive the state
    /// machine, publish periodic info and process one queued command.
    #[allow(clippy::too_many_arguments)]
    pub fn cyclic(
        &mut self,
        now_ms: u64,
        config: &SystemConfig,
        setup_mode: bool,
        link: &dyn NetLinkPort,
        transport: &mut dyn BusTransportPort,
        discovery: &mut dyn DiscoveryPort,
        system: &mut dyn SystemPort,
        clock: &dyn ClockPort,
    ) {
        self.drain_events(config, transport, discovery);

        // Queued commands drain one per cycle regardless of session state,
        // so nothing received just before a drop waits for the reconnect.
        if let Some(msg) = self.queue.pop() {
            processor::process(&msg, config, transport, discovery, system);
        }

        if !config.mqtt.enable || setup_mode {
            self.state = BusState::Disabled;
            self.retry_timer.reset();
            return;
        }

        match self.state {
            BusState::Disabled => {
                self.state = BusState::Disconnected;
            }
            BusState::Disconnected => {
                if link.any_connected() {
                    if !self.configured {
                        transport.configure(&BusSettings::from_config(config));
                        self.configured = true;
                    }
                    // First attempt fires immediately on entering Connecting.
                    self.attempts = 1;
                    debug!("bus connect attempt {}", self.attempts);
                    transport.connect();
                    self.retry_timer.reset();
                    self.state = BusState::Connecting;
                }
            }
            BusState::Connecting => {
                if self.retry_timer.delay_on_trigger(true, now_ms, RETRY_DELAY_MS) {
                    if self.attempts >= MAX_ATTEMPTS {
                        warn!("bus connection failed after {MAX_ATTEMPTS} attempts, restarting");
                        system.save_restart_reason("no mqtt connection");
                        system.delay_ms(REBOOT_DELAY_MS);
                        system.restart();
                        return;
                    }
                    self.attempts += 1;
                    debug!("bus connect attempt {}", self.attempts);
                    transport.connect();
                    self.retry_timer.reset();
                }
            }
            BusState::Connected => {
                if self.info_timer.cycle_trigger(now_ms, INFO_INTERVAL_MS) {
                    self.publish_info(config, link, transport, clock);
                }
            }
        }
    }

    /// Pull every pending transport event into session state.  Never blocks;
    /// message events are only copied into the bounded queue.
    fn drain_events(
        &mut self,
        config: &SystemConfig,
        transport: &mut dyn BusTransportPort,
        discovery: &mut dyn DiscoveryPort,
    ) {
        while let Some(event) = transport.poll() {
            match event {
                BusEvent::Connected => self.on_connected(config, transport, discovery),
                BusEvent::Disconnected(reason) => {
                    warn!("bus disconnected: {}", reason.as_str());
                    self.last_error = bounded(reason.as_str());
                    // A refused attempt stays in Connecting so the attempt
                    // counter and the 10 s gate remain in force; only an
                    // established session falls back to Disconnected.
                    if self.state == BusState::Connected {
                        self.state = BusState::Disconnected;
                        self.retry_timer.reset();
                    }
                }
                BusEvent::Message(msg) => {
                    let _ = self.queue.enqueue(msg.topic.as_str(), &msg.payload);
                }
            }
        }
    }

    fn on_connected(
        &mut self,
        config: &SystemConfig,
        transport: &mut dyn BusTransportPort,
        discovery: &mut dyn DiscoveryPort,
    ) {
        info!("bus connected to {}:{}", config.mqtt.server, config.mqtt.port);
        self.state = BusState::Connected;
        self.attempts = 0;
        self.retry_timer.reset();

        let base = config.mqtt.topic.as_str();
        let _ = transport.publish(full_topic(base, "/status").as_str(), "online", true);
        transport.subscribe(full_topic(base, "/cmd/#").as_str());
        transport.subscribe(full_topic(base, "/setvalue/#").as_str());
        transport.subscribe("homeassistant/status");

        if !self.boot_announced {
            self.boot_announced = true;
            let _ = transport.publish(full_topic(base, "/message").as_str(), "device started", false);
            if config.mqtt.ha_enable {
                discovery.announce(false);
            }
        }
    }

    fn publish_info(
        &mut self,
        config: &SystemConfig,
        link: &dyn NetLinkPort,
        transport: &mut dyn BusTransportPort,
        clock: &dyn ClockPort,
    ) {
        let payload = serde_json::json!({
            "uptime": clock.uptime().as_str(),
            "time": clock.date_time().as_str(),
            "ip": link.ip_address().as_str(),
            "rssi": link.rssi(),
        });
        let topic = full_topic(config.mqtt.topic.as_str(), "/info");
        let _ = transport.publish(topic.as_str(), &payload.to_string(), false);
    }
}

impl Default for BusManager {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Shared test doubles
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::error::BusError;
    use std::collections::VecDeque;

    #[derive(Default)]
    pub struct MockTransport {
        pub events: VecDeque<BusEvent>,
        pub configured: Vec<BusSettings>,
        pub connect_calls: u32,
        pub subscriptions: Vec<std::string::String>,
        pub published: Vec<(std::string::String, std::string::String, bool)>,
        /// When set, every connect attempt is answered with this
        /// disconnect event (a broker that actively refuses).
        pub refuse_with: Option<DisconnectReason>,
    }

    impl MockTransport {
        pub fn push_event(&mut self, event: BusEvent) {
            self.events.push_back(event);
        }

        pub fn published_on(&self, topic: &str) -> Vec<&str> {
            self.published
                .iter()
                .filter(|(t, _, _)| t == topic)
                .map(|(_, p, _)| p.as_str())
                .collect()
        }
    }

    impl BusTransportPort for MockTransport {
        fn configure(&mut self, settings: &BusSettings) {
            self.configured.push(settings.clone());
        }

        fn connect(&mut self) {
            self.connect_calls += 1;
            if let Some(reason) = self.refuse_with {
                self.events.push_back(BusEvent::Disconnected(reason));
            }
        }

        fn is_connected(&self) -> bool {
            false
        }

        fn subscribe(&mut self, topic: &str) {
            self.subscriptions.push(topic.into());
        }

        fn publish(&mut self, topic: &str, payload: &str, retained: bool) -> Result<(), BusError> {
            self.published.push((topic.into(), payload.into(), retained));
            Ok(())
        }

        fn poll(&mut self) -> Option<BusEvent> {
            self.events.pop_front()
        }
    }

    #[derive(Default)]
    pub struct MockSystem {
        pub restart_reason: std::string::String,
        pub restart_calls: u32,
        pub delays: Vec<u64>,
    }

    impl SystemPort for MockSystem {
        fn save_restart_reason(&mut self, reason: &str) {
            self.restart_reason = reason.into();
        }

        fn restart_reason(&self) -> String<64> {
            bounded(&self.restart_reason)
        }

        fn restart(&mut self) {
            self.restart_calls += 1;
        }

        fn delay_ms(&mut self, ms: u64) {
            self.delays.push(ms);
        }
    }

    #[derive(Default)]
    pub struct MockDiscovery {
        /// Recorded `withdraw` flags, in call order.
        pub announcements: Vec<bool>,
    }

    impl DiscoveryPort for MockDiscovery {
        fn announce(&mut self, withdraw: bool) {
            self.announcements.push(withdraw);
        }
    }

    pub struct MockLink {
        pub up: bool,
    }

    impl NetLinkPort for MockLink {
        fn wifi_connected(&self) -> bool {
            self.up
        }

        fn eth_connected(&self) -> bool {
            false
        }

        fn ip_address(&self) -> String<16> {
            bounded(if self.up { "192.168.1.50" } else { "" })
        }

        fn rssi(&self) -> Option<i8> {
            self.up.then_some(-61)
        }
    }

    pub struct MockClock {
        pub now_ms: u64,
    }

    impl ClockPort for MockClock {
        fn now_ms(&self) -> u64 {
            self.now_ms
        }

        fn date_time(&self) -> String<32> {
            bounded("2026-01-01 12:00:00")
        }

        fn uptime(&self) -> String<32> {
            bounded("0d 00:10:00")
        }
    }

    /// A config with the bus enabled and a known base topic.
    pub fn bus_config() -> SystemConfig {
        let mut config = SystemConfig::default();
        config.mqtt.enable = true;
        config.mqtt.server = bounded("broker.local");
        config.mqtt.topic = bounded("espwebui");
        config
    }
}
