//! End-to-end exercises of the connectivity core over mock and simulation
//! ports: config persistence across a simulated reboot, the bus session
//! lifecycle including retry escalation, and a full shell round trip.

use heapless::String;

use espwebui::adapters::discovery::HaDiscovery;
use espwebui::adapters::storage::MemStorage;
use espwebui::adapters::transport::SimTransport;
use espwebui::app::ports::{ClockPort, NetLinkPort, ShellIo, SystemPort};
use espwebui::bus::{BusEvent, BusManager, BusMessage, DisconnectReason};
use espwebui::config::bounded;
use espwebui::config_store::ConfigStore;
use espwebui::diagnostics::DiagSnapshot;
use espwebui::shell::{ShellContext, ShellSession};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ── Local port doubles ──────────────────────────────────────────

#[derive(Default)]
struct RecordingSystem {
    reason: std::string::String,
    restarts: u32,
}

impl SystemPort for RecordingSystem {
    fn save_restart_reason(&mut self, reason: &str) {
        self.reason = reason.into();
    }

    fn restart_reason(&self) -> String<64> {
        bounded(&self.reason)
    }

    fn restart(&mut self) {
        self.restarts += 1;
    }

    fn delay_ms(&mut self, _ms: u64) {}
}

struct UpLink;

impl NetLinkPort for UpLink {
    fn wifi_connected(&self) -> bool {
        true
    }

    fn eth_connected(&self) -> bool {
        false
    }

    fn ip_address(&self) -> String<16> {
        bounded("192.168.0.20")
    }

    fn rssi(&self) -> Option<i8> {
        Some(-58)
    }
}

struct FixedClock(u64);

impl ClockPort for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0
    }

    fn date_time(&self) -> String<32> {
        bounded("---")
    }

    fn uptime(&self) -> String<32> {
        bounded("0d 00:00:10")
    }
}

fn connected_config_store(storage: &mut MemStorage) -> ConfigStore {
    let mut store = ConfigStore::new();
    store.config_mut().wifi.enable = true;
    store.config_mut().wifi.ssid = bounded("HomeNet");
    store.config_mut().mqtt.enable = true;
    store.config_mut().mqtt.server = bounded("broker.local");
    store.config_mut().mqtt.topic = bounded("espwebui");
    store.config_mut().mqtt.ha_enable = true;
    store.save(storage).unwrap();
    store.load(storage);
    store.final_check();
    store
}

struct BusRig {
    store: ConfigStore,
    storage: MemStorage,
    manager: BusManager,
    transport: SimTransport,
    discovery: HaDiscovery,
    system: RecordingSystem,
}

impl BusRig {
    fn new() -> Self {
        init_logging();
        let mut storage = MemStorage::empty();
        let store = connected_config_store(&mut storage);
        let mut discovery = HaDiscovery::new();
        discovery.reconfigure(store.config());
        Self {
            store,
            storage,
            manager: BusManager::new(),
            transport: SimTransport::new(),
            discovery,
            system: RecordingSystem::default(),
        }
    }

    fn cycle(&mut self, now_ms: u64) {
        let clock = FixedClock(now_ms);
        self.manager.cyclic(
            now_ms,
            self.store.config(),
            self.store.setup_mode(),
            &UpLink,
            &mut self.transport,
            &mut self.discovery,
            &mut self.system,
            &clock,
        );
        self.discovery.flush(&mut self.transport);
        self.store.cyclic(now_ms, &mut self.storage);
    }
}

// ── Config persistence ──────────────────────────────────────────

#[test]
fn config_survives_reboot_with_encrypted_secrets() {
    init_logging();
    let mut storage = MemStorage::empty();

    let mut store = ConfigStore::new();
    store.save(&mut storage).unwrap();
    store.load(&mut storage);

    store.config_mut().wifi.ssid = bounded("HomeNet");
    store.config_mut().wifi.password = bounded("top secret");
    store.cyclic(0, &mut storage);
    store.cyclic(1000, &mut storage);

    let raw = std::string::String::from_utf8(storage.content().unwrap()).unwrap();
    assert!(!raw.contains("top secret"));

    // Simulated reboot: a fresh store reads the same record back.
    let mut rebooted = ConfigStore::new();
    rebooted.setup(&mut storage);
    assert!(!rebooted.setup_mode());
    assert_eq!(rebooted.config().wifi.ssid.as_str(), "HomeNet");
    assert_eq!(rebooted.config().wifi.password.as_str(), "top secret");
}

// ── Bus session lifecycle ───────────────────────────────────────

#[test]
fn session_connects_announces_and_handles_commands() {
    let mut rig = BusRig::new();
    rig.transport.script_connect_outcome(BusEvent::Connected);

    rig.cycle(0); // Disabled -> Disconnected
    rig.cycle(0); // first attempt, scripted success
    rig.cycle(0); // drains Connected

    assert!(rig.manager.is_connected());
    assert_eq!(rig.transport.published_on("espwebui/status"), vec!["online"]);
    assert!(rig
        .transport
        .subscriptions
        .iter()
        .any(|t| t == "espwebui/cmd/#"));
    // Boot discovery broadcast reached the wire through the outbox.
    assert!(rig
        .transport
        .published
        .iter()
        .any(|(t, _, _)| t.starts_with("homeassistant/sensor/")));

    // Reconfigure command: withdraw then republish descriptors.
    let before = rig.transport.published.len();
    rig.transport.inject(BusEvent::Message(BusMessage::copy_from(
        "espwebui/cmd/reconfigure",
        b"",
    )));
    rig.cycle(100);
    let after: Vec<_> = rig.transport.published[before..]
        .iter()
        .filter(|(t, _, _)| t.starts_with("homeassistant/sensor/"))
        .collect();
    // One empty withdrawal and one fresh descriptor per entity.
    assert_eq!(after.len() % 2, 0);
    assert!(after.iter().any(|(_, p, _)| p.is_empty()));
    assert!(after.iter().any(|(_, p, _)| p.contains("state_topic")));
    assert_eq!(rig.system.restarts, 0);

    // Restart command reboots with a recorded reason.
    rig.transport.inject(BusEvent::Message(BusMessage::copy_from(
        "espwebui/cmd/restart",
        b"",
    )));
    rig.cycle(200);
    assert_eq!(rig.system.restarts, 1);
    assert_eq!(rig.system.reason, "mqtt command");
}

#[test]
fn retry_exhaustion_reboots_with_reason() {
    let mut rig = BusRig::new();
    // Nothing scripted: every attempt times out.
    let mut now = 0;
    while rig.system.restarts == 0 && now < 120_000 {
        rig.cycle(now);
        now += 500;
    }
    assert_eq!(rig.transport.connect_calls, 5);
    assert_eq!(rig.system.restarts, 1);
    assert_eq!(rig.system.reason, "no mqtt connection");
}

#[test]
fn broker_refusals_escalate_to_reboot() {
    let mut rig = BusRig::new();
    // A broker that answers every attempt with a refusal.
    for _ in 0..10 {
        rig.transport
            .script_connect_outcome(BusEvent::Disconnected(DisconnectReason::NotAuthorized));
    }

    let mut now = 0;
    while rig.system.restarts == 0 && now < 150_000 {
        rig.cycle(now);
        now += 50;
    }

    assert_eq!(rig.transport.connect_calls, 5);
    assert_eq!(rig.system.restarts, 1);
    assert_eq!(rig.system.reason, "no mqtt connection");
    assert_eq!(rig.manager.last_error(), "MQTT NOT AUTHORIZED");
}

#[test]
fn disconnect_triggers_reconnect_and_records_reason() {
    let mut rig = BusRig::new();
    rig.transport.script_connect_outcome(BusEvent::Connected);
    rig.cycle(0);
    rig.cycle(0);
    rig.cycle(0);
    assert!(rig.manager.is_connected());

    rig.transport.script_connect_outcome(BusEvent::Connected);
    rig.transport
        .inject(BusEvent::Disconnected(DisconnectReason::ServerUnavailable));
    rig.cycle(1000); // sees the disconnect
    assert_eq!(rig.manager.last_error(), "MQTT SERVER UNAVAILABLE");
    rig.cycle(2000); // reconnect attempt, scripted success
    rig.cycle(3000);
    assert!(rig.manager.is_connected());
    assert_eq!(rig.system.restarts, 0);
}

// ── Shell round trip ────────────────────────────────────────────

#[derive(Default)]
struct CapturedIo {
    out: std::string::String,
    disconnected: bool,
}

impl ShellIo for CapturedIo {
    fn print(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn disconnect(&mut self) {
        self.disconnected = true;
    }
}

#[test]
fn shell_session_round_trip() {
    init_logging();
    let mut storage = MemStorage::empty();
    let mut store = connected_config_store(&mut storage);
    let mut system = RecordingSystem::default();
    let mut io = CapturedIo::default();
    let mut session = ShellSession::new();

    session.greet(&mut io);
    assert!(io.out.contains("EspWebUI"));

    let diag = DiagSnapshot {
        uptime: bounded("0d 00:00:42"),
        bus_last_error: bounded("---"),
        ..DiagSnapshot::default()
    };

    for line in ["info", "help", "config reset", "disconnect"] {
        session.on_line(line);
        let mut ctx = ShellContext {
            io: &mut io,
            store: &mut store,
            storage: &mut storage,
            system: &mut system,
            diag: &diag,
        };
        session.cyclic(&mut ctx);
    }

    assert!(io.out.contains("0d 00:00:42"));
    assert!(io.out.contains("restart the device"));
    assert!(io.out.contains("configuration reset to defaults"));
    assert!(io.disconnected);
    assert_eq!(system.restarts, 0);

    // The reset was persisted: a fresh load sees defaults (mqtt off).
    let mut rebooted = ConfigStore::new();
    rebooted.load(&mut storage);
    assert!(!rebooted.config().mqtt.enable);
}
