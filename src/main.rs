//! EspWebUI firmware — main entry point.
//!
//! Hexagonal wiring around one cooperative cycle:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Adapters (outer ring)                    │
//! │                                                          │
//! │  FileStorage    EspMqttTransport   TelnetServer          │
//! │  (StoragePort)  (BusTransportPort) (ShellIo + lines)     │
//! │  SystemClock    DeviceSystem       LinkStatus HaDiscovery│
//! │                                                          │
//! │  ───────────── Port Trait Boundary ──────────────        │
//! │                                                          │
//! │  ConfigStore · BusManager · ShellSession (pure logic)    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Network link bring-up (wifi/eth drivers, DHCP, static addressing) is a
//! separate layer whose event handlers feed [`LinkStatus`]; it is wired
//! outside this loop.

#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use espwebui::adapters::discovery::HaDiscovery;
use espwebui::adapters::netlink::LinkStatus;
use espwebui::adapters::storage::{FileStorage, CONFIG_PATH};
use espwebui::adapters::system::DeviceSystem;
use espwebui::adapters::telnet::TelnetServer;
use espwebui::adapters::time::SystemClock;
use espwebui::adapters::transport::EspMqttTransport;
use espwebui::app::ports::{ClockPort, NetLinkPort, SystemPort};
use espwebui::bus::BusManager;
use espwebui::config::bounded;
use espwebui::config_store::ConfigStore;
use espwebui::diagnostics::DiagSnapshot;
use espwebui::shell::{ShellContext, ShellSession};

const CYCLE_SLEEP_MS: u64 = 50;
const TELNET_ADDR: &str = "0.0.0.0:23";

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("EspWebUI v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let mut storage = FileStorage::new(CONFIG_PATH);
    let mut store = ConfigStore::new();
    store.setup(&mut storage);
    if store.setup_mode() {
        warn!("device is in setup mode, bus disabled until configured");
    }

    // ── 3. Collaborator ports ─────────────────────────────────
    let link = LinkStatus::new();
    let clock = SystemClock::new();
    let mut system = DeviceSystem::new("power on");
    info!("last restart reason: {}", system.restart_reason());

    // ── 4. Bus, discovery, shell ──────────────────────────────
    let mut transport = EspMqttTransport::new();
    let mut discovery = HaDiscovery::new();
    discovery.reconfigure(store.config());
    let mut manager = BusManager::new();

    let mut telnet = TelnetServer::bind(TELNET_ADDR)?;
    let mut shell = ShellSession::new();

    // ── 5. Cooperative cycle ──────────────────────────────────
    loop {
        let now = clock.now_ms();

        let line = telnet.poll_line();
        if telnet.take_connected() {
            shell.greet(&mut telnet);
        }
        if let Some(line) = line {
            shell.on_line(&line);
        }

        let diag = DiagSnapshot {
            uptime: clock.uptime(),
            date_time: clock.date_time(),
            ip_address: link.ip_address(),
            rssi: link.rssi(),
            restart_reason: system.restart_reason(),
            bus_connected: manager.is_connected(),
            bus_last_error: bounded(manager.last_error()),
            setup_mode: store.setup_mode(),
        };
        let mut ctx = ShellContext {
            io: &mut telnet,
            store: &mut store,
            storage: &mut storage,
            system: &mut system,
            diag: &diag,
        };
        shell.cyclic(&mut ctx);

        store.cyclic(now, &mut storage);
        if store.take_refresh_request() {
            discovery.reconfigure(store.config());
        }

        manager.cyclic(
            now,
            store.config(),
            store.setup_mode(),
            &link,
            &mut transport,
            &mut discovery,
            &mut system,
            &clock,
        );
        discovery.flush(&mut transport);

        std::thread::sleep(std::time::Duration::from_millis(CYCLE_SLEEP_MS));
    }
}
