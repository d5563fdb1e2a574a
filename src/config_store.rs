//! Config store: durable, change-detected persistence of the configuration
//! record.
//!
//! The store owns the [`SystemConfig`] record and a content hash of its last
//! persisted state.  Mutation sites (shell, dashboard callback) simply write
//! into the record; [`ConfigStore::cyclic`] re-hashes the record on a fixed
//! 1000 ms cadence and saves when the hash moved.  This turns arbitrary
//! mutation sites into a single debounced persistence point — nothing else
//! calls `save` except first-load migration and explicit reset.
//!
//! On-disk format is a JSON document with a `version` field.  Version 0
//! predates secret-field encryption and stores passwords in plaintext; any
//! newer version stores `wifi.password` and `mqtt.password` as hex blobs
//! (see [`crate::secret`]).  A version mismatch after load triggers an
//! immediate re-save under the current schema, upgrading the file in place;
//! re-running that migration on a current file is a no-op.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::StoragePort;
use crate::config::{bounded, SystemConfig, CFG_VERSION};
use crate::diagnostics;
use crate::error::StorageError;
use crate::secret::{self, SECRET_KEY};
use crate::timer::CycleTimer;

/// Cadence of the dirty-check, in logical milliseconds.
const CHECK_INTERVAL_MS: u64 = 1000;

// ───────────────────────────────────────────────────────────────
// On-disk document model
// ───────────────────────────────────────────────────────────────
//
// Kept separate from the in-memory record: secret fields are encrypted
// blobs here (longer than the in-memory capacity), and `serde(default)`
// keeps legacy documents with missing fields loadable.

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    lang: u8,
    #[serde(default)]
    wifi: DocWifi,
    #[serde(default)]
    eth: DocEth,
    #[serde(default)]
    mqtt: DocMqtt,
    #[serde(default)]
    ntp: DocNtp,
    #[serde(default)]
    auth: DocAuth,
    #[serde(default)]
    logger: DocLogger,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DocWifi {
    enable: bool,
    ssid: String,
    password: String,
    hostname: String,
    static_ip: bool,
    ipaddress: String,
    subnet: String,
    gateway: String,
    dns: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DocEth {
    enable: bool,
    hostname: String,
    static_ip: bool,
    ipaddress: String,
    subnet: String,
    gateway: String,
    dns: String,
    gpio_sck: i32,
    gpio_mosi: i32,
    gpio_miso: i32,
    gpio_cs: i32,
    gpio_irq: i32,
    gpio_rst: i32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DocMqtt {
    enable: bool,
    server: String,
    user: String,
    password: String,
    topic: String,
    port: u16,
    ha_enable: bool,
    ha_topic: String,
    ha_device: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DocNtp {
    enable: bool,
    server: String,
    tz: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DocAuth {
    enable: bool,
    user: String,
    password: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DocLogger {
    enable: bool,
    level: u8,
    order: u8,
}

// ───────────────────────────────────────────────────────────────
// Config store
// ───────────────────────────────────────────────────────────────

/// Owns the configuration record and its persistence lifecycle.
pub struct ConfigStore {
    config: SystemConfig,
    /// First-run/recovery state: normal networking/bus features are
    /// suppressed until the configuration is corrected.
    setup_mode: bool,
    /// Hash baseline is only valid after the first successful load;
    /// the dirty-check does nothing before that.
    init_done: bool,
    hash_old: [u8; 32],
    check_timer: CycleTimer,
    /// Dashboard signals: full page reload / element refresh requested.
    reload_requested: bool,
    refresh_requested: bool,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            config: SystemConfig::default(),
            setup_mode: false,
            init_done: false,
            hash_old: [0; 32],
            check_timer: CycleTimer::new(),
            reload_requested: false,
            refresh_requested: false,
        }
    }

    /// Initial configuration: load from storage, then validate network
    /// reachability preconditions.  Called once at startup.
    pub fn setup(&mut self, storage: &mut dyn StoragePort) {
        self.load(storage);
        self.final_check();
    }

    // ── Load / save ───────────────────────────────────────────

    /// Load the persisted document into the record.
    ///
    /// Any structural failure (missing file, parse error) falls back to
    /// defaults and flags setup mode — never fatal.
    pub fn load(&mut self, storage: &mut dyn StoragePort) {
        let doc: Document = match storage.read() {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    error!("SETUP-MODE-REASON: config file unparseable ({e}), using default configuration");
                    self.reset_to_defaults();
                    self.setup_mode = true;
                    self.hash_init();
                    return;
                }
            },
            Err(e) => {
                error!("SETUP-MODE-REASON: failed to read config file ({e}), using default configuration");
                self.reset_to_defaults();
                self.setup_mode = true;
                self.hash_init();
                return;
            }
        };

        self.apply_document(&doc);
        self.hash_init();

        // Upgrade the file in place when the schema version moved.
        if self.config.version != CFG_VERSION {
            let old = self.config.version;
            self.config.version = CFG_VERSION;
            match self.save(storage) {
                Ok(()) => info!("config file was updated from version {old} to version {CFG_VERSION}"),
                Err(e) => warn!("config migration save failed: {e}"),
            }
        } else {
            debug!("config file version {} was successfully loaded", self.config.version);
        }
    }

    /// Serialize the record (secrets encrypted) and atomically replace the
    /// persisted file (remove-then-write).
    pub fn save(&mut self, storage: &mut dyn StoragePort) -> Result<(), StorageError> {
        let doc = self.build_document();
        let bytes = serde_json::to_vec(&doc).map_err(|_| StorageError::WriteFailed)?;

        // Remove first so the write replaces rather than appends; a missing
        // file is fine.
        let _ = storage.remove();
        storage.write(&bytes)?;

        self.hash_old = self.content_hash();
        info!("config successfully saved (version {CFG_VERSION})");
        Ok(())
    }

    /// Dirty-check tick: on a 1000 ms cadence, hash the record and save when
    /// it changed.  A failed save leaves the baseline untouched, so the save
    /// is retried on the next tick.
    pub fn cyclic(&mut self, now_ms: u64, storage: &mut dyn StoragePort) {
        if self.check_timer.cycle_trigger(now_ms, CHECK_INTERVAL_MS) && self.init_done {
            let hash_new = self.content_hash();
            if hash_new != self.hash_old {
                match self.save(storage) {
                    Ok(()) => self.refresh_requested = true,
                    Err(e) => warn!("config save failed ({e}), retrying on next check"),
                }
            }
        }
    }

    /// Zero the record and assign the documented defaults.
    pub fn reset_to_defaults(&mut self) {
        self.config = SystemConfig::default();
        self.reload_requested = true;
    }

    /// Post-load gate: flag setup mode when the network settings cannot
    /// yield a reachable device.  Also applies the persisted log level.
    pub fn final_check(&mut self) {
        if self.config.wifi.enable && self.config.wifi.ssid.is_empty() {
            warn!("SETUP-MODE-REASON: no valid wifi SSID set");
            self.setup_mode = true;
        } else if !self.config.wifi.enable && !self.config.eth.enable {
            warn!("SETUP-MODE-REASON: WiFi and ETH disabled");
            self.setup_mode = true;
        }

        diagnostics::apply_log_level(self.config.logger.level);
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Mutable access for the shell/dashboard command paths.  Changes are
    /// picked up by the dirty-check on its next tick.
    pub fn config_mut(&mut self) -> &mut SystemConfig {
        &mut self.config
    }

    pub fn setup_mode(&self) -> bool {
        self.setup_mode
    }

    /// Dashboard signal: a full page reload is wanted (e.g. after reset).
    pub fn take_reload_request(&mut self) -> bool {
        core::mem::take(&mut self.reload_requested)
    }

    /// Dashboard signal: element values should be refreshed.
    pub fn take_refresh_request(&mut self) -> bool {
        core::mem::take(&mut self.refresh_requested)
    }

    // ── Internal ──────────────────────────────────────────────

    fn hash_init(&mut self) {
        self.hash_old = self.content_hash();
        self.init_done = true;
    }

    fn content_hash(&self) -> [u8; 32] {
        serde_json::to_vec(&self.config)
            .map(|bytes| hmac_sha256::Hash::hash(&bytes))
            .unwrap_or_default()
    }

    /// Copy the staged document into the record with truncating bounded
    /// copies, decrypting the two secret fields per the stored version.
    fn apply_document(&mut self, doc: &Document) {
        let c = &mut self.config;
        c.version = doc.version;
        c.lang = doc.lang;

        c.wifi.enable = doc.wifi.enable;
        c.wifi.ssid = bounded(&doc.wifi.ssid);
        c.wifi.password = read_secret(&doc.wifi.password, doc.version, "WiFi");
        c.wifi.hostname = bounded(&doc.wifi.hostname);
        c.wifi.static_ip = doc.wifi.static_ip;
        c.wifi.ipaddress = bounded(&doc.wifi.ipaddress);
        c.wifi.subnet = bounded(&doc.wifi.subnet);
        c.wifi.gateway = bounded(&doc.wifi.gateway);
        c.wifi.dns = bounded(&doc.wifi.dns);

        c.eth.enable = doc.eth.enable;
        c.eth.hostname = bounded(&doc.eth.hostname);
        c.eth.static_ip = doc.eth.static_ip;
        c.eth.ipaddress = bounded(&doc.eth.ipaddress);
        c.eth.subnet = bounded(&doc.eth.subnet);
        c.eth.gateway = bounded(&doc.eth.gateway);
        c.eth.dns = bounded(&doc.eth.dns);
        c.eth.gpio_sck = doc.eth.gpio_sck;
        c.eth.gpio_mosi = doc.eth.gpio_mosi;
        c.eth.gpio_miso = doc.eth.gpio_miso;
        c.eth.gpio_cs = doc.eth.gpio_cs;
        c.eth.gpio_irq = doc.eth.gpio_irq;
        c.eth.gpio_rst = doc.eth.gpio_rst;

        c.mqtt.enable = doc.mqtt.enable;
        c.mqtt.server = bounded(&doc.mqtt.server);
        c.mqtt.user = bounded(&doc.mqtt.user);
        c.mqtt.password = read_secret(&doc.mqtt.password, doc.version, "mqtt");
        c.mqtt.topic = bounded(&doc.mqtt.topic);
        c.mqtt.port = doc.mqtt.port;
        c.mqtt.ha_enable = doc.mqtt.ha_enable;
        c.mqtt.ha_topic = bounded(&doc.mqtt.ha_topic);
        c.mqtt.ha_device = bounded(&doc.mqtt.ha_device);

        c.ntp.enable = doc.ntp.enable;
        c.ntp.server = bounded(&doc.ntp.server);
        c.ntp.tz = bounded(&doc.ntp.tz);

        c.auth.enable = doc.auth.enable;
        c.auth.user = bounded(&doc.auth.user);
        c.auth.password = bounded(&doc.auth.password);

        c.logger.enable = doc.logger.enable;
        c.logger.level = doc.logger.level;
        c.logger.order = doc.logger.order;
    }

    /// Build the on-disk document from the record, encrypting the two
    /// secret fields.  A codec failure leaves the stored field empty and
    /// is logged — never fatal.
    fn build_document(&self) -> Document {
        let c = &self.config;
        Document {
            version: CFG_VERSION,
            lang: c.lang,
            wifi: DocWifi {
                enable: c.wifi.enable,
                ssid: c.wifi.ssid.as_str().into(),
                password: write_secret(&c.wifi.password, "WiFi"),
                hostname: c.wifi.hostname.as_str().into(),
                static_ip: c.wifi.static_ip,
                ipaddress: c.wifi.ipaddress.as_str().into(),
                subnet: c.wifi.subnet.as_str().into(),
                gateway: c.wifi.gateway.as_str().into(),
                dns: c.wifi.dns.as_str().into(),
            },
            eth: DocEth {
                enable: c.eth.enable,
                hostname: c.eth.hostname.as_str().into(),
                static_ip: c.eth.static_ip,
                ipaddress: c.eth.ipaddress.as_str().into(),
                subnet: c.eth.subnet.as_str().into(),
                gateway: c.eth.gateway.as_str().into(),
                dns: c.eth.dns.as_str().into(),
                gpio_sck: c.eth.gpio_sck,
                gpio_mosi: c.eth.gpio_mosi,
                gpio_miso: c.eth.gpio_miso,
                gpio_cs: c.eth.gpio_cs,
                gpio_irq: c.eth.gpio_irq,
                gpio_rst: c.eth.gpio_rst,
            },
            mqtt: DocMqtt {
                enable: c.mqtt.enable,
                server: c.mqtt.server.as_str().into(),
                user: c.mqtt.user.as_str().into(),
                password: write_secret(&c.mqtt.password, "mqtt"),
                topic: c.mqtt.topic.as_str().into(),
                port: c.mqtt.port,
                ha_enable: c.mqtt.ha_enable,
                ha_topic: c.mqtt.ha_topic.as_str().into(),
                ha_device: c.mqtt.ha_device.as_str().into(),
            },
            ntp: DocNtp {
                enable: c.ntp.enable,
                server: c.ntp.server.as_str().into(),
                tz: c.ntp.tz.as_str().into(),
            },
            auth: DocAuth {
                enable: c.auth.enable,
                user: c.auth.user.as_str().into(),
                password: c.auth.password.as_str().into(),
            },
            logger: DocLogger {
                enable: c.logger.enable,
                level: c.logger.level,
                order: c.logger.order,
            },
        }
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a stored secret field.  Version 0 documents predate encryption and
/// are read as plaintext; any other version is treated as encrypted, and a
/// decode failure yields an empty field (non-fatal).
fn read_secret(stored: &str, version: u32, what: &str) -> heapless::String<{ crate::config::STR_LONG }> {
    if version == 0 {
        return bounded(stored);
    }
    match secret::decrypt(stored, &SECRET_KEY) {
        Ok(plain) => plain,
        Err(e) => {
            error!("error decrypting {what} password: {e}");
            heapless::String::new()
        }
    }
}

fn write_secret(plain: &str, what: &str) -> String {
    match secret::encrypt(plain, &SECRET_KEY) {
        Ok(blob) => blob.as_str().into(),
        Err(e) => {
            error!("error encrypting {what} password: {e}");
            String::new()
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
