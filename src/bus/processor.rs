//! Interpreter for queued inbound bus messages.
//!
//! Topic matching is case-insensitive exact match against a small fixed set
//! of control topics under the configured base topic plus the fixed
//! third-party discovery status topic.  Anything else is echoed back to the
//! bus as an "unknown topic" diagnostic; unrecognized traffic never raises
//! an error beyond that.

use log::{info, warn};

use crate::app::ports::{BusTransportPort, DiscoveryPort, SystemPort};
use crate::config::SystemConfig;

use super::{full_topic, BusMessage};

/// Fixed discovery status topic published by the home-automation side.
const DISCOVERY_STATUS_TOPIC: &str = "homeassistant/status";

/// Flush delay before the command-driven reboot, and the settle time
/// between a discovery withdrawal and its re-publish.
const COMMAND_DELAY_MS: u64 = 1000;

/// Handle one dequeued message.
pub fn process(
    msg: &BusMessage,
    config: &SystemConfig,
    transport: &mut dyn BusTransportPort,
    discovery: &mut dyn DiscoveryPort,
    system: &mut dyn SystemPort,
) {
    let base = config.mqtt.topic.as_str();
    let topic = msg.topic.as_str();

    if topic.eq_ignore_ascii_case(full_topic(base, "/cmd/restart").as_str()) {
        info!("restart requested over the bus");
        system.save_restart_reason("mqtt command");
        system.delay_ms(COMMAND_DELAY_MS);
        system.restart();
    } else if topic.eq_ignore_ascii_case(full_topic(base, "/cmd/reconfigure").as_str()) {
        // Withdraw first and let it propagate before re-announcing.
        info!("discovery reconfigure requested over the bus");
        discovery.announce(true);
        system.delay_ms(COMMAND_DELAY_MS);
        discovery.announce(false);
    } else if topic.eq_ignore_ascii_case(DISCOVERY_STATUS_TOPIC) {
        if msg.payload_str() == Some("online") && config.mqtt.ha_enable {
            info!("discovery endpoint came online, re-broadcasting");
            discovery.announce(false);
        }
    } else {
        warn!("unknown bus topic '{topic}'");
        let mut note: heapless::String<{ super::TOPIC_LEN + 16 }> = heapless::String::new();
        let _ = note.push_str("unknown topic ");
        let _ = note.push_str(topic);
        let _ = transport.publish(full_topic(base, "/message").as_str(), note.as_str(), false);
    }
}
