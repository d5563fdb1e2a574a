//! Home Assistant discovery publisher.
//!
//! Announces the device's entities as retained discovery descriptors under
//! the configured discovery prefix; a withdrawal publishes empty retained
//! payloads on the same topics, which removes the entities.  `announce`
//! only stages messages into an outbox so it can run while the session
//! manager holds the transport; the main loop flushes the outbox afterwards.

use crate::app::ports::{BusTransportPort, DiscoveryPort};
use crate::bus::full_topic;
use crate::config::SystemConfig;

struct Entity {
    /// Entity id suffix and descriptor object name.
    id: &'static str,
    name: &'static str,
    /// Suffix under the base topic the entity's state comes from.
    state_suffix: &'static str,
    /// JSON template extracting the value, empty for plain payloads.
    value_template: &'static str,
}

const ENTITIES: &[Entity] = &[
    Entity {
        id: "status",
        name: "Status",
        state_suffix: "/status",
        value_template: "",
    },
    Entity {
        id: "uptime",
        name: "Uptime",
        state_suffix: "/info",
        value_template: "{{ value_json.uptime }}",
    },
    Entity {
        id: "rssi",
        name: "WiFi RSSI",
        state_suffix: "/info",
        value_template: "{{ value_json.rssi }}",
    },
];

#[derive(Default)]
pub struct HaDiscovery {
    prefix: String,
    device: String,
    base_topic: String,
    outbox: Vec<(String, String)>,
}

impl HaDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick up the current discovery settings; call after config changes.
    pub fn reconfigure(&mut self, config: &SystemConfig) {
        self.prefix = config.mqtt.ha_topic.as_str().into();
        self.device = config.mqtt.ha_device.as_str().into();
        self.base_topic = config.mqtt.topic.as_str().into();
    }

    /// Publish everything staged by `announce`.  Retained throughout, so the
    /// discovery side sees the latest descriptor set even across restarts.
    pub fn flush(&mut self, transport: &mut dyn BusTransportPort) {
        for (topic, payload) in self.outbox.drain(..) {
            let _ = transport.publish(&topic, &payload, true);
        }
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    fn descriptor(&self, entity: &Entity) -> String {
        let state_topic = full_topic(&self.base_topic, entity.state_suffix);
        let mut doc = serde_json::json!({
            "name": format!("{} {}", self.device, entity.name),
            "unique_id": format!("{}_{}", self.device, entity.id),
            "state_topic": state_topic.as_str(),
            "availability_topic": full_topic(&self.base_topic, "/status").as_str(),
            "device": {
                "identifiers": [self.device.as_str()],
                "name": self.device.as_str(),
            },
        });
        if !entity.value_template.is_empty() {
            doc["value_template"] = entity.value_template.into();
        }
        doc.to_string()
    }
}

impl DiscoveryPort for HaDiscovery {
    fn announce(&mut self, withdraw: bool) {
        for entity in ENTITIES {
            let topic = format!(
                "{}/sensor/{}/{}/config",
                self.prefix, self.device, entity.id
            );
            let payload = if withdraw {
                String::new()
            } else {
                self.descriptor(entity)
            };
            self.outbox.push((topic, payload));
        }
    }
}
