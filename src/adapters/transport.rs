//! Bus transport adapters.
//!
//! - [`SimTransport`] — scriptable in-memory transport for host tests and
//!   simulation; connect outcomes and inbound traffic are injected.
//! - `EspMqttTransport` — the device transport over the ESP-IDF MQTT
//!   client (`target_os = "espidf"` only).  The client callback runs on the
//!   MQTT task and only copies events into a queue drained by `poll`.

use std::collections::VecDeque;

use crate::app::ports::BusTransportPort;
use crate::bus::{BusEvent, BusSettings};
use crate::error::BusError;

/// In-memory transport with scripted behavior.
#[derive(Default)]
pub struct SimTransport {
    events: VecDeque<BusEvent>,
    /// Outcome injected per connect attempt, consumed in order; attempts
    /// beyond the script produce no event (the attempt just times out).
    connect_script: VecDeque<BusEvent>,
    connected: bool,
    pub settings: Option<BusSettings>,
    pub connect_calls: u32,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, String, bool)>,
}

impl SimTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next unscripted connect attempt.
    pub fn script_connect_outcome(&mut self, event: BusEvent) {
        self.connect_script.push_back(event);
    }

    /// Inject an arbitrary transport event (e.g. an inbound message).
    pub fn inject(&mut self, event: BusEvent) {
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

impl BusTransportPort for SimTransport {
    fn configure(&mut self, settings: &BusSettings) {
        self.settings = Some(settings.clone());
    }

    fn connect(&mut self) {
        self.connect_calls += 1;
        if let Some(outcome) = self.connect_script.pop_front() {
            if outcome == BusEvent::Connected {
                self.connected = true;
            }
            self.events.push_back(outcome);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) {
        self.subscriptions.push(topic.into());
    }

    fn publish(&mut self, topic: &str, payload: &str, retained: bool) -> Result<(), BusError> {
        if !self.connected {
            return Err(BusError::NotConnected);
        }
        self.published.push((topic.into(), payload.into(), retained));
        Ok(())
    }

    fn poll(&mut self) -> Option<BusEvent> {
        if let Some(event) = self.events.front() {
            if let BusEvent::Disconnected(_) = event {
                self.connected = false;
            }
        }
        self.events.pop_front()
    }
}

#[cfg(target_os = "espidf")]
pub use espidf::EspMqttTransport;

#[cfg(target_os = "espidf")]
mod espidf {
    use std::sync::{Arc, Mutex};

    use esp_idf_svc::mqtt::client::{
        EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
    };
    use log::warn;

    use super::*;
    use crate::bus::{BusMessage, DisconnectReason};

    type EventQueue = Arc<Mutex<VecDeque<BusEvent>>>;

    /// Device transport over the ESP-IDF MQTT client.
    pub struct EspMqttTransport {
        settings: Option<BusSettings>,
        client: Option<EspMqttClient<'static>>,
        events: EventQueue,
        connected: Arc<Mutex<bool>>,
    }

    impl EspMqttTransport {
        pub fn new() -> Self {
            Self {
                settings: None,
                client: None,
                events: Arc::new(Mutex::new(VecDeque::new())),
                connected: Arc::new(Mutex::new(false)),
            }
        }

        fn push(events: &EventQueue, event: BusEvent) {
            if let Ok(mut q) = events.lock() {
                q.push_back(event);
            }
        }
    }

    impl Default for EspMqttTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl BusTransportPort for EspMqttTransport {
        fn configure(&mut self, settings: &BusSettings) {
            self.settings = Some(settings.clone());
        }

        fn connect(&mut self) {
            let Some(settings) = self.settings.clone() else {
                warn!("bus connect without settings");
                return;
            };
            // Dropping any previous client tears its session down first.
            self.client = None;

            let url = format!("mqtt://{}:{}", settings.server, settings.port);
            let conf = MqttClientConfiguration {
                client_id: Some(settings.client_id.as_str()),
                username: (!settings.user.is_empty()).then(|| settings.user.as_str()),
                password: (!settings.password.is_empty()).then(|| settings.password.as_str()),
                lwt: Some(LwtConfiguration {
                    topic: settings.will_topic.as_str(),
                    payload: b"offline",
                    qos: QoS::AtLeastOnce,
                    retain: true,
                }),
                ..Default::default()
            };

            let events = Arc::clone(&self.events);
            let connected = Arc::clone(&self.connected);
            match EspMqttClient::new_cb(&url, &conf, move |notification| {
                match notification.payload() {
                    EventPayload::Connected(_) => {
                        if let Ok(mut c) = connected.lock() {
                            *c = true;
                        }
                        Self::push(&events, BusEvent::Connected);
                    }
                    EventPayload::Disconnected => {
                        if let Ok(mut c) = connected.lock() {
                            *c = false;
                        }
                        Self::push(
                            &events,
                            BusEvent::Disconnected(DisconnectReason::TcpDisconnected),
                        );
                    }
                    EventPayload::Received { topic, data, .. } => {
                        if let Some(topic) = topic {
                            Self::push(
                                &events,
                                BusEvent::Message(BusMessage::copy_from(topic, data)),
                            );
                        }
                    }
                    EventPayload::Error(_) => {
                        Self::push(&events, BusEvent::Disconnected(DisconnectReason::Unknown));
                    }
                    _ => {}
                }
            }) {
                Ok(client) => self.client = Some(client),
                Err(e) => {
                    warn!("mqtt client init failed: {e}");
                    Self::push(
                        &self.events,
                        BusEvent::Disconnected(DisconnectReason::Unknown),
                    );
                }
            }
        }

        fn is_connected(&self) -> bool {
            self.connected.lock().map(|c| *c).unwrap_or(false)
        }

        fn subscribe(&mut self, topic: &str) {
            if let Some(client) = self.client.as_mut() {
                if let Err(e) = client.subscribe(topic, QoS::AtLeastOnce) {
                    warn!("subscribe '{topic}' failed: {e}");
                }
            }
        }

        fn publish(&mut self, topic: &str, payload: &str, retained: bool) -> Result<(), BusError> {
            let client = self.client.as_mut().ok_or(BusError::NotConnected)?;
            client
                .publish(topic, QoS::AtLeastOnce, retained, payload.as_bytes())
                .map(|_| ())
                .map_err(|_| BusError::PublishFailed)
        }

        fn poll(&mut self) -> Option<BusEvent> {
            self.events.lock().ok()?.pop_front()
        }
    }
}
