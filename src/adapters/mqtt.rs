//! MQTT bridge between the broker and the unit's message queues.
//!
//! ```text
//!  broker ──▶ client callback (MQTT task) ──push_incoming──▶ incoming
//!  broker ◀── publish task (executor)     ◀──receive──────── outgoing
//! ```
//!
//! The callback also drives the connectivity session flag.  Subscriptions
//! are (re)issued by the publish task after every connect, since the
//! client handle cannot be used from inside its own callback.
//!
//! Delivery is QoS 0: a document that cannot be published is logged and
//! dropped.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::connectivity::ConnectivityState;
use crate::transport::{Message, MessageQueues};

#[cfg(target_os = "espidf")]
use core::time::Duration;

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};

#[cfg(target_os = "espidf")]
use crate::config::TopicConfig;

/// Broker events the bridge reacts to, independent of the client library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerEvent<'a> {
    Connected,
    Disconnected,
    Received { topic: &'a str, data: &'a [u8] },
}

/// Shared between the client callback and the publish task.
#[derive(Clone)]
pub struct SessionTracker {
    queues: &'static MessageQueues,
    connectivity: ConnectivityState,
    resubscribe: Arc<AtomicBool>,
}

impl SessionTracker {
    pub fn new(queues: &'static MessageQueues, connectivity: ConnectivityState) -> Self {
        Self {
            queues,
            connectivity,
            resubscribe: Arc::default(),
        }
    }

    /// Apply one broker event.  Runs on the client's callback thread.
    pub fn on_event(&self, event: BrokerEvent<'_>) {
        match event {
            BrokerEvent::Connected => {
                info!("MQTT: session up");
                self.connectivity.set_session_up(true);
                self.resubscribe.store(true, Ordering::Release);
            }
            BrokerEvent::Disconnected => {
                warn!("MQTT: session down");
                self.connectivity.set_session_up(false);
            }
            BrokerEvent::Received { topic, data } => {
                let Ok(body) = core::str::from_utf8(data) else {
                    warn!("MQTT: dropping non-UTF-8 payload on '{}'", topic);
                    return;
                };
                match Message::new(topic, body) {
                    Ok(message) => {
                        self.queues.push_incoming(message);
                    }
                    Err(e) => warn!("MQTT: dropping message on '{}': {}", topic, e),
                }
            }
        }
    }

    /// `true` once per connect.
    pub fn take_resubscribe(&self) -> bool {
        self.resubscribe.swap(false, Ordering::AcqRel)
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

/// How long the publish task waits for outbound traffic before it checks
/// for a pending resubscription.
#[cfg(target_os = "espidf")]
const IDLE_TICK: Duration = Duration::from_millis(200);

#[cfg(target_os = "espidf")]
pub struct MqttBridge {
    client: EspMqttClient<'static>,
    tracker: SessionTracker,
    subscriptions: [String; 2],
}

#[cfg(target_os = "espidf")]
impl MqttBridge {
    pub fn connect(
        broker_url: &str,
        client_id: &str,
        topics: &TopicConfig,
        tracker: SessionTracker,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };
        let callback_tracker = tracker.clone();
        let client = EspMqttClient::new_cb(broker_url, &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => callback_tracker.on_event(BrokerEvent::Connected),
                EventPayload::Disconnected => {
                    callback_tracker.on_event(BrokerEvent::Disconnected);
                }
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => callback_tracker.on_event(BrokerEvent::Received { topic, data }),
                EventPayload::Error(e) => warn!("MQTT: client error: {:?}", e),
                _ => {}
            }
        })?;
        info!("MQTT: client '{}' connecting to {}", client_id, broker_url);
        Ok(Self {
            client,
            tracker,
            subscriptions: [topics.control.clone(), topics.status_request.clone()],
        })
    }

    /// Publish outbound messages forever.
    pub async fn run(&mut self) {
        let queues = self.tracker.queues;
        loop {
            if self.tracker.take_resubscribe() {
                self.subscribe();
            }
            let next = futures_lite::future::or(async { Some(queues.outgoing.receive().await) }, async {
                async_io_mini::Timer::after(IDLE_TICK).await;
                None
            })
            .await;
            if let Some(message) = next {
                self.publish(&message);
            }
        }
    }

    fn subscribe(&mut self) {
        for topic in &self.subscriptions {
            match self.client.subscribe(topic, QoS::AtMostOnce) {
                Ok(_) => info!("MQTT: subscribed to '{}'", topic),
                Err(e) => warn!("MQTT: subscribe to '{}' failed: {}", topic, e),
            }
        }
    }

    fn publish(&mut self, message: &Message) {
        if let Err(e) = self.client.enqueue(
            &message.topic,
            QoS::AtMostOnce,
            false,
            message.body.as_bytes(),
        ) {
            warn!("MQTT: publish to '{}' failed: {}", message.topic, e);
        }
    }
}
