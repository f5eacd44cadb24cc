//! Message transport boundary.
//!
//! Uses `embassy-sync` bounded MPMC channels to bridge the broker client
//! (MQTT callback thread on ESP-IDF) with the cooperative unit tasks.
//!
//! ```text
//! ┌──────────────┐  incoming   ┌──────────────┐
//! │  Transport   │────────────▶│  UnitService │
//! │  (MQTT)      │◀────────────│  (async)     │
//! └──────────────┘  outgoing   └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::error::Error;

/// Longest topic a [`Message`] can carry.
pub const TOPIC_CAPACITY: usize = 64;

/// Channel depth for outbound (status / error) messages.
pub const OUTGOING_DEPTH: usize = 8;

/// Channel depth for inbound (control / request) messages.
pub const INCOMING_DEPTH: usize = 8;

pub type Topic = heapless::String<TOPIC_CAPACITY>;

/// A named-topic message envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: Topic,
    pub body: String,
}

impl Message {
    pub fn new(topic: &str, body: impl Into<String>) -> Result<Self, Error> {
        let topic = Topic::try_from(topic).map_err(|_| Error::TopicTooLong)?;
        Ok(Self {
            topic,
            body: body.into(),
        })
    }
}

/// Outgoing and incoming queues shared between the unit and its transport.
///
/// `const`-constructible so the firmware can hold one in a `static` that
/// the MQTT callback thread reaches without an allocation.
pub struct MessageQueues {
    /// Unit → transport.
    pub outgoing: Channel<CriticalSectionRawMutex, Message, OUTGOING_DEPTH>,
    /// Transport → unit.
    pub incoming: Channel<CriticalSectionRawMutex, Message, INCOMING_DEPTH>,
}

impl MessageQueues {
    pub const fn new() -> Self {
        Self {
            outgoing: Channel::new(),
            incoming: Channel::new(),
        }
    }

    /// Hand an inbound message to the unit without blocking the caller.
    /// Returns `false` (and drops the message) when the queue is full.
    pub fn push_incoming(&self, message: Message) -> bool {
        if self.incoming.try_send(message).is_err() {
            log::warn!("Transport: incoming queue full, dropping message");
            return false;
        }
        true
    }

    /// Take the next outbound message if one is pending.
    pub fn try_take_outgoing(&self) -> Option<Message> {
        self.outgoing.try_receive().ok()
    }
}

impl Default for MessageQueues {
    fn default() -> Self {
        Self::new()
    }
}
