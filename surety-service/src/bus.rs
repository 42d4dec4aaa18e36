//! In-process event bus
//!
//! Protocol events are wrapped in an envelope and fanned out over a
//! broadcast channel. Subscribers that fall behind lose the oldest
//! envelopes; the engine is never blocked on a slow consumer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surety_core::ProtocolEvent;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Envelope ID (UUIDv7 for ordering)
    pub id: Uuid,

    /// Event kind, e.g. `flight.resolved`
    pub kind: String,

    /// Publication timestamp
    pub timestamp: DateTime<Utc>,

    /// The protocol event
    pub event: ProtocolEvent,
}

impl Envelope {
    /// Wrap a protocol event
    pub fn new(event: ProtocolEvent) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind: event.kind().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}

/// Broadcast fan-out for protocol events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Envelope>,
}

impl EventBus {
    /// Create a bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event; returns the number of current subscribers
    pub fn publish(&self, event: ProtocolEvent) -> usize {
        let envelope = Envelope::new(event);
        tracing::debug!(kind = %envelope.kind, id = %envelope.id, "Publishing event");
        // Err only means no subscribers, which is fine
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
