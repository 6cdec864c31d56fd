// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal typed event bus.
//!
//! One [`EventBus`] is shared by everything in the process that caches
//! profile-scoped state. Publishing never blocks and never fails: events
//! sent while nobody listens are dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 256;

/// Events broadcast across the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// The current profile pointer moved. Subscribers holding profile-scoped
    /// state must discard it and reload for `current`.
    ProfileChanged {
        previous: Option<String>,
        current: String,
    },

    /// An activity event was persisted.
    ActivityUpdated { kind: String },
}

impl BusEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            BusEvent::ProfileChanged { .. } => "profile_changed",
            BusEvent::ActivityUpdated { .. } => "activity_updated",
        }
    }
}

/// Broadcast bus for [`BusEvent`]s.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
    published: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    /// A bus whose subscribers lag after `capacity` unread events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: BusEvent) {
        self.published.fetch_add(1, Ordering::Relaxed);
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(receivers) => debug!(event_type, receivers, "bus event published"),
            Err(_) => debug!(event_type, "no subscribers for bus event"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total events published since creation.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_profile_changes() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(BusEvent::ProfileChanged {
            previous: None,
            current: "p1".into(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            BusEvent::ProfileChanged {
                previous: None,
                current: "p1".into()
            }
        );
    }

    #[tokio::test]
    async fn every_subscriber_gets_its_own_copy() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(BusEvent::ActivityUpdated {
            kind: "srs.add".into(),
        });

        assert_eq!(a.recv().await.unwrap().event_type(), "activity_updated");
        assert_eq!(b.recv().await.unwrap().event_type(), "activity_updated");
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::new();
        bus.publish(BusEvent::ActivityUpdated {
            kind: "audio.play".into(),
        });
        assert_eq!(bus.published_count(), 1);
    }

    #[test]
    fn bus_events_serialize_with_type_tag() {
        let json = serde_json::to_value(BusEvent::ProfileChanged {
            previous: Some("a".into()),
            current: "b".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "profile_changed");
        assert_eq!(json["current"], "b");
    }
}
