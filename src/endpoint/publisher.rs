//! One-to-many event delivery for endpoints.

use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;

use crate::common::EndpointEvent;

/// Fans endpoint events out to every live subscriber.
///
/// Publishing never blocks: each subscriber has its own unbounded channel,
/// so a network read loop can publish inline.
#[derive(Debug, Default)]
pub struct EventPublisher {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<EndpointEvent>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<EndpointEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Deliver an event to all subscribers, dropping closed ones.
    pub fn publish(&self, event: EndpointEvent) {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if subscribers.is_empty() {
            debug!("No subscribers for endpoint event: {:?}", event);
        }
    }

    /// Number of live subscribers.
    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<EndpointEvent>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Message, PresenceEvent};

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let publisher = EventPublisher::new();
        let mut first = publisher.subscribe();
        let mut second = publisher.subscribe();

        let event = EndpointEvent::MessagePosted(Message::from_user("bob", "hi"));
        publisher.publish(event.clone());

        assert_eq!(first.try_recv().unwrap(), event);
        assert_eq!(second.try_recv().unwrap(), event);
    }

    #[test]
    fn test_closed_subscribers_are_pruned() {
        let publisher = EventPublisher::new();
        let dropped = publisher.subscribe();
        let mut kept = publisher.subscribe();
        drop(dropped);

        publisher.publish(EndpointEvent::PresenceChanged(PresenceEvent::new("x has joined IRC.")));

        assert_eq!(publisher.subscriber_count(), 1);
        assert!(kept.try_recv().is_ok());
    }

    #[test]
    fn test_events_keep_order() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.subscribe();

        for i in 0..5 {
            publisher.publish(EndpointEvent::MessagePosted(Message::anonymous(i.to_string())));
        }

        for i in 0..5 {
            let expected = EndpointEvent::MessagePosted(Message::anonymous(i.to_string()));
            assert_eq!(rx.try_recv().unwrap(), expected);
        }
    }
}
