//! The publish/subscribe hub.

use std::sync::{Arc, RwLock};

use crate::error::NotifyError;
use crate::event::EntityChange;

/// A component interested in entity changes.
///
/// Delivery happens on the publisher's call stack; a subscriber that needs
/// non-blocking behavior must hand the event off to its own queue or task.
pub trait Subscriber: Send + Sync {
    /// A short name used in log lines when delivery fails.
    fn name(&self) -> &str;

    /// Handles one entity change.
    fn on_entity_change(&self, event: &EntityChange) -> Result<(), NotifyError>;
}

/// Fans entity changes out to registered subscribers.
///
/// Subscribers receive events in subscription order, synchronously, before
/// `publish` returns. A subscriber that fails is logged and skipped for that
/// event; it stays registered and delivery continues with the rest.
#[derive(Default)]
pub struct EventHub {
    subscribers: RwLock<Vec<Arc<dyn Subscriber>>>,
}

impl EventHub {
    /// Creates a hub with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber. Returns false (and keeps the existing
    /// registration) if this exact subscriber is already registered.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> bool {
        let mut subs = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if subs.iter().any(|s| Arc::ptr_eq(s, &subscriber)) {
            return false;
        }
        subs.push(subscriber);
        true
    }

    /// Removes a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&self, subscriber: &Arc<dyn Subscriber>) -> bool {
        let mut subs = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = subs.len();
        subs.retain(|s| !Arc::ptr_eq(s, subscriber));
        subs.len() != before
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Delivers `event` to every registered subscriber before returning.
    pub fn publish(&self, event: &EntityChange) {
        // Snapshot the registration list so a subscriber may subscribe or
        // unsubscribe from within its callback without deadlocking.
        let subs: Vec<Arc<dyn Subscriber>> = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        metrics::counter!(
            "hub_events_published",
            "entity" => event.entity_kind(),
            "kind" => event.kind().as_str()
        )
        .increment(1);

        for subscriber in subs {
            if let Err(e) = subscriber.on_entity_change(event) {
                metrics::counter!("hub_delivery_failures").increment(1);
                tracing::warn!(
                    subscriber = subscriber.name(),
                    entity = event.entity_kind(),
                    kind = %event.kind(),
                    error = %e,
                    "subscriber failed to handle change event"
                );
            }
        }
    }
}
