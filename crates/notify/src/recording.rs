//! A subscriber that records every delivered event, for tests.

use std::sync::Mutex;

use crate::error::NotifyError;
use crate::event::{ChangeKind, EntityChange};
use crate::hub::Subscriber;

/// Captures delivered events in order so tests can assert on the stream.
#[derive(Default)]
pub struct RecordingSubscriber {
    events: Mutex<Vec<EntityChange>>,
}

impl RecordingSubscriber {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event delivered so far, oldest first.
    pub fn events(&self) -> Vec<EntityChange> {
        self.events.lock().unwrap().clone()
    }

    /// Returns the number of delivered events.
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Returns the (entity kind, change kind) pairs in delivery order.
    pub fn kinds(&self) -> Vec<(&'static str, ChangeKind)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| (e.entity_kind(), e.kind()))
            .collect()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Subscriber for RecordingSubscriber {
    fn name(&self) -> &str {
        "recording"
    }

    fn on_entity_change(&self, event: &EntityChange) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
