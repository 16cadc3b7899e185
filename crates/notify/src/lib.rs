//! Change-notification hub for the honey marketplace.
//!
//! Services publish an [`EntityChange`] for every entity mutation; any
//! number of subscribers receive the change synchronously, in subscription
//! order, without polling. Delivery is at-least-once with no retry: a
//! failing subscriber is logged and skipped, never allowed to block the
//! remaining subscribers or the publisher.

pub mod error;
pub mod event;
pub mod hub;
pub mod recording;

pub use error::NotifyError;
pub use event::{Change, ChangeKind, EntityChange};
pub use hub::{EventHub, Subscriber};
pub use recording::RecordingSubscriber;
