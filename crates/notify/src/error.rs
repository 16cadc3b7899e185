//! Notification error types.

use thiserror::Error;

/// Errors a subscriber may report back to the hub.
///
/// These never propagate to the publisher; the hub logs them and moves on
/// to the next subscriber.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// The subscriber failed to handle the change.
    #[error("Subscriber failed: {0}")]
    Subscriber(String),
}
