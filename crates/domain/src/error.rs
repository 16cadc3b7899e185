//! Domain error types.

use thiserror::Error;

use crate::order::OrderStatus;

/// Errors raised by entity constructors and state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Malformed input rejected by an entity invariant.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A disallowed order status transition.
    #[error("Invalid order status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

impl DomainError {
    /// Shorthand for a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }
}
