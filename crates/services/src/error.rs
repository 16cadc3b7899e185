//! Service error types.

use common::ProductId;
use domain::{DomainError, OrderStatus};
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by service operations.
///
/// `NotFound` and `Ownership` are deliberately distinct variants: a caller
/// that wants to hide ownership failures behind "not found" can collapse the
/// two arms itself, but the service contract keeps them apart.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The referenced id has no backing record.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The acting user does not own or control the target entity.
    #[error("Actor does not own the target entity")]
    Ownership,

    /// Malformed input (empty name, non-positive quantity, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Checkout requested more units than are in stock.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Checkout attempted with an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// A disallowed order status transition was attempted.
    #[error("Cannot {action} an order in status {from}")]
    InvalidStateTransition {
        from: OrderStatus,
        action: &'static str,
    },

    /// Unknown username or wrong password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Registration attempted with a username that is already taken.
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// Password hashing failed.
    #[error("Password hashing failed")]
    PasswordHash,

    /// Underlying storage failure. Details are logged where the fault is
    /// observed; callers get one uniform failure signal.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<DomainError> for ServiceError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidTransition { from, to } => ServiceError::InvalidStateTransition {
                from,
                action: match to {
                    OrderStatus::Paid => "mark paid",
                    OrderStatus::Delivered => "mark delivered",
                    OrderStatus::Canceled => "cancel",
                    OrderStatus::Pending => "reopen",
                },
            },
        }
    }
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;
