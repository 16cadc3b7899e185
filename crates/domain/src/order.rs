//! Orders, order items and the order status state machine.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──► Paid ──► Delivered
///    │
///    └──► Canceled
/// ```
/// Paid and Delivered orders can no longer be canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Placed, awaiting payment.
    #[default]
    Pending,

    /// Payment received, awaiting delivery.
    Paid,

    /// Handed over to the client (terminal state).
    Delivered,

    /// Canceled by the client while still pending (terminal state).
    Canceled,
}

impl OrderStatus {
    /// Returns true if the order can be canceled from this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be marked paid from this status.
    pub fn can_mark_paid(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be marked delivered from this status.
    pub fn can_mark_delivered(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }

    /// Returns true if `to` is a permitted next status.
    pub fn allows(&self, to: OrderStatus) -> bool {
        match to {
            OrderStatus::Paid => self.can_mark_paid(),
            OrderStatus::Delivered => self.can_mark_delivered(),
            OrderStatus::Canceled => self.can_cancel(),
            OrderStatus::Pending => false,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Paid => "Paid",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of an order.
///
/// Captures the product's name and unit price at checkout time; later price
/// changes on the product do not touch existing orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderItem {
    /// Creates a new order line.
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            unit_price,
            quantity,
        }
    }

    /// Returns the line total (unit price × quantity).
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A placed order.
///
/// The item list is fixed at creation; only the status moves, and only along
/// the transitions [`OrderStatus`] allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    client_id: UserId,
    ordered_at: DateTime<Utc>,
    items: Vec<OrderItem>,
    status: OrderStatus,
    total: Money,
}

impl Order {
    /// Creates a pending order from a non-empty list of items. The total is
    /// computed from the captured line prices.
    pub fn new(client_id: UserId, items: Vec<OrderItem>) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        let total = items.iter().map(OrderItem::line_total).sum();
        Ok(Self {
            id: OrderId::new(),
            client_id,
            ordered_at: Utc::now(),
            items,
            status: OrderStatus::Pending,
            total,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn client_id(&self) -> UserId {
        self.client_id
    }

    pub fn ordered_at(&self) -> DateTime<Utc> {
        self.ordered_at
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// Moves the order to `to`, or fails if the state machine forbids it.
    pub fn transition(&mut self, to: OrderStatus) -> Result<(), DomainError> {
        if !self.status.allows(to) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
