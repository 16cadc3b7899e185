//! Shopping cart lines.

use common::{CartItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// One line of a client's shopping cart.
///
/// Cart lines are transient: they exist only between "add to cart" and
/// checkout or removal, and are never kept as a sale record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    id: CartItemId,
    client_id: UserId,
    product_id: ProductId,
    quantity: u32,
}

impl CartItem {
    /// Creates a cart line. Quantity must be at least 1.
    pub fn new(client_id: UserId, product_id: ProductId, quantity: u32) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::validation("cart quantity must be at least 1"));
        }
        Ok(Self {
            id: CartItemId::new(),
            client_id,
            product_id,
            quantity,
        })
    }

    pub fn id(&self) -> CartItemId {
        self.id
    }

    pub fn client_id(&self) -> UserId {
        self.client_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Adds units to the line (merging a repeated "add to cart").
    pub fn add_quantity(&mut self, more: u32) {
        self.quantity = self.quantity.saturating_add(more);
    }
}
