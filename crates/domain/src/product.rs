//! Honey products and stock.

use common::{ApiaryId, HiveId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// A honey product offered for sale.
///
/// `quantity` is the authoritative stock count. It is unsigned, so stock can
/// never be negative; checkout and cancellation adjust it through
/// [`HoneyProduct::take_stock`] and [`HoneyProduct::restore_stock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoneyProduct {
    id: ProductId,
    apiary_id: ApiaryId,
    hive_id: Option<HiveId>,
    pub name: String,
    pub description: String,
    pub price: Money,
    quantity: u32,
}

impl HoneyProduct {
    /// Creates a new product. The name must be non-empty and the price
    /// non-negative.
    pub fn new(
        apiary_id: ApiaryId,
        hive_id: Option<HiveId>,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        quantity: u32,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name must not be empty"));
        }
        if price.is_negative() {
            return Err(DomainError::validation("product price must not be negative"));
        }
        Ok(Self {
            id: ProductId::new(),
            apiary_id,
            hive_id,
            name,
            description: description.into(),
            price,
            quantity,
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn apiary_id(&self) -> ApiaryId {
        self.apiary_id
    }

    pub fn hive_id(&self) -> Option<HiveId> {
        self.hive_id
    }

    /// Current stock count.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns true if at least `requested` units are in stock.
    pub fn has_stock(&self, requested: u32) -> bool {
        self.quantity >= requested
    }

    /// Removes `requested` units from stock. Fails without mutating if the
    /// stock would go negative.
    pub fn take_stock(&mut self, requested: u32) -> Result<(), DomainError> {
        match self.quantity.checked_sub(requested) {
            Some(remaining) => {
                self.quantity = remaining;
                Ok(())
            }
            None => Err(DomainError::validation(format!(
                "insufficient stock: requested {requested}, available {}",
                self.quantity
            ))),
        }
    }

    /// Returns `units` to stock (the inverse of [`HoneyProduct::take_stock`]).
    pub fn restore_stock(&mut self, units: u32) {
        self.quantity = self.quantity.saturating_add(units);
    }

    /// Administrative stock correction.
    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}
