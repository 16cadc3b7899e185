//! Entity change events.

use domain::{Apiary, CartItem, Hive, HoneyProduct, Order};
use serde::{Deserialize, Serialize};

/// The kind of transition a change event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "Created",
            ChangeKind::Updated => "Updated",
            ChangeKind::Deleted => "Deleted",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single entity transition carrying the affected snapshots.
///
/// `Updated` carries both the old and the new snapshot so subscribers can
/// diff without a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Change<T> {
    Created(T),
    Updated { old: T, new: T },
    Deleted(T),
}

impl<T> Change<T> {
    /// Returns the kind of this change.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Created(_) => ChangeKind::Created,
            Change::Updated { .. } => ChangeKind::Updated,
            Change::Deleted(_) => ChangeKind::Deleted,
        }
    }

    /// Returns the current snapshot (the new value for updates, the deleted
    /// value for deletions).
    pub fn value(&self) -> &T {
        match self {
            Change::Created(v) | Change::Deleted(v) => v,
            Change::Updated { new, .. } => new,
        }
    }

    /// Returns the previous snapshot, present only for updates.
    pub fn previous(&self) -> Option<&T> {
        match self {
            Change::Updated { old, .. } => Some(old),
            _ => None,
        }
    }
}

/// A change to one of the marketplace entities.
///
/// A closed union rather than a type-tag string, so subscribers handle every
/// entity kind exhaustively at compile time. No ordering is guaranteed
/// between different entity kinds, only within one hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityChange {
    Apiary(Change<Apiary>),
    Hive(Change<Hive>),
    Product(Change<HoneyProduct>),
    CartItem(Change<CartItem>),
    Order(Change<Order>),
}

impl EntityChange {
    /// Returns the kind of the wrapped change.
    pub fn kind(&self) -> ChangeKind {
        match self {
            EntityChange::Apiary(c) => c.kind(),
            EntityChange::Hive(c) => c.kind(),
            EntityChange::Product(c) => c.kind(),
            EntityChange::CartItem(c) => c.kind(),
            EntityChange::Order(c) => c.kind(),
        }
    }

    /// Returns the entity kind name, used for logging and metrics labels.
    pub fn entity_kind(&self) -> &'static str {
        match self {
            EntityChange::Apiary(_) => "Apiary",
            EntityChange::Hive(_) => "Hive",
            EntityChange::Product(_) => "Product",
            EntityChange::CartItem(_) => "CartItem",
            EntityChange::Order(_) => "Order",
        }
    }
}
