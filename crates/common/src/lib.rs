//! Shared types for the honey marketplace service layer.

mod types;

pub use types::{ApiaryId, CartItemId, HiveId, OrderId, ProductId, UserId};
