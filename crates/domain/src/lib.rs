//! Domain layer for the honey marketplace.
//!
//! This crate provides the core domain entities and their invariants:
//! - User accounts with beekeeper/client roles
//! - Apiaries, hives and honey products with exclusive ownership
//! - Shopping cart lines (transient, per client)
//! - Orders with an immutable item list and a status state machine
//! - Fixed-point money arithmetic

pub mod apiary;
pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod product;
pub mod user;

pub use apiary::{Apiary, Hive};
pub use cart::CartItem;
pub use error::DomainError;
pub use money::Money;
pub use order::{Order, OrderItem, OrderStatus};
pub use product::HoneyProduct;
pub use user::{Profile, User, UserRole};
