//! Persistence boundary for the honey marketplace.
//!
//! The service layer reaches storage only through the repository traits in
//! this crate. Absence is an explicit `Ok(None)`; storage faults surface as
//! [`StoreError`]. The in-memory implementations back the test suites and
//! support fault injection.

pub mod error;
pub mod memory;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::{
    InMemoryApiaryRepository, InMemoryCartItemRepository, InMemoryHiveRepository,
    InMemoryOrderRepository, InMemoryProductRepository, InMemoryUserRepository,
};
pub use repository::{
    ApiaryRepository, CartItemRepository, HiveRepository, OrderRepository, ProductRepository,
    UserRepository,
};
