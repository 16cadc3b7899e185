//! Transactional service layer for the honey marketplace.
//!
//! The services in this crate own the business invariants across apiaries,
//! hives, honey products, shopping carts and orders:
//! - beekeeper ownership checks on every mutation
//! - cascading, dependents-first deletion
//! - the all-or-nothing cart-to-order checkout transaction
//! - the order status state machine and its stock-restoring cancellation
//!
//! Every mutation publishes an [`notify::EntityChange`] through the shared
//! hub. Persistence is reached only through the `store` repository traits.

pub mod apiary;
pub mod cart;
pub mod error;
pub mod hive;
pub mod order;
pub mod product;
pub mod user;

use std::sync::Arc;

use notify::EventHub;
use store::{
    ApiaryRepository, CartItemRepository, HiveRepository, OrderRepository, ProductRepository,
    UserRepository,
};
use tokio::sync::Mutex;

pub use apiary::ApiaryService;
pub use cart::CartService;
pub use error::{Result, ServiceError};
pub use hive::HiveService;
pub use order::OrderService;
pub use product::ProductService;
pub use user::UserService;

/// The fully wired service layer.
///
/// Constructed once at process start with every repository passed in
/// explicitly; there is no global registry. All services share one
/// notification hub, and the cart and order services share one stock lock
/// so checkout and cancellation serialize their stock adjustments.
pub struct Services {
    pub hub: Arc<EventHub>,
    pub users: UserService,
    pub apiaries: ApiaryService,
    pub hives: HiveService,
    pub products: ProductService,
    pub carts: CartService,
    pub orders: OrderService,
}

impl Services {
    /// Wires the service layer over the given repositories.
    pub fn new(
        users: Arc<dyn UserRepository>,
        apiaries: Arc<dyn ApiaryRepository>,
        hives: Arc<dyn HiveRepository>,
        products: Arc<dyn ProductRepository>,
        cart_items: Arc<dyn CartItemRepository>,
        orders: Arc<dyn OrderRepository>,
    ) -> Self {
        let hub = Arc::new(EventHub::new());
        let stock_lock = Arc::new(Mutex::new(()));

        Self {
            users: UserService::new(users),
            apiaries: ApiaryService::new(
                apiaries.clone(),
                hives.clone(),
                products.clone(),
                hub.clone(),
            ),
            hives: HiveService::new(
                hives.clone(),
                apiaries.clone(),
                products.clone(),
                hub.clone(),
            ),
            products: ProductService::new(
                products.clone(),
                apiaries.clone(),
                hives,
                hub.clone(),
            ),
            carts: CartService::new(
                cart_items,
                products.clone(),
                orders.clone(),
                hub.clone(),
                stock_lock.clone(),
            ),
            orders: OrderService::new(orders, products, apiaries, hub.clone(), stock_lock),
            hub,
        }
    }
}
