//! Repository traits, one per entity.
//!
//! All implementations must be thread-safe (`Send + Sync`). `save` is
//! insert-or-update keyed by the entity id. Timeout and retry policy belong
//! to the implementation, not to callers.

use async_trait::async_trait;
use common::{ApiaryId, CartItemId, HiveId, OrderId, ProductId, UserId};
use domain::{Apiary, CartItem, Hive, HoneyProduct, Order, User};

use crate::Result;

/// Storage for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn save(&self, user: User) -> Result<()>;
}

/// Storage for apiaries.
#[async_trait]
pub trait ApiaryRepository: Send + Sync {
    async fn find_by_id(&self, id: ApiaryId) -> Result<Option<Apiary>>;
    async fn find_by_owner(&self, owner: UserId) -> Result<Vec<Apiary>>;
    async fn find_by_name_containing(&self, fragment: &str) -> Result<Vec<Apiary>>;
    async fn find_by_location_containing(&self, fragment: &str) -> Result<Vec<Apiary>>;
    async fn find_all(&self) -> Result<Vec<Apiary>>;
    async fn save(&self, apiary: Apiary) -> Result<()>;
    async fn delete_by_id(&self, id: ApiaryId) -> Result<()>;
}

/// Storage for hives.
#[async_trait]
pub trait HiveRepository: Send + Sync {
    async fn find_by_id(&self, id: HiveId) -> Result<Option<Hive>>;
    async fn find_by_apiary(&self, apiary_id: ApiaryId) -> Result<Vec<Hive>>;
    async fn save(&self, hive: Hive) -> Result<()>;
    async fn delete_by_id(&self, id: HiveId) -> Result<()>;
}

/// Storage for honey products.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<HoneyProduct>>;
    async fn find_by_apiary(&self, apiary_id: ApiaryId) -> Result<Vec<HoneyProduct>>;
    async fn find_by_hive(&self, hive_id: HiveId) -> Result<Vec<HoneyProduct>>;
    async fn find_by_name_containing(&self, fragment: &str) -> Result<Vec<HoneyProduct>>;
    async fn find_all(&self) -> Result<Vec<HoneyProduct>>;
    async fn save(&self, product: HoneyProduct) -> Result<()>;
    async fn delete_by_id(&self, id: ProductId) -> Result<()>;
}

/// Storage for shopping cart lines.
///
/// `find_by_client` must return lines in a stable order across calls while
/// the cart is unchanged (insertion order for the in-memory store).
#[async_trait]
pub trait CartItemRepository: Send + Sync {
    async fn find_by_id(&self, id: CartItemId) -> Result<Option<CartItem>>;
    async fn find_by_client(&self, client_id: UserId) -> Result<Vec<CartItem>>;
    async fn find_by_client_and_product(
        &self,
        client_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>>;
    async fn save(&self, item: CartItem) -> Result<()>;
    async fn delete_by_id(&self, id: CartItemId) -> Result<()>;
}

/// Storage for orders. Orders are never deleted, only their status moves.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>>;
    async fn find_by_client(&self, client_id: UserId) -> Result<Vec<Order>>;
    async fn find_all(&self) -> Result<Vec<Order>>;
    async fn save(&self, order: Order) -> Result<()>;
    async fn delete_by_id(&self, id: OrderId) -> Result<()>;
}
