//! In-memory repository implementations.
//!
//! Rows are kept in insertion order so iteration is stable across calls.
//! Each repository carries a fault-injection switch so tests can exercise
//! the degraded paths of the service layer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{ApiaryId, CartItemId, HiveId, OrderId, ProductId, UserId};
use domain::{Apiary, CartItem, Hive, HoneyProduct, Order, User};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::repository::{
    ApiaryRepository, CartItemRepository, HiveRepository, OrderRepository, ProductRepository,
    UserRepository,
};

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

macro_rules! memory_repository {
    ($(#[$doc:meta])* $name:ident, $entity:ty) => {
        $(#[$doc])*
        #[derive(Clone, Default)]
        pub struct $name {
            rows: Arc<RwLock<Vec<$entity>>>,
            fail: Arc<AtomicBool>,
        }

        impl $name {
            /// Creates a new empty repository.
            pub fn new() -> Self {
                Self::default()
            }

            /// Makes every subsequent operation fail with a backend error
            /// until switched off again.
            pub fn set_fail(&self, fail: bool) {
                self.fail.store(fail, Ordering::SeqCst);
            }

            fn check(&self) -> Result<()> {
                if self.fail.load(Ordering::SeqCst) {
                    Err(StoreError::Backend("injected failure".to_string()))
                } else {
                    Ok(())
                }
            }

            /// Returns the number of stored rows.
            pub async fn len(&self) -> usize {
                self.rows.read().await.len()
            }

            /// Returns true if the repository holds no rows.
            pub async fn is_empty(&self) -> bool {
                self.rows.read().await.is_empty()
            }
        }
    };
}

memory_repository! {
    /// In-memory user store.
    InMemoryUserRepository, User
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.check()?;
        Ok(self.rows.read().await.iter().find(|u| u.id() == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|u| u.username() == username)
            .cloned())
    }

    async fn save(&self, user: User) -> Result<()> {
        self.check()?;
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|u| u.id() == user.id()) {
            Some(slot) => *slot = user,
            None => rows.push(user),
        }
        Ok(())
    }
}

memory_repository! {
    /// In-memory apiary store.
    InMemoryApiaryRepository, Apiary
}

#[async_trait]
impl ApiaryRepository for InMemoryApiaryRepository {
    async fn find_by_id(&self, id: ApiaryId) -> Result<Option<Apiary>> {
        self.check()?;
        Ok(self.rows.read().await.iter().find(|a| a.id() == id).cloned())
    }

    async fn find_by_owner(&self, owner: UserId) -> Result<Vec<Apiary>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|a| a.owner() == owner)
            .cloned()
            .collect())
    }

    async fn find_by_name_containing(&self, fragment: &str) -> Result<Vec<Apiary>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|a| contains_ignore_case(&a.name, fragment))
            .cloned()
            .collect())
    }

    async fn find_by_location_containing(&self, fragment: &str) -> Result<Vec<Apiary>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|a| contains_ignore_case(&a.location, fragment))
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Apiary>> {
        self.check()?;
        Ok(self.rows.read().await.clone())
    }

    async fn save(&self, apiary: Apiary) -> Result<()> {
        self.check()?;
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|a| a.id() == apiary.id()) {
            Some(slot) => *slot = apiary,
            None => rows.push(apiary),
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: ApiaryId) -> Result<()> {
        self.check()?;
        self.rows.write().await.retain(|a| a.id() != id);
        Ok(())
    }
}

memory_repository! {
    /// In-memory hive store.
    InMemoryHiveRepository, Hive
}

#[async_trait]
impl HiveRepository for InMemoryHiveRepository {
    async fn find_by_id(&self, id: HiveId) -> Result<Option<Hive>> {
        self.check()?;
        Ok(self.rows.read().await.iter().find(|h| h.id() == id).cloned())
    }

    async fn find_by_apiary(&self, apiary_id: ApiaryId) -> Result<Vec<Hive>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|h| h.apiary_id() == apiary_id)
            .cloned()
            .collect())
    }

    async fn save(&self, hive: Hive) -> Result<()> {
        self.check()?;
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|h| h.id() == hive.id()) {
            Some(slot) => *slot = hive,
            None => rows.push(hive),
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: HiveId) -> Result<()> {
        self.check()?;
        self.rows.write().await.retain(|h| h.id() != id);
        Ok(())
    }
}

memory_repository! {
    /// In-memory product store.
    InMemoryProductRepository, HoneyProduct
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<HoneyProduct>> {
        self.check()?;
        Ok(self.rows.read().await.iter().find(|p| p.id() == id).cloned())
    }

    async fn find_by_apiary(&self, apiary_id: ApiaryId) -> Result<Vec<HoneyProduct>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|p| p.apiary_id() == apiary_id)
            .cloned()
            .collect())
    }

    async fn find_by_hive(&self, hive_id: HiveId) -> Result<Vec<HoneyProduct>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|p| p.hive_id() == Some(hive_id))
            .cloned()
            .collect())
    }

    async fn find_by_name_containing(&self, fragment: &str) -> Result<Vec<HoneyProduct>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|p| contains_ignore_case(&p.name, fragment))
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<HoneyProduct>> {
        self.check()?;
        Ok(self.rows.read().await.clone())
    }

    async fn save(&self, product: HoneyProduct) -> Result<()> {
        self.check()?;
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|p| p.id() == product.id()) {
            Some(slot) => *slot = product,
            None => rows.push(product),
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: ProductId) -> Result<()> {
        self.check()?;
        self.rows.write().await.retain(|p| p.id() != id);
        Ok(())
    }
}

memory_repository! {
    /// In-memory cart line store.
    InMemoryCartItemRepository, CartItem
}

#[async_trait]
impl CartItemRepository for InMemoryCartItemRepository {
    async fn find_by_id(&self, id: CartItemId) -> Result<Option<CartItem>> {
        self.check()?;
        Ok(self.rows.read().await.iter().find(|c| c.id() == id).cloned())
    }

    async fn find_by_client(&self, client_id: UserId) -> Result<Vec<CartItem>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|c| c.client_id() == client_id)
            .cloned()
            .collect())
    }

    async fn find_by_client_and_product(
        &self,
        client_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|c| c.client_id() == client_id && c.product_id() == product_id)
            .cloned())
    }

    async fn save(&self, item: CartItem) -> Result<()> {
        self.check()?;
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|c| c.id() == item.id()) {
            Some(slot) => *slot = item,
            None => rows.push(item),
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: CartItemId) -> Result<()> {
        self.check()?;
        self.rows.write().await.retain(|c| c.id() != id);
        Ok(())
    }
}

memory_repository! {
    /// In-memory order store.
    InMemoryOrderRepository, Order
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        self.check()?;
        Ok(self.rows.read().await.iter().find(|o| o.id() == id).cloned())
    }

    async fn find_by_client(&self, client_id: UserId) -> Result<Vec<Order>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|o| o.client_id() == client_id)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Order>> {
        self.check()?;
        Ok(self.rows.read().await.clone())
    }

    async fn save(&self, order: Order) -> Result<()> {
        self.check()?;
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|o| o.id() == order.id()) {
            Some(slot) => *slot = order,
            None => rows.push(order),
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: OrderId) -> Result<()> {
        self.check()?;
        self.rows.write().await.retain(|o| o.id() != id);
        Ok(())
    }
}
