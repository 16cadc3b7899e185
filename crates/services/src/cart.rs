//! Shopping cart operations and the checkout transaction.

use std::collections::HashMap;
use std::sync::Arc;

use common::{CartItemId, ProductId, UserId};
use domain::{CartItem, HoneyProduct, Money, Order, OrderItem};
use notify::{Change, EntityChange, EventHub};
use store::{CartItemRepository, OrderRepository, ProductRepository};
use tokio::sync::Mutex;

use crate::error::{Result, ServiceError};

/// Manages per-client shopping carts and converts them into orders.
///
/// Cart mutations are serialized per client. The checkout validate-decrement
/// sequence runs under the stock lock shared with order cancellation, so two
/// concurrent checkouts can never both pass validation against stale stock.
pub struct CartService {
    cart_items: Arc<dyn CartItemRepository>,
    products: Arc<dyn ProductRepository>,
    orders: Arc<dyn OrderRepository>,
    hub: Arc<EventHub>,
    stock_lock: Arc<Mutex<()>>,
    client_locks: std::sync::Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl CartService {
    /// Creates the service. `stock_lock` must be the same lock handed to the
    /// order service so checkout and cancellation serialize against each
    /// other.
    pub fn new(
        cart_items: Arc<dyn CartItemRepository>,
        products: Arc<dyn ProductRepository>,
        orders: Arc<dyn OrderRepository>,
        hub: Arc<EventHub>,
        stock_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            cart_items,
            products,
            orders,
            hub,
            stock_lock,
            client_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    fn client_lock(&self, client: UserId) -> Arc<Mutex<()>> {
        self.client_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(client)
            .or_default()
            .clone()
    }

    /// Adds `quantity` units of a product to the client's cart, merging into
    /// an existing line for the same product. Rejects a zero quantity and
    /// any request beyond current stock.
    #[tracing::instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        client: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem> {
        let lock = self.client_lock(client);
        let _guard = lock.lock().await;

        if quantity == 0 {
            return Err(ServiceError::Validation(
                "cart quantity must be at least 1".to_string(),
            ));
        }

        let product = self
            .products
            .find_by_id(product_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Product",
                id: product_id.to_string(),
            })?;

        let existing = self
            .cart_items
            .find_by_client_and_product(client, product_id)
            .await?;

        // A merged quantity that overflows u32 can never be in stock.
        let in_cart = existing.as_ref().map_or(0, CartItem::quantity);
        let requested = in_cart.checked_add(quantity).ok_or(ServiceError::InsufficientStock {
            product_id,
            requested: u32::MAX,
            available: product.quantity(),
        })?;
        if !product.has_stock(requested) {
            return Err(ServiceError::InsufficientStock {
                product_id,
                requested,
                available: product.quantity(),
            });
        }

        match existing {
            Some(mut line) => {
                let old = line.clone();
                line.add_quantity(quantity);
                self.cart_items.save(line.clone()).await?;
                self.hub.publish(&EntityChange::CartItem(Change::Updated {
                    old,
                    new: line.clone(),
                }));
                Ok(line)
            }
            None => {
                let line = CartItem::new(client, product_id, quantity)?;
                self.cart_items.save(line.clone()).await?;
                self.hub
                    .publish(&EntityChange::CartItem(Change::Created(line.clone())));
                Ok(line)
            }
        }
    }

    /// Removes one line from the client's cart. Fails with `Ownership` if
    /// the line belongs to a different client.
    #[tracing::instrument(skip(self))]
    pub async fn remove_from_cart(&self, client: UserId, item_id: CartItemId) -> Result<()> {
        let lock = self.client_lock(client);
        let _guard = lock.lock().await;

        let line = self
            .cart_items
            .find_by_id(item_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "CartItem",
                id: item_id.to_string(),
            })?;
        if line.client_id() != client {
            tracing::warn!(%item_id, %client, "cart removal refused: not the line's client");
            return Err(ServiceError::Ownership);
        }

        self.cart_items.delete_by_id(item_id).await?;
        self.hub
            .publish(&EntityChange::CartItem(Change::Deleted(line)));
        Ok(())
    }

    /// The client's cart lines, in stable iteration order. Empty on a
    /// storage fault (logged).
    pub async fn cart_items(&self, client: UserId) -> Vec<CartItem> {
        match self.cart_items.find_by_client(client).await {
            Ok(lines) => lines,
            Err(e) => {
                tracing::error!(%client, error = %e, "cart query failed, returning empty");
                Vec::new()
            }
        }
    }

    /// Sum of line price × quantity over the cart, in fixed-point money.
    /// Lines whose product has vanished are skipped with a warning.
    pub async fn calculate_cart_total(&self, client: UserId) -> Money {
        let mut total = Money::zero();
        for line in self.cart_items(client).await {
            match self.products.find_by_id(line.product_id()).await {
                Ok(Some(product)) => total += product.price.times(line.quantity()),
                Ok(None) => {
                    tracing::warn!(
                        product_id = %line.product_id(),
                        "cart line references a missing product, skipping"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "cart total lookup failed, returning partial total");
                }
            }
        }
        total
    }

    /// Empties the client's cart, publishing one `Deleted` per line.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, client: UserId) -> Result<()> {
        let lock = self.client_lock(client);
        let _guard = lock.lock().await;
        self.clear_cart_locked(client).await
    }

    async fn clear_cart_locked(&self, client: UserId) -> Result<()> {
        for line in self.cart_items.find_by_client(client).await? {
            self.cart_items.delete_by_id(line.id()).await?;
            self.hub
                .publish(&EntityChange::CartItem(Change::Deleted(line)));
        }
        Ok(())
    }

    /// Converts the client's cart into a pending order.
    ///
    /// One logical transaction: every line is re-validated against current
    /// stock under the stock lock, stock is decremented, the order persisted
    /// with prices captured as of now, and the cart cleared. Any failure
    /// after validation rolls the stock decrements and the order record back
    /// before returning — no partial order, no lost inventory.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, client: UserId) -> Result<Order> {
        metrics::counter!("checkout_attempts_total").increment(1);

        let lock = self.client_lock(client);
        let _cart_guard = lock.lock().await;

        let lines = self.cart_items.find_by_client(client).await?;
        if lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let _stock_guard = self.stock_lock.lock().await;

        // Re-validate every line before touching stock; the cart may be
        // older than the latest checkouts.
        let mut loaded: Vec<(CartItem, HoneyProduct)> = Vec::with_capacity(lines.len());
        for line in lines {
            let product = self
                .products
                .find_by_id(line.product_id())
                .await?
                .ok_or(ServiceError::NotFound {
                    entity: "Product",
                    id: line.product_id().to_string(),
                })?;
            if !product.has_stock(line.quantity()) {
                return Err(ServiceError::InsufficientStock {
                    product_id: product.id(),
                    requested: line.quantity(),
                    available: product.quantity(),
                });
            }
            loaded.push((line, product));
        }

        // Decrement stock, keeping pre-decrement snapshots for rollback and
        // for the Updated events published on success.
        let mut applied: Vec<(HoneyProduct, HoneyProduct)> = Vec::with_capacity(loaded.len());
        let mut order_items = Vec::with_capacity(loaded.len());
        for (line, product) in &loaded {
            let before = product.clone();
            let mut after = product.clone();
            if let Err(e) = after.take_stock(line.quantity()) {
                self.rollback_stock(&applied).await;
                return Err(e.into());
            }
            if let Err(e) = self.products.save(after.clone()).await {
                tracing::error!(error = %e, "stock decrement failed, rolling checkout back");
                self.rollback_stock(&applied).await;
                return Err(e.into());
            }
            order_items.push(OrderItem::new(
                product.id(),
                product.name.clone(),
                product.price,
                line.quantity(),
            ));
            applied.push((before, after));
        }

        let order = match Order::new(client, order_items) {
            Ok(order) => order,
            Err(e) => {
                self.rollback_stock(&applied).await;
                return Err(e.into());
            }
        };
        if let Err(e) = self.orders.save(order.clone()).await {
            tracing::error!(error = %e, "order persist failed, rolling checkout back");
            self.rollback_stock(&applied).await;
            return Err(e.into());
        }

        if let Err(e) = self.clear_cart_locked(client).await {
            tracing::error!(error = %e, "cart clear failed, rolling checkout back");
            if let Err(e) = self.orders.delete_by_id(order.id()).await {
                tracing::error!(error = %e, "order rollback failed");
            }
            self.rollback_stock(&applied).await;
            return Err(e);
        }

        self.hub
            .publish(&EntityChange::Order(Change::Created(order.clone())));
        for (before, after) in applied {
            self.hub.publish(&EntityChange::Product(Change::Updated {
                old: before,
                new: after,
            }));
        }

        metrics::counter!("checkout_completed_total").increment(1);
        tracing::info!(order_id = %order.id(), %client, total = %order.total(), "checkout completed");
        Ok(order)
    }

    /// Best-effort restore of pre-decrement stock snapshots.
    async fn rollback_stock(&self, applied: &[(HoneyProduct, HoneyProduct)]) {
        for (before, _) in applied {
            if let Err(e) = self.products.save(before.clone()).await {
                tracing::error!(
                    product_id = %before.id(),
                    error = %e,
                    "stock rollback failed"
                );
            }
        }
    }
}
