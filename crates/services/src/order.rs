//! Order lifecycle: status transitions and role-scoped queries.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{HoneyProduct, Order, OrderStatus};
use notify::{Change, EntityChange, EventHub};
use store::{ApiaryRepository, OrderRepository, ProductRepository};
use tokio::sync::Mutex;

use crate::error::{Result, ServiceError};

/// Drives orders through their status state machine and answers the
/// client- and beekeeper-side order queries.
///
/// Cancellation is the only path that returns stock to inventory; it runs
/// under the stock lock shared with checkout.
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    apiaries: Arc<dyn ApiaryRepository>,
    hub: Arc<EventHub>,
    stock_lock: Arc<Mutex<()>>,
}

impl OrderService {
    /// Creates the service. `stock_lock` must be the lock shared with the
    /// cart service.
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        apiaries: Arc<dyn ApiaryRepository>,
        hub: Arc<EventHub>,
        stock_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            orders,
            products,
            apiaries,
            hub,
            stock_lock,
        }
    }

    /// Cancels a pending order of `acting_client`, restoring each line's
    /// quantity to its product's stock (the inverse of checkout).
    ///
    /// Fails with `Ownership` for another client's order and with
    /// `InvalidStateTransition` once the order has left Pending, so a second
    /// cancellation can never double-restore stock.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId, acting_client: UserId) -> Result<Order> {
        let _stock_guard = self.stock_lock.lock().await;

        // Loaded under the lock so two racing cancellations observe each
        // other's status write.
        let mut order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Order",
                id: order_id.to_string(),
            })?;

        if order.client_id() != acting_client {
            tracing::warn!(%order_id, %acting_client, "cancellation refused: not the order's client");
            return Err(ServiceError::Ownership);
        }
        if !order.status().can_cancel() {
            return Err(ServiceError::InvalidStateTransition {
                from: order.status(),
                action: "cancel",
            });
        }

        // Restore stock first, keeping snapshots so a failed status write
        // can take the restores back.
        let mut restored: Vec<(HoneyProduct, HoneyProduct)> = Vec::new();
        for item in order.items() {
            match self.products.find_by_id(item.product_id).await? {
                Some(product) => {
                    let before = product.clone();
                    let mut after = product;
                    after.restore_stock(item.quantity);
                    if let Err(e) = self.products.save(after.clone()).await {
                        tracing::error!(error = %e, "stock restore failed, rolling cancellation back");
                        self.rollback_restores(&restored).await;
                        return Err(e.into());
                    }
                    restored.push((before, after));
                }
                None => {
                    // The product was deleted after the order was placed;
                    // there is no stock row left to restore.
                    tracing::warn!(
                        %order_id,
                        product_id = %item.product_id,
                        "canceled line references a deleted product"
                    );
                }
            }
        }

        let old = order.clone();
        order.transition(OrderStatus::Canceled)?;
        if let Err(e) = self.orders.save(order.clone()).await {
            tracing::error!(error = %e, "order cancel persist failed, rolling restores back");
            self.rollback_restores(&restored).await;
            return Err(e.into());
        }

        self.hub.publish(&EntityChange::Order(Change::Updated {
            old,
            new: order.clone(),
        }));
        for (before, after) in restored {
            self.hub.publish(&EntityChange::Product(Change::Updated {
                old: before,
                new: after,
            }));
        }

        metrics::counter!("orders_canceled_total").increment(1);
        tracing::info!(%order_id, "order canceled, stock restored");
        Ok(order)
    }

    async fn rollback_restores(&self, restored: &[(HoneyProduct, HoneyProduct)]) {
        for (before, _) in restored {
            if let Err(e) = self.products.save(before.clone()).await {
                tracing::error!(product_id = %before.id(), error = %e, "restore rollback failed");
            }
        }
    }

    /// Marks a pending order as paid. No stock effect.
    #[tracing::instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: OrderId) -> Result<Order> {
        self.transition(order_id, OrderStatus::Paid).await
    }

    /// Marks a paid order as delivered. No stock effect.
    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: OrderId) -> Result<Order> {
        self.transition(order_id, OrderStatus::Delivered).await
    }

    async fn transition(&self, order_id: OrderId, to: OrderStatus) -> Result<Order> {
        // Serialized against cancel_order so a racing cancellation cannot
        // restore stock and then have its Canceled write overwritten here.
        let _stock_guard = self.stock_lock.lock().await;

        let mut order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Order",
                id: order_id.to_string(),
            })?;

        let old = order.clone();
        order.transition(to)?;
        self.orders.save(order.clone()).await?;

        self.hub.publish(&EntityChange::Order(Change::Updated {
            old,
            new: order.clone(),
        }));
        tracing::info!(%order_id, status = %to, "order status advanced");
        Ok(order)
    }

    /// Looks an order up by id. Returns `None` on a storage fault (logged).
    pub async fn find_by_id(&self, order_id: OrderId) -> Option<Order> {
        match self.orders.find_by_id(order_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(%order_id, error = %e, "order lookup failed");
                None
            }
        }
    }

    /// All orders placed by the given client.
    pub async fn find_by_client(&self, client: UserId) -> Vec<Order> {
        match self.orders.find_by_client(client).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(%client, error = %e, "order query failed, returning empty");
                Vec::new()
            }
        }
    }

    /// Orders containing at least one line whose product belongs to an
    /// apiary owned by the beekeeper. An order may span several beekeepers'
    /// products, so this is a join through the repositories rather than a
    /// direct key.
    pub async fn find_orders_for_beekeeper(&self, beekeeper: UserId) -> Vec<Order> {
        match self.orders_for_beekeeper(beekeeper).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(%beekeeper, error = %e, "order query failed, returning empty");
                Vec::new()
            }
        }
    }

    /// Beekeeper-scoped orders additionally restricted by status (`None` =
    /// all statuses) and a half-open `[start, end)` time range.
    pub async fn find_orders_with_filters(
        &self,
        beekeeper: UserId,
        status: Option<OrderStatus>,
        start_inclusive: DateTime<Utc>,
        end_exclusive: DateTime<Utc>,
    ) -> Vec<Order> {
        self.find_orders_for_beekeeper(beekeeper)
            .await
            .into_iter()
            .filter(|o| status.is_none_or(|s| o.status() == s))
            .filter(|o| o.ordered_at() >= start_inclusive && o.ordered_at() < end_exclusive)
            .collect()
    }

    async fn orders_for_beekeeper(&self, beekeeper: UserId) -> Result<Vec<Order>> {
        let mut owned: HashSet<ProductId> = HashSet::new();
        for apiary in self.apiaries.find_by_owner(beekeeper).await? {
            for product in self.products.find_by_apiary(apiary.id()).await? {
                owned.insert(product.id());
            }
        }

        Ok(self
            .orders
            .find_all()
            .await?
            .into_iter()
            .filter(|o| o.items().iter().any(|i| owned.contains(&i.product_id)))
            .collect())
    }
}
