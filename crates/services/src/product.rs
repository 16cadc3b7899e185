//! Honey product operations: catalog CRUD and stock corrections.

use std::sync::Arc;

use common::{ApiaryId, HiveId, ProductId, UserId};
use domain::{DomainError, HoneyProduct, Money};
use notify::{Change, EntityChange, EventHub};
use store::{ApiaryRepository, HiveRepository, ProductRepository};

use crate::error::{Result, ServiceError};

/// Manages the product catalog on behalf of owning beekeepers.
///
/// Stock adjustments driven by checkout and cancellation live in the cart
/// and order services; `update_product` covers administrative corrections.
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    apiaries: Arc<dyn ApiaryRepository>,
    hives: Arc<dyn HiveRepository>,
    hub: Arc<EventHub>,
}

impl ProductService {
    /// Creates the service over its repositories and the notification hub.
    pub fn new(
        products: Arc<dyn ProductRepository>,
        apiaries: Arc<dyn ApiaryRepository>,
        hives: Arc<dyn HiveRepository>,
        hub: Arc<EventHub>,
    ) -> Self {
        Self {
            products,
            apiaries,
            hives,
            hub,
        }
    }

    async fn owned_apiary(&self, apiary_id: ApiaryId, acting: UserId) -> Result<()> {
        let apiary = self
            .apiaries
            .find_by_id(apiary_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Apiary",
                id: apiary_id.to_string(),
            })?;
        if !apiary.is_owned_by(acting) {
            tracing::warn!(%apiary_id, %acting, "product mutation refused: not the apiary owner");
            return Err(ServiceError::Ownership);
        }
        Ok(())
    }

    /// Creates a product under an apiary owned by `acting`, optionally tied
    /// to one of that apiary's hives.
    #[tracing::instrument(skip(self))]
    pub async fn create_product(
        &self,
        apiary_id: ApiaryId,
        hive_id: Option<HiveId>,
        name: &str,
        description: &str,
        price: Money,
        quantity: u32,
        acting: UserId,
    ) -> Result<HoneyProduct> {
        self.owned_apiary(apiary_id, acting).await?;

        if let Some(hive_id) = hive_id {
            let hive = self
                .hives
                .find_by_id(hive_id)
                .await?
                .ok_or(ServiceError::NotFound {
                    entity: "Hive",
                    id: hive_id.to_string(),
                })?;
            if hive.apiary_id() != apiary_id {
                return Err(DomainError::validation(
                    "hive does not belong to the given apiary",
                )
                .into());
            }
        }

        let product = HoneyProduct::new(apiary_id, hive_id, name, description, price, quantity)?;
        self.products.save(product.clone()).await?;

        self.hub
            .publish(&EntityChange::Product(Change::Created(product.clone())));
        tracing::info!(product_id = %product.id(), %apiary_id, "created product");
        Ok(product)
    }

    /// Updates a product's catalog fields and stock count (administrative
    /// correction — the only stock path outside checkout and cancellation).
    #[tracing::instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: ProductId,
        name: &str,
        description: &str,
        price: Money,
        quantity: u32,
        acting: UserId,
    ) -> Result<HoneyProduct> {
        let mut product = self
            .products
            .find_by_id(product_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Product",
                id: product_id.to_string(),
            })?;
        self.owned_apiary(product.apiary_id(), acting).await?;

        if name.trim().is_empty() {
            return Err(DomainError::validation("product name must not be empty").into());
        }
        if price.is_negative() {
            return Err(DomainError::validation("product price must not be negative").into());
        }

        let old = product.clone();
        product.name = name.to_string();
        product.description = description.to_string();
        product.price = price;
        product.set_quantity(quantity);
        self.products.save(product.clone()).await?;

        self.hub.publish(&EntityChange::Product(Change::Updated {
            old,
            new: product.clone(),
        }));
        tracing::info!(%product_id, "updated product");
        Ok(product)
    }

    /// Deletes a product from the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, product_id: ProductId, acting: UserId) -> Result<()> {
        let product = self
            .products
            .find_by_id(product_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Product",
                id: product_id.to_string(),
            })?;
        self.owned_apiary(product.apiary_id(), acting).await?;

        self.products.delete_by_id(product_id).await?;
        self.hub
            .publish(&EntityChange::Product(Change::Deleted(product)));
        tracing::info!(%product_id, "deleted product");
        Ok(())
    }

    /// Looks a product up by id. Returns `None` on a storage fault (logged).
    pub async fn find_by_id(&self, product_id: ProductId) -> Option<HoneyProduct> {
        match self.products.find_by_id(product_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(%product_id, error = %e, "product lookup failed");
                None
            }
        }
    }

    /// All products of one apiary, hive-attached ones included.
    pub async fn find_by_apiary(&self, apiary_id: ApiaryId) -> Vec<HoneyProduct> {
        match self.products.find_by_apiary(apiary_id).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(%apiary_id, error = %e, "product query failed, returning empty");
                Vec::new()
            }
        }
    }

    /// All products of one hive.
    pub async fn find_by_hive(&self, hive_id: HiveId) -> Vec<HoneyProduct> {
        match self.products.find_by_hive(hive_id).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(%hive_id, error = %e, "product query failed, returning empty");
                Vec::new()
            }
        }
    }

    /// All products across every apiary the beekeeper owns.
    pub async fn find_by_beekeeper(&self, beekeeper: UserId) -> Vec<HoneyProduct> {
        let apiaries = match self.apiaries.find_by_owner(beekeeper).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(%beekeeper, error = %e, "product query failed, returning empty");
                return Vec::new();
            }
        };

        let mut all = Vec::new();
        for apiary in apiaries {
            all.extend(self.find_by_apiary(apiary.id()).await);
        }
        all
    }

    /// Products currently in stock, for the client-facing catalog.
    pub async fn find_available(&self) -> Vec<HoneyProduct> {
        match self.products.find_all().await {
            Ok(list) => list.into_iter().filter(|p| p.quantity() > 0).collect(),
            Err(e) => {
                tracing::error!(error = %e, "product listing failed, returning empty");
                Vec::new()
            }
        }
    }

    /// In-stock products priced within `[min, max]`; either bound may be
    /// left open.
    pub async fn find_by_price_range(
        &self,
        min: Option<Money>,
        max: Option<Money>,
    ) -> Vec<HoneyProduct> {
        self.find_available()
            .await
            .into_iter()
            .filter(|p| min.is_none_or(|m| p.price >= m))
            .filter(|p| max.is_none_or(|m| p.price <= m))
            .collect()
    }

    /// Products whose name contains `fragment` (case-insensitive).
    pub async fn find_by_name_containing(&self, fragment: &str) -> Vec<HoneyProduct> {
        match self.products.find_by_name_containing(fragment).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(fragment, error = %e, "product search failed, returning empty");
                Vec::new()
            }
        }
    }

    /// Number of products under an apiary, for dashboard counts.
    pub async fn count_by_apiary(&self, apiary_id: ApiaryId) -> usize {
        self.find_by_apiary(apiary_id).await.len()
    }

    /// Number of products under a hive, for dashboard counts.
    pub async fn count_by_hive(&self, hive_id: HiveId) -> usize {
        self.find_by_hive(hive_id).await.len()
    }
}
