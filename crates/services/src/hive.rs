//! Hive operations under an owning apiary.

use std::sync::Arc;

use common::{ApiaryId, HiveId, UserId};
use domain::Hive;
use notify::{Change, EntityChange, EventHub};
use store::{ApiaryRepository, HiveRepository, ProductRepository};

use crate::error::{Result, ServiceError};

/// Manages hives. Every mutation checks that the acting beekeeper owns the
/// apiary the hive belongs to; deleting a hive removes its products first.
pub struct HiveService {
    hives: Arc<dyn HiveRepository>,
    apiaries: Arc<dyn ApiaryRepository>,
    products: Arc<dyn ProductRepository>,
    hub: Arc<EventHub>,
}

impl HiveService {
    /// Creates the service over its repositories and the notification hub.
    pub fn new(
        hives: Arc<dyn HiveRepository>,
        apiaries: Arc<dyn ApiaryRepository>,
        products: Arc<dyn ProductRepository>,
        hub: Arc<EventHub>,
    ) -> Self {
        Self {
            hives,
            apiaries,
            products,
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
            tracing::warn!(%apiary_id, %acting, "hive mutation refused: not the apiary owner");
            return Err(ServiceError::Ownership);
        }
        Ok(())
    }

    /// Creates a hive under an apiary owned by `acting`.
    #[tracing::instrument(skip(self))]
    pub async fn create_hive(
        &self,
        apiary_id: ApiaryId,
        number: u32,
        queen_year: i32,
        acting: UserId,
    ) -> Result<Hive> {
        self.owned_apiary(apiary_id, acting).await?;

        let hive = Hive::new(apiary_id, number, queen_year);
        self.hives.save(hive.clone()).await?;

        self.hub.publish(&EntityChange::Hive(Change::Created(hive.clone())));
        tracing::info!(hive_id = %hive.id(), %apiary_id, "created hive");
        Ok(hive)
    }

    /// Updates a hive's number and queen year.
    #[tracing::instrument(skip(self))]
    pub async fn update_hive(
        &self,
        hive_id: HiveId,
        number: u32,
        queen_year: i32,
        acting: UserId,
    ) -> Result<Hive> {
        let mut hive = self
            .hives
            .find_by_id(hive_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Hive",
                id: hive_id.to_string(),
            })?;
        self.owned_apiary(hive.apiary_id(), acting).await?;

        let old = hive.clone();
        hive.number = number;
        hive.queen_year = queen_year;
        self.hives.save(hive.clone()).await?;

        self.hub.publish(&EntityChange::Hive(Change::Updated {
            old,
            new: hive.clone(),
        }));
        tracing::info!(%hive_id, "updated hive");
        Ok(hive)
    }

    /// Deletes a hive and its products, products first.
    #[tracing::instrument(skip(self))]
    pub async fn delete_hive(&self, hive_id: HiveId, acting: UserId) -> Result<()> {
        let hive = self
            .hives
            .find_by_id(hive_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Hive",
                id: hive_id.to_string(),
            })?;
        self.owned_apiary(hive.apiary_id(), acting).await?;

        for product in self.products.find_by_hive(hive_id).await? {
            self.products.delete_by_id(product.id()).await?;
            self.hub
                .publish(&EntityChange::Product(Change::Deleted(product)));
        }

        self.hives.delete_by_id(hive_id).await?;
        self.hub.publish(&EntityChange::Hive(Change::Deleted(hive)));
        tracing::info!(%hive_id, "deleted hive with products");
        Ok(())
    }

    /// Looks a hive up by id. Returns `None` on a storage fault (logged).
    pub async fn find_by_id(&self, hive_id: HiveId) -> Option<Hive> {
        match self.hives.find_by_id(hive_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(%hive_id, error = %e, "hive lookup failed");
                None
            }
        }
    }

    /// All hives of one apiary.
    pub async fn find_by_apiary(&self, apiary_id: ApiaryId) -> Vec<Hive> {
        match self.hives.find_by_apiary(apiary_id).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(%apiary_id, error = %e, "hive query failed, returning empty");
                Vec::new()
            }
        }
    }

    /// Number of hives under an apiary, for dashboard counts.
    pub async fn count_by_apiary(&self, apiary_id: ApiaryId) -> usize {
        self.find_by_apiary(apiary_id).await.len()
    }
}
