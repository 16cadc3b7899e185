//! Apiary operations: ownership-checked CRUD with cascading deletion.

use std::sync::Arc;

use common::{ApiaryId, UserId};
use domain::{Apiary, DomainError};
use notify::{Change, EntityChange, EventHub};
use store::{ApiaryRepository, HiveRepository, ProductRepository};

use crate::error::{Result, ServiceError};

/// Manages apiaries on behalf of their owning beekeepers.
///
/// Deleting an apiary removes its hives and their products first, publishing
/// one `Deleted` event per dependent before the apiary's own event.
pub struct ApiaryService {
    apiaries: Arc<dyn ApiaryRepository>,
    hives: Arc<dyn HiveRepository>,
    products: Arc<dyn ProductRepository>,
    hub: Arc<EventHub>,
}

impl ApiaryService {
    /// Creates the service over its repositories and the notification hub.
    pub fn new(
        apiaries: Arc<dyn ApiaryRepository>,
        hives: Arc<dyn HiveRepository>,
        products: Arc<dyn ProductRepository>,
        hub: Arc<EventHub>,
    ) -> Self {
        Self {
            apiaries,
            hives,
            products,
            hub,
        }
    }

    /// Creates an apiary owned by `owner` and publishes `Created`.
    #[tracing::instrument(skip(self))]
    pub async fn create_apiary(
        &self,
        name: &str,
        location: &str,
        owner: UserId,
    ) -> Result<Apiary> {
        let apiary = Apiary::new(name, location, owner)?;
        self.apiaries.save(apiary.clone()).await?;

        self.hub.publish(&EntityChange::Apiary(Change::Created(apiary.clone())));
        tracing::info!(apiary_id = %apiary.id(), %owner, "created apiary");
        Ok(apiary)
    }

    /// Renames or relocates an apiary. Refused unless `acting` owns it.
    /// Publishes `Updated` with both the old and the new snapshot.
    #[tracing::instrument(skip(self))]
    pub async fn update_apiary(
        &self,
        apiary_id: ApiaryId,
        name: &str,
        location: &str,
        acting: UserId,
    ) -> Result<Apiary> {
        let mut apiary = self
            .apiaries
            .find_by_id(apiary_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Apiary",
                id: apiary_id.to_string(),
            })?;

        if !apiary.is_owned_by(acting) {
            tracing::warn!(%apiary_id, %acting, "apiary update refused: not the owner");
            return Err(ServiceError::Ownership);
        }
        if name.trim().is_empty() {
            return Err(DomainError::validation("apiary name must not be empty").into());
        }
        if location.trim().is_empty() {
            return Err(DomainError::validation("apiary location must not be empty").into());
        }

        let old = apiary.clone();
        apiary.name = name.to_string();
        apiary.location = location.to_string();
        self.apiaries.save(apiary.clone()).await?;

        self.hub.publish(&EntityChange::Apiary(Change::Updated {
            old,
            new: apiary.clone(),
        }));
        tracing::info!(%apiary_id, "updated apiary");
        Ok(apiary)
    }

    /// Deletes an apiary and everything under it, dependents first.
    #[tracing::instrument(skip(self))]
    pub async fn delete_apiary(&self, apiary_id: ApiaryId, acting: UserId) -> Result<()> {
        let apiary = self
            .apiaries
            .find_by_id(apiary_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Apiary",
                id: apiary_id.to_string(),
            })?;

        if !apiary.is_owned_by(acting) {
            tracing::warn!(%apiary_id, %acting, "apiary delete refused: not the owner");
            return Err(ServiceError::Ownership);
        }

        // Hives and their products go first.
        for hive in self.hives.find_by_apiary(apiary_id).await? {
            for product in self.products.find_by_hive(hive.id()).await? {
                self.products.delete_by_id(product.id()).await?;
                self.hub
                    .publish(&EntityChange::Product(Change::Deleted(product)));
            }
            self.hives.delete_by_id(hive.id()).await?;
            self.hub.publish(&EntityChange::Hive(Change::Deleted(hive)));
        }

        // Then products attached to the apiary without a hive.
        for product in self.products.find_by_apiary(apiary_id).await? {
            self.products.delete_by_id(product.id()).await?;
            self.hub
                .publish(&EntityChange::Product(Change::Deleted(product)));
        }

        self.apiaries.delete_by_id(apiary_id).await?;
        self.hub
            .publish(&EntityChange::Apiary(Change::Deleted(apiary)));
        tracing::info!(%apiary_id, "deleted apiary with dependents");
        Ok(())
    }

    /// Looks an apiary up by id. Returns `None` on a storage fault (logged).
    pub async fn find_by_id(&self, apiary_id: ApiaryId) -> Option<Apiary> {
        match self.apiaries.find_by_id(apiary_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(%apiary_id, error = %e, "apiary lookup failed");
                None
            }
        }
    }

    /// All apiaries owned by the given beekeeper.
    pub async fn find_by_beekeeper(&self, owner: UserId) -> Vec<Apiary> {
        match self.apiaries.find_by_owner(owner).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(%owner, error = %e, "apiary query failed, returning empty");
                Vec::new()
            }
        }
    }

    /// Apiaries whose name contains `fragment` (case-insensitive).
    pub async fn find_by_name_containing(&self, fragment: &str) -> Vec<Apiary> {
        match self.apiaries.find_by_name_containing(fragment).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(fragment, error = %e, "apiary search failed, returning empty");
                Vec::new()
            }
        }
    }

    /// Apiaries whose location contains `fragment` (case-insensitive).
    pub async fn find_by_location_containing(&self, fragment: &str) -> Vec<Apiary> {
        match self.apiaries.find_by_location_containing(fragment).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(fragment, error = %e, "apiary search failed, returning empty");
                Vec::new()
            }
        }
    }

    /// Every apiary in the marketplace.
    pub async fn find_all(&self) -> Vec<Apiary> {
        match self.apiaries.find_all().await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(error = %e, "apiary listing failed, returning empty");
                Vec::new()
            }
        }
    }

    /// Distinct apiary locations, sorted, for catalog filters.
    pub async fn find_all_locations(&self) -> Vec<String> {
        let mut locations: Vec<String> = self
            .find_all()
            .await
            .into_iter()
            .map(|a| a.location)
            .collect();
        locations.sort();
        locations.dedup();
        locations
    }

    /// Authorization predicate used by dependent flows (hive and product
    /// creation). False on storage faults.
    pub async fn is_owned_by(&self, beekeeper: UserId, apiary_id: ApiaryId) -> bool {
        self.find_by_id(apiary_id)
            .await
            .is_some_and(|a| a.is_owned_by(beekeeper))
    }
}
