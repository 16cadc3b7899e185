//! Apiaries and hives.

use common::{ApiaryId, HiveId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// An apiary owned by exactly one beekeeper.
///
/// Ownership is modeled as a plain `UserId` foreign key; the owning account
/// is resolved through the user repository, never held as a live reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apiary {
    id: ApiaryId,
    pub name: String,
    pub location: String,
    owner: UserId,
}

impl Apiary {
    /// Creates a new apiary. Name and location must be non-empty.
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        owner: UserId,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        let location = location.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("apiary name must not be empty"));
        }
        if location.trim().is_empty() {
            return Err(DomainError::validation("apiary location must not be empty"));
        }
        Ok(Self {
            id: ApiaryId::new(),
            name,
            location,
            owner,
        })
    }

    pub fn id(&self) -> ApiaryId {
        self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// Returns true if the apiary is owned by the given beekeeper.
    pub fn is_owned_by(&self, beekeeper: UserId) -> bool {
        self.owner == beekeeper
    }
}

/// A hive belonging to exactly one apiary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hive {
    id: HiveId,
    apiary_id: ApiaryId,
    pub number: u32,
    pub queen_year: i32,
}

impl Hive {
    /// Creates a new hive under the given apiary.
    pub fn new(apiary_id: ApiaryId, number: u32, queen_year: i32) -> Self {
        Self {
            id: HiveId::new(),
            apiary_id,
            number,
            queen_year,
        }
    }

    pub fn id(&self) -> HiveId {
        self.id
    }

    pub fn apiary_id(&self) -> ApiaryId {
        self.apiary_id
    }
}
