//! User accounts and roles.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The role a user account holds in the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Owns apiaries, hives and products; fulfills orders.
    Beekeeper,
    /// Browses products, maintains a cart and places orders.
    Client,
}

impl UserRole {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Beekeeper => "Beekeeper",
            UserRole::Client => "Client",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutable contact details attached to a user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    /// Beekeeper-only: years of beekeeping experience.
    pub years_experience: Option<u32>,
}

/// A marketplace user.
///
/// Identity (id, username, role) is fixed at registration; only the profile
/// and the credential hash may change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: String,
    role: UserRole,
    /// PHC-format password hash; never the plaintext.
    password_hash: String,
    pub profile: Profile,
}

impl User {
    /// Creates a new user. The username must be non-empty.
    pub fn new(
        username: impl Into<String>,
        role: UserRole,
        password_hash: impl Into<String>,
        profile: Profile,
    ) -> Result<Self, DomainError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }
        Ok(Self {
            id: UserId::new(),
            username,
            role,
            password_hash: password_hash.into(),
            profile,
        })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    /// Replaces the stored credential hash.
    pub fn set_password_hash(&mut self, hash: impl Into<String>) {
        self.password_hash = hash.into();
    }

    /// Returns true if this account holds the beekeeper role.
    pub fn is_beekeeper(&self) -> bool {
        self.role == UserRole::Beekeeper
    }
}
