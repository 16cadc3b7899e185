//! User accounts: registration, authentication and profile upkeep.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use common::UserId;
use domain::{Profile, User, UserRole};
use store::UserRepository;

use crate::error::{Result, ServiceError};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Manages user accounts.
///
/// The rest of the service layer consumes a `User` purely as identity plus
/// role; credentials never leave this service. Users are not part of the
/// notification hub's entity set, so no change events are published here.
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    /// Creates the service over the user repository.
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Registers a client account.
    #[tracing::instrument(skip(self, password))]
    pub async fn register_client(
        &self,
        username: &str,
        password: &str,
        profile: Profile,
    ) -> Result<User> {
        self.register(username, password, UserRole::Client, profile)
            .await
    }

    /// Registers a beekeeper account.
    #[tracing::instrument(skip(self, password))]
    pub async fn register_beekeeper(
        &self,
        username: &str,
        password: &str,
        profile: Profile,
    ) -> Result<User> {
        self.register(username, password, UserRole::Beekeeper, profile)
            .await
    }

    async fn register(
        &self,
        username: &str,
        password: &str,
        role: UserRole,
        profile: Profile,
    ) -> Result<User> {
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        if self.users.find_by_username(username).await?.is_some() {
            return Err(ServiceError::UsernameTaken(username.to_string()));
        }

        let user = User::new(username, role, hash_password(password)?, profile)?;
        self.users.save(user.clone()).await?;
        tracing::info!(user_id = %user.id(), %role, "registered user");
        Ok(user)
    }

    /// Checks a username/password pair. False for unknown users, wrong
    /// passwords and storage faults alike (faults are logged).
    pub async fn authenticate(&self, username: &str, password: &str) -> bool {
        let user = match self.users.find_by_username(username).await {
            Ok(Some(user)) => user,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!(username, error = %e, "authentication lookup failed");
                return false;
            }
        };
        verify_password(password, user.password_hash()).is_ok()
    }

    /// Looks a user up by username. Returns `None` on a storage fault
    /// (logged).
    pub async fn find_by_username(&self, username: &str) -> Option<User> {
        match self.users.find_by_username(username).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(username, error = %e, "user lookup failed");
                None
            }
        }
    }

    /// Replaces a user's password after verifying the current one.
    #[tracing::instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let mut user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;
        verify_password(current_password, user.password_hash())?;

        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        user.set_password_hash(hash_password(new_password)?);
        self.users.save(user).await?;
        tracing::info!(username, "password changed");
        Ok(())
    }

    /// Replaces a user's mutable contact fields. Identity (id, username,
    /// role) stays as registered.
    #[tracing::instrument(skip(self))]
    pub async fn update_profile(&self, user_id: UserId, profile: Profile) -> Result<User> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "User",
                id: user_id.to_string(),
            })?;

        user.profile = profile;
        self.users.save(user.clone()).await?;
        Ok(user)
    }
}

/// Hashes a password using Argon2id.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ServiceError::PasswordHash)
}

/// Verifies a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(hash).map_err(|_| ServiceError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ServiceError::InvalidCredentials)
}
