use log::{debug, info, warn};
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{
    normalize_email, validate_user_id, NewUser, PublicUser, SignupRequest, UpdateUserRequest,
    UserChanges,
};
use crate::password::PasswordHasher;
use crate::store::UserStore;

/// Owns user records: signup, lookup, replacement and removal.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        UserDirectory { store, hasher }
    }

    pub async fn create(&self, request: SignupRequest) -> Result<PublicUser, ApiError> {
        request.validate()?;
        let password_hash = self.hasher.hash(&request.password)?;
        let new_user = NewUser {
            user_id: request.user_id,
            email: normalize_email(&request.email),
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            birth_date: request.birth_date,
        };
        let user = self.store.insert_user(new_user).await.map_err(|e| {
            warn!("Signup rejected: {}", e);
            ApiError::from(e)
        })?;
        info!("User {} registered", user.user_id);
        Ok(user.into())
    }

    pub async fn get(&self, user_id: &str) -> Result<PublicUser, ApiError> {
        validate_user_id(user_id)?;
        debug!("Fetching user {}", user_id);
        self.store
            .find_user(user_id)
            .await?
            .map(PublicUser::from)
            .ok_or_else(|| not_found(user_id))
    }

    pub async fn list(&self) -> Result<Vec<PublicUser>, ApiError> {
        let users = self.store.list_users().await?;
        debug!("Listing {} users", users.len());
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    /// Replace a user's profile. Only fields that differ from the stored
    /// record are written, and the password hash is kept when the supplied
    /// password still verifies against it.
    pub async fn update(
        &self,
        user_id: &str,
        request: UpdateUserRequest,
    ) -> Result<PublicUser, ApiError> {
        validate_user_id(user_id)?;
        request.validate()?;
        let current = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| not_found(user_id))?;

        let password_hash = if self.hasher.verify(&request.password, &current.password_hash)? {
            None
        } else {
            Some(self.hasher.hash(&request.password)?)
        };
        let email = normalize_email(&request.email);
        let changes = UserChanges {
            email: (email != current.email).then_some(email),
            password_hash,
            first_name: (request.first_name != current.first_name).then_some(request.first_name),
            last_name: (request.last_name != current.last_name).then_some(request.last_name),
            birth_date: (request.birth_date != current.birth_date).then_some(request.birth_date),
        };
        if changes.is_empty() {
            debug!("Update for user {} changes nothing", user_id);
            return Ok(current.into());
        }

        let updated = self
            .store
            .update_user(user_id, &changes)
            .await?
            .ok_or_else(|| not_found(user_id))?;
        info!("User {} updated", user_id);
        Ok(updated.into())
    }

    pub async fn delete(&self, user_id: &str) -> Result<PublicUser, ApiError> {
        validate_user_id(user_id)?;
        let removed = self
            .store
            .delete_user(user_id)
            .await?
            .ok_or_else(|| not_found(user_id))?;
        info!("User {} deleted", user_id);
        Ok(removed.into())
    }
}

fn not_found(user_id: &str) -> ApiError {
    ApiError::NotFound(format!("no user with user_id {}", user_id))
}
