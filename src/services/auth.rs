use log::{info, warn};
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{normalize_email, LoginRequest, PublicUser};
use crate::password::PasswordHasher;
use crate::store::UserStore;

/// Stateless credential check. Nothing is issued on success.
#[derive(Clone)]
pub struct AuthGateway {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl AuthGateway {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        AuthGateway { store, hasher }
    }

    pub async fn login(&self, request: LoginRequest) -> Result<PublicUser, ApiError> {
        request.validate()?;
        let email = normalize_email(&request.email);
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            warn!("Login for unknown email {}", email);
            return Err(ApiError::Auth("no account registered with that email".to_string()));
        };
        if !self.hasher.verify(&request.password, &user.password_hash)? {
            warn!("Password mismatch for user {}", user.user_id);
            return Err(ApiError::Auth("password does not match".to_string()));
        }
        info!("User {} logged in", user.user_id);
        Ok(user.into())
    }
}
