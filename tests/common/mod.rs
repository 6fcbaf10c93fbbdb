#![allow(dead_code)]

use std::sync::Arc;

use tweet_api::config::MIN_BCRYPT_COST;
use tweet_api::models::{SignupRequest, UpdateUserRequest};
use tweet_api::password::PasswordHasher;
use tweet_api::services::AppState;
use tweet_api::store::MemoryStore;

pub fn memory_state() -> AppState {
    AppState::with_store(
        Arc::new(MemoryStore::new()),
        PasswordHasher::new(MIN_BCRYPT_COST),
    )
}

pub fn signup(user_id: &str, email: &str) -> SignupRequest {
    SignupRequest {
        user_id: user_id.to_string(),
        email: email.to_string(),
        password: "secret123".to_string(),
        first_name: "A".to_string(),
        last_name: "B".to_string(),
        birth_date: None,
    }
}

pub fn replacement(request: &SignupRequest) -> UpdateUserRequest {
    UpdateUserRequest {
        email: request.email.clone(),
        password: request.password.clone(),
        first_name: request.first_name.clone(),
        last_name: request.last_name.clone(),
        birth_date: request.birth_date,
    }
}
