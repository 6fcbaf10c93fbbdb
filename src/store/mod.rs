//! Persistence ports for users and tweets.
//!
//! Implementations own uniqueness of `user_id` and `email`: an insert or
//! update that would break it fails with [`StoreError::Duplicate`] instead of
//! relying on callers to look first.

mod memory;
mod scylla_store;

pub use self::memory::MemoryStore;
pub use self::scylla_store::ScyllaStore;

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::models::{NewTweet, NewUser, Tweet, User, UserChanges};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    UserId,
    Email,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::UserId => write!(f, "user_id"),
            UniqueField::Email => write!(f, "email"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate {0}")]
    Duplicate(UniqueField),

    #[error("database query failed: {0}")]
    Query(#[from] scylla::transport::errors::QueryError),

    #[error("failed to connect to database: {0}")]
    Connection(#[from] scylla::transport::errors::NewSessionError),

    #[error("malformed row: {0}")]
    Corrupt(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user, assigning its store id.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user(&self, user_id: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    /// Write `changes` onto the user. `Ok(None)` when the user does not exist.
    async fn update_user(&self, user_id: &str, changes: &UserChanges) -> StoreResult<Option<User>>;
    /// Remove the user and return what was removed.
    async fn delete_user(&self, user_id: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait TweetStore: Send + Sync {
    async fn insert_tweet(&self, tweet: NewTweet) -> StoreResult<Tweet>;
    async fn find_tweet(&self, id: Uuid) -> StoreResult<Option<Tweet>>;
    async fn list_tweets(&self) -> StoreResult<Vec<Tweet>>;
    async fn update_tweet(
        &self,
        id: Uuid,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<Tweet>>;
    async fn delete_tweet(&self, id: Uuid) -> StoreResult<Option<Tweet>>;
}
