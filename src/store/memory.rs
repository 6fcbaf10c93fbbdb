use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, StoreResult, TweetStore, UniqueField, UserStore};
use crate::models::{NewTweet, NewUser, Tweet, User, UserChanges};

#[derive(Debug, Default)]
struct Users {
    by_user_id: HashMap<String, User>,
    // email -> user_id
    emails: HashMap<String, String>,
}

/// Process-local store. One lock per collection makes every check-and-write atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Users>,
    tweets: RwLock<HashMap<Uuid, Tweet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.by_user_id.contains_key(&user.user_id) {
            return Err(StoreError::Duplicate(UniqueField::UserId));
        }
        if users.emails.contains_key(&user.email) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
        let user = user.into_user(Uuid::new_v4().to_string());
        users
            .emails
            .insert(user.email.clone(), user.user_id.clone());
        users.by_user_id.insert(user.user_id.clone(), user.clone());
        Ok(user)
    }

    async fn find_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.by_user_id.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .emails
            .get(email)
            .and_then(|user_id| users.by_user_id.get(user_id))
            .cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.read().await.by_user_id.values().cloned().collect())
    }

    async fn update_user(&self, user_id: &str, changes: &UserChanges) -> StoreResult<Option<User>> {
        let mut guard = self.users.write().await;
        let users = &mut *guard;
        let Some(user) = users.by_user_id.get_mut(user_id) else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            if users.emails.get(email).is_some_and(|owner| owner != user_id) {
                return Err(StoreError::Duplicate(UniqueField::Email));
            }
            users.emails.remove(&user.email);
            users.emails.insert(email.clone(), user_id.to_string());
        }
        changes.apply(user);
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        let removed = users.by_user_id.remove(user_id);
        if let Some(user) = &removed {
            users.emails.remove(&user.email);
        }
        Ok(removed)
    }
}

#[async_trait]
impl TweetStore for MemoryStore {
    async fn insert_tweet(&self, tweet: NewTweet) -> StoreResult<Tweet> {
        let tweet = tweet.into_tweet(Uuid::new_v4());
        self.tweets.write().await.insert(tweet.id, tweet.clone());
        Ok(tweet)
    }

    async fn find_tweet(&self, id: Uuid) -> StoreResult<Option<Tweet>> {
        Ok(self.tweets.read().await.get(&id).cloned())
    }

    async fn list_tweets(&self) -> StoreResult<Vec<Tweet>> {
        Ok(self.tweets.read().await.values().cloned().collect())
    }

    async fn update_tweet(
        &self,
        id: Uuid,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<Tweet>> {
        let mut tweets = self.tweets.write().await;
        Ok(tweets.get_mut(&id).map(|tweet| {
            tweet.content = content.to_string();
            tweet.updated_at = updated_at;
            tweet.clone()
        }))
    }

    async fn delete_tweet(&self, id: Uuid) -> StoreResult<Option<Tweet>> {
        Ok(self.tweets.write().await.remove(&id))
    }
}
