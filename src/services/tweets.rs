use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{
    edit_timestamp, now_millis, CreateTweetRequest, NewTweet, Tweet, UpdateTweetQuery,
};
use crate::store::TweetStore;

/// Owns tweets. Each tweet carries a copy of its author's public profile
/// taken when it was posted.
#[derive(Clone)]
pub struct TweetFeed {
    store: Arc<dyn TweetStore>,
}

impl TweetFeed {
    pub fn new(store: Arc<dyn TweetStore>) -> Self {
        TweetFeed { store }
    }

    pub async fn create(&self, request: CreateTweetRequest) -> Result<Tweet, ApiError> {
        request.validate()?;
        let tweet = self
            .store
            .insert_tweet(NewTweet {
                content: request.content,
                created_at: now_millis(),
                by: request.by,
            })
            .await?;
        info!("Tweet {} posted by user {}", tweet.id, tweet.by.user_id);
        Ok(tweet)
    }

    pub async fn get(&self, id: Uuid) -> Result<Tweet, ApiError> {
        debug!("Fetching tweet {}", id);
        self.store.find_tweet(id).await?.ok_or_else(|| not_found(id))
    }

    pub async fn list(&self) -> Result<Vec<Tweet>, ApiError> {
        let tweets = self.store.list_tweets().await?;
        debug!("Listing {} tweets", tweets.len());
        Ok(tweets)
    }

    pub async fn update(&self, id: Uuid, request: UpdateTweetQuery) -> Result<Tweet, ApiError> {
        request.validate()?;
        let current = self.get(id).await?;
        let updated_at = edit_timestamp(current.created_at, now_millis());
        let tweet = self
            .store
            .update_tweet(id, &request.content, updated_at)
            .await?
            .ok_or_else(|| not_found(id))?;
        info!("Tweet {} updated", id);
        Ok(tweet)
    }

    pub async fn delete(&self, id: Uuid) -> Result<Tweet, ApiError> {
        let tweet = self
            .store
            .delete_tweet(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        info!("Tweet {} deleted", id);
        Ok(tweet)
    }
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("no tweet with id {}", id))
}
