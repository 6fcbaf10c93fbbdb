use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::TryStreamExt;
use log::{debug, error, warn};
use scylla::frame::response::result::{CqlValue, Row};
use scylla::frame::value::CqlTimestamp;
use scylla::{QueryResult, Session};
use std::sync::Arc;
use uuid::Uuid;

use super::{StoreError, StoreResult, TweetStore, UniqueField, UserStore};
use crate::config::AppConfig;
use crate::db;
use crate::models::{NewTweet, NewUser, PublicUser, Tweet, User, UserChanges};

const USER_COLUMNS: &str = "user_id, id, email, password_hash, first_name, last_name, birth_date";
const TWEET_COLUMNS: &str = "id, content, created_at, updated_at, author";
const CLAIM_ATTEMPTS: usize = 3;

/// ScyllaDB-backed store.
///
/// `users` is keyed by `user_id` and written with `IF NOT EXISTS`, which makes
/// the id unique. Email uniqueness lives in `users_by_email`, where each
/// address is claimed with its own lightweight transaction and released when
/// the owning user changes address or is deleted.
pub struct ScyllaStore {
    session: Arc<Session>,
    keyspace: String,
}

impl ScyllaStore {
    pub async fn connect(config: &AppConfig) -> StoreResult<Self> {
        let session = db::create_session(config).await?;
        db::init_schema(&session, &config.keyspace).await?;
        Ok(ScyllaStore {
            session: Arc::new(session),
            keyspace: config.keyspace.clone(),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}.{}", self.keyspace, name)
    }

    async fn email_owner(&self, email: &str) -> StoreResult<Option<String>> {
        let result = self
            .session
            .query(
                format!("SELECT user_id FROM {} WHERE email = ?", self.table("users_by_email")),
                (email,),
            )
            .await?;
        first_row(result)
            .map(|row| text(&row, 0, "user_id"))
            .transpose()
    }

    /// Claim `email` for `user_id`. Returns false when another live user
    /// holds it. A claim whose owner row is gone, or whose owner has moved to
    /// another address, is stale and gets taken over.
    async fn claim_email(&self, email: &str, user_id: &str) -> StoreResult<bool> {
        for _ in 0..CLAIM_ATTEMPTS {
            let result = self
                .session
                .query(
                    format!(
                        "INSERT INTO {} (email, user_id) VALUES (?, ?) IF NOT EXISTS",
                        self.table("users_by_email")
                    ),
                    (email, user_id),
                )
                .await?;
            if applied(&result)? {
                return Ok(true);
            }

            let Some(owner) = self.email_owner(email).await? else {
                // Released in between; try the insert again.
                continue;
            };
            if owner == user_id {
                return Ok(true);
            }
            if self.holds_email(&owner, email).await? {
                return Ok(false);
            }

            warn!("Taking over stale email claim for {} from user {}", email, owner);
            let result = self
                .session
                .query(
                    format!(
                        "UPDATE {} SET user_id = ? WHERE email = ? IF user_id = ?",
                        self.table("users_by_email")
                    ),
                    (user_id, email, &owner),
                )
                .await?;
            if applied(&result)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn holds_email(&self, user_id: &str, email: &str) -> StoreResult<bool> {
        Ok(self
            .find_user(user_id)
            .await?
            .is_some_and(|user| user.email == email))
    }

    /// Drop `user_id`'s claim on `email`. Failures are logged; a claim left
    /// behind is stale and the next claimant takes it over.
    async fn release_email(&self, email: &str, user_id: &str) {
        let result = self
            .session
            .query(
                format!(
                    "DELETE FROM {} WHERE email = ? IF user_id = ?",
                    self.table("users_by_email")
                ),
                (email, user_id),
            )
            .await
            .map_err(StoreError::from)
            .and_then(|result| applied(&result));
        match result {
            Ok(true) => {}
            Ok(false) => warn!("Email claim for {} was not held by user {}", email, user_id),
            Err(err) => error!("Could not release email {} for user {}: {}", email, user_id, err),
        }
    }

    /// Remove a user row written by a signup that then failed.
    async fn discard_user(&self, user: &User) {
        let result = self
            .session
            .query(
                format!("DELETE FROM {} WHERE user_id = ? IF id = ?", self.table("users")),
                (&user.user_id, &user.id),
            )
            .await;
        if let Err(err) = result {
            error!("Could not remove user {} after failed signup: {}", user.user_id, err);
        }
    }
}

#[async_trait]
impl UserStore for ScyllaStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let user = user.into_user(Uuid::new_v4().to_string());
        let result = self
            .session
            .query(
                format!(
                    "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?) IF NOT EXISTS",
                    self.table("users"),
                    USER_COLUMNS
                ),
                (
                    &user.user_id,
                    &user.id,
                    &user.email,
                    &user.password_hash,
                    &user.first_name,
                    &user.last_name,
                    user.birth_date.map(|date| date.to_string()),
                ),
            )
            .await?;
        if !applied(&result)? {
            return Err(StoreError::Duplicate(UniqueField::UserId));
        }

        match self.claim_email(&user.email, &user.user_id).await {
            Ok(true) => Ok(user),
            Ok(false) => {
                debug!("Email {} already claimed, removing user {}", user.email, user.user_id);
                self.discard_user(&user).await;
                Err(StoreError::Duplicate(UniqueField::Email))
            }
            Err(err) => {
                self.discard_user(&user).await;
                Err(err)
            }
        }
    }

    async fn find_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let result = self
            .session
            .query(
                format!(
                    "SELECT {} FROM {} WHERE user_id = ?",
                    USER_COLUMNS,
                    self.table("users")
                ),
                (user_id,),
            )
            .await?;
        first_row(result).map(|row| user_from_row(&row)).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let Some(owner) = self.email_owner(email).await? else {
            return Ok(None);
        };
        // A claim can briefly outlive the row it points to.
        Ok(self
            .find_user(&owner)
            .await?
            .filter(|user| user.email == email))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows: Vec<Row> = self
            .session
            .query_iter(
                format!("SELECT {} FROM {}", USER_COLUMNS, self.table("users")),
                &[],
            )
            .await?
            .try_collect()
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn update_user(&self, user_id: &str, changes: &UserChanges) -> StoreResult<Option<User>> {
        let Some(current) = self.find_user(user_id).await? else {
            return Ok(None);
        };

        let new_email = changes
            .email
            .as_ref()
            .filter(|email| **email != current.email);
        if let Some(email) = new_email {
            if !self.claim_email(email, user_id).await? {
                return Err(StoreError::Duplicate(UniqueField::Email));
            }
        }

        let mut assignments = Vec::new();
        let mut values: Vec<Option<CqlValue>> = Vec::new();
        let mut set = |column: &'static str, value: Option<String>| {
            assignments.push(format!("{} = ?", column));
            values.push(value.map(CqlValue::Text));
        };
        if let Some(email) = &changes.email {
            set("email", Some(email.clone()));
        }
        if let Some(hash) = &changes.password_hash {
            set("password_hash", Some(hash.clone()));
        }
        if let Some(first_name) = &changes.first_name {
            set("first_name", Some(first_name.clone()));
        }
        if let Some(last_name) = &changes.last_name {
            set("last_name", Some(last_name.clone()));
        }
        if let Some(birth_date) = changes.birth_date {
            set("birth_date", birth_date.map(|date| date.to_string()));
        }
        if assignments.is_empty() {
            return Ok(Some(current));
        }
        values.push(Some(CqlValue::Text(user_id.to_string())));
        values.push(Some(CqlValue::Text(current.id.clone())));

        let result = self
            .session
            .query(
                format!(
                    "UPDATE {} SET {} WHERE user_id = ? IF id = ?",
                    self.table("users"),
                    assignments.join(", ")
                ),
                values,
            )
            .await;
        let written = match result {
            Ok(result) => applied(&result),
            Err(err) => Err(err.into()),
        };
        if !matches!(written, Ok(true)) {
            // Give back the address we just claimed.
            if let Some(email) = new_email {
                self.release_email(email, user_id).await;
            }
            return written.map(|_| None);
        }
        if let Some(email) = new_email {
            if self.email_owner(email).await?.as_deref() != Some(user_id) {
                // Taken over between the claim and the row write.
                warn!("Lost email claim for {} while updating user {}", email, user_id);
                self.session
                    .query(
                        format!(
                            "UPDATE {} SET email = ? WHERE user_id = ? IF email = ?",
                            self.table("users")
                        ),
                        (&current.email, user_id, email),
                    )
                    .await?;
                return Err(StoreError::Duplicate(UniqueField::Email));
            }
            self.release_email(&current.email, user_id).await;
        }

        let mut updated = current;
        changes.apply(&mut updated);
        Ok(Some(updated))
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let Some(user) = self.find_user(user_id).await? else {
            return Ok(None);
        };
        let result = self
            .session
            .query(
                format!("DELETE FROM {} WHERE user_id = ? IF id = ?", self.table("users")),
                (user_id, &user.id),
            )
            .await?;
        if !applied(&result)? {
            return Ok(None);
        }
        self.release_email(&user.email, user_id).await;
        Ok(Some(user))
    }
}

#[async_trait]
impl TweetStore for ScyllaStore {
    async fn insert_tweet(&self, tweet: NewTweet) -> StoreResult<Tweet> {
        let tweet = tweet.into_tweet(Uuid::new_v4());
        let author = serde_json::to_string(&tweet.by)?;
        self.session
            .query(
                format!(
                    "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?)",
                    self.table("tweets"),
                    TWEET_COLUMNS
                ),
                (
                    tweet.id,
                    &tweet.content,
                    CqlTimestamp(tweet.created_at.timestamp_millis()),
                    CqlTimestamp(tweet.updated_at.timestamp_millis()),
                    author,
                ),
            )
            .await?;
        Ok(tweet)
    }

    async fn find_tweet(&self, id: Uuid) -> StoreResult<Option<Tweet>> {
        let result = self
            .session
            .query(
                format!("SELECT {} FROM {} WHERE id = ?", TWEET_COLUMNS, self.table("tweets")),
                (id,),
            )
            .await?;
        first_row(result).map(|row| tweet_from_row(&row)).transpose()
    }

    async fn list_tweets(&self) -> StoreResult<Vec<Tweet>> {
        let rows: Vec<Row> = self
            .session
            .query_iter(
                format!("SELECT {} FROM {}", TWEET_COLUMNS, self.table("tweets")),
                &[],
            )
            .await?
            .try_collect()
            .await?;
        rows.iter().map(tweet_from_row).collect()
    }

    async fn update_tweet(
        &self,
        id: Uuid,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<Tweet>> {
        let result = self
            .session
            .query(
                format!(
                    "UPDATE {} SET content = ?, updated_at = ? WHERE id = ? IF EXISTS",
                    self.table("tweets")
                ),
                (content, CqlTimestamp(updated_at.timestamp_millis()), id),
            )
            .await?;
        if !applied(&result)? {
            return Ok(None);
        }
        self.find_tweet(id).await
    }

    async fn delete_tweet(&self, id: Uuid) -> StoreResult<Option<Tweet>> {
        let Some(tweet) = self.find_tweet(id).await? else {
            return Ok(None);
        };
        let result = self
            .session
            .query(
                format!("DELETE FROM {} WHERE id = ? IF EXISTS", self.table("tweets")),
                (id,),
            )
            .await?;
        Ok(applied(&result)?.then_some(tweet))
    }
}

fn first_row(result: QueryResult) -> Option<Row> {
    result.rows.and_then(|rows| rows.into_iter().next())
}

/// Read the `[applied]` flag of a lightweight transaction.
fn applied(result: &QueryResult) -> StoreResult<bool> {
    match result
        .rows
        .as_ref()
        .and_then(|rows| rows.first())
        .and_then(|row| row.columns.first())
    {
        Some(Some(CqlValue::Boolean(applied))) => Ok(*applied),
        _ => Err(StoreError::Corrupt("missing [applied] column".to_string())),
    }
}

fn text(row: &Row, index: usize, column: &str) -> StoreResult<String> {
    opt_text(row, index).ok_or_else(|| StoreError::Corrupt(format!("missing {}", column)))
}

fn opt_text(row: &Row, index: usize) -> Option<String> {
    match row.columns.get(index) {
        Some(Some(CqlValue::Text(value))) | Some(Some(CqlValue::Ascii(value))) => {
            Some(value.clone())
        }
        _ => None,
    }
}

fn timestamp(row: &Row, index: usize, column: &str) -> StoreResult<DateTime<Utc>> {
    match row.columns.get(index) {
        Some(Some(CqlValue::Timestamp(ts))) => DateTime::<Utc>::from_timestamp_millis(ts.0)
            .ok_or_else(|| StoreError::Corrupt(format!("{} out of range", column))),
        _ => Err(StoreError::Corrupt(format!("missing {}", column))),
    }
}

fn user_from_row(row: &Row) -> StoreResult<User> {
    let birth_date = opt_text(row, 6)
        .map(|raw| {
            raw.parse::<NaiveDate>()
                .map_err(|_| StoreError::Corrupt(format!("bad birth_date {}", raw)))
        })
        .transpose()?;
    Ok(User {
        user_id: text(row, 0, "user_id")?,
        id: text(row, 1, "id")?,
        email: text(row, 2, "email")?,
        password_hash: text(row, 3, "password_hash")?,
        first_name: text(row, 4, "first_name")?,
        last_name: text(row, 5, "last_name")?,
        birth_date,
    })
}

fn tweet_from_row(row: &Row) -> StoreResult<Tweet> {
    let id = match row.columns.first() {
        Some(Some(CqlValue::Uuid(id))) => *id,
        _ => return Err(StoreError::Corrupt("missing id".to_string())),
    };
    let by: PublicUser = serde_json::from_str(&text(row, 4, "author")?)?;
    Ok(Tweet {
        id,
        content: text(row, 1, "content")?,
        created_at: timestamp(row, 2, "created_at")?,
        updated_at: timestamp(row, 3, "updated_at")?,
        by,
    })
}
