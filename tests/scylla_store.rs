//! Runs against a live ScyllaDB node (`SCYLLA_NODES`, default 127.0.0.1:9042).
//! Use `cargo test -- --ignored` with a node available.

use uuid::Uuid;

use tweet_api::config::AppConfig;
use tweet_api::db;
use tweet_api::models::{now_millis, NewTweet, NewUser, PublicUser, UserChanges};
use tweet_api::store::{ScyllaStore, StoreError, TweetStore, UniqueField, UserStore};

fn config() -> AppConfig {
    let mut config = AppConfig::from_env().expect("config");
    config.keyspace = "tweet_api_test".to_string();
    config
}

async fn store() -> ScyllaStore {
    ScyllaStore::connect(&config()).await.expect("scylla store")
}

fn random_user_id() -> String {
    format!("{:012}", Uuid::new_v4().as_u128() % 1_000_000_000_000)
}

fn new_user(user_id: &str, email: &str) -> NewUser {
    NewUser {
        user_id: user_id.to_string(),
        email: email.to_string(),
        password_hash: "hash".to_string(),
        first_name: "A".to_string(),
        last_name: "B".to_string(),
        birth_date: None,
    }
}

#[tokio::test]
#[ignore = "requires a running ScyllaDB node"]
async fn test_user_uniqueness_and_delete() {
    let store = store().await;
    let user_id = random_user_id();
    let email = format!("{}@example.com", Uuid::new_v4());

    let user = store.insert_user(new_user(&user_id, &email)).await.unwrap();
    assert_eq!(store.find_user(&user_id).await.unwrap(), Some(user.clone()));
    assert_eq!(store.find_user_by_email(&email).await.unwrap(), Some(user.clone()));

    let err = store
        .insert_user(new_user(&user_id, "other@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(UniqueField::UserId)));

    let other_id = random_user_id();
    let err = store.insert_user(new_user(&other_id, &email)).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(UniqueField::Email)));
    assert!(store.find_user(&other_id).await.unwrap().is_none());

    let changes = UserChanges {
        first_name: Some("Z".to_string()),
        ..Default::default()
    };
    let updated = store.update_user(&user_id, &changes).await.unwrap().unwrap();
    assert_eq!(updated.first_name, "Z");

    assert_eq!(store.delete_user(&user_id).await.unwrap(), Some(updated));
    assert!(store.delete_user(&user_id).await.unwrap().is_none());
    assert!(store.find_user_by_email(&email).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running ScyllaDB node"]
async fn test_stale_email_claim_is_taken_over() {
    let store = store().await;
    let session = db::create_session(&config()).await.unwrap();
    let email = format!("{}@example.com", Uuid::new_v4());

    // A claim left behind by a signup whose user row never landed.
    let ghost = random_user_id();
    session
        .query(
            "INSERT INTO tweet_api_test.users_by_email (email, user_id) VALUES (?, ?)",
            (&email, &ghost),
        )
        .await
        .unwrap();
    assert!(store.find_user_by_email(&email).await.unwrap().is_none());

    let user_id = random_user_id();
    let user = store.insert_user(new_user(&user_id, &email)).await.unwrap();
    assert_eq!(store.find_user_by_email(&email).await.unwrap(), Some(user));

    // The new owner is live, so the address is no longer up for grabs.
    let err = store
        .insert_user(new_user(&random_user_id(), &email))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(UniqueField::Email)));
    store.delete_user(&user_id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running ScyllaDB node"]
async fn test_tweet_lifecycle() {
    let store = store().await;
    let author = PublicUser {
        id: Uuid::new_v4().to_string(),
        user_id: random_user_id(),
        email: "a@b.com".to_string(),
        first_name: "A".to_string(),
        last_name: "B".to_string(),
        birth_date: None,
    };
    let created_at = now_millis();
    let tweet = store
        .insert_tweet(NewTweet {
            content: "hello".to_string(),
            created_at,
            by: author.clone(),
        })
        .await
        .unwrap();
    assert_eq!(store.find_tweet(tweet.id).await.unwrap(), Some(tweet.clone()));

    let later = created_at + chrono::Duration::seconds(1);
    let updated = store
        .update_tweet(tweet.id, "world", later)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.content, "world");
    assert_eq!(updated.updated_at, later);
    assert_eq!(updated.by, author);

    assert!(store.delete_tweet(tweet.id).await.unwrap().is_some());
    assert!(store.find_tweet(tweet.id).await.unwrap().is_none());
}
