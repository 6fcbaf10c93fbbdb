use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use std::env;
use std::error::Error;

use tweet_api::build_state;
use tweet_api::config::AppConfig;
use tweet_api::error::ApiError;
use tweet_api::models::{CreateTweetRequest, PublicUser, SignupRequest, TWEET_MAX_LEN};
use tweet_api::services::AppState;

const SEED_PASSWORD: &str = "password123";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    println!("Starting data seeding...");

    let config = AppConfig::from_env()?;
    let state = build_state(&config).await?;

    let num_users = count_from_env("SEED_USERS", 100)?;
    let tweets_per_user = count_from_env("SEED_TWEETS_PER_USER", 20)?;

    let users = seed_users(&state, num_users).await?;
    seed_tweets(&state, &users, tweets_per_user).await?;

    println!("Seeding completed!");
    Ok(())
}

fn count_from_env(name: &str, default: usize) -> Result<usize, Box<dyn Error>> {
    match env::var(name) {
        Ok(raw) => Ok(raw.parse()?),
        Err(_) => Ok(default),
    }
}

async fn seed_users(state: &AppState, count: usize) -> Result<Vec<PublicUser>, Box<dyn Error>> {
    println!("Creating {} users...", count);
    let mut users = Vec::with_capacity(count);

    while users.len() < count {
        let request = SignupRequest {
            user_id: (100_000_000_000u64..1_000_000_000_000).fake::<u64>().to_string(),
            email: SafeEmail().fake(),
            password: SEED_PASSWORD.to_string(),
            first_name: FirstName().fake(),
            last_name: LastName().fake(),
            birth_date: None,
        };
        match state.users.create(request).await {
            Ok(user) => {
                println!(
                    "Created user {}/{}: {} {} ({})",
                    users.len() + 1,
                    count,
                    user.first_name,
                    user.last_name,
                    user.user_id
                );
                users.push(user);
            }
            // Fake ids and emails collide now and then; draw again.
            Err(ApiError::Conflict(reason)) => println!("Skipping duplicate: {}", reason),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(users)
}

async fn seed_tweets(
    state: &AppState,
    users: &[PublicUser],
    tweets_per_user: usize,
) -> Result<(), Box<dyn Error>> {
    println!("Creating {} tweets per user...", tweets_per_user);
    let total_tweets = users.len() * tweets_per_user;
    let mut current_tweet = 0;

    for user in users {
        for _ in 0..tweets_per_user {
            let content: String = Sentence(3..10).fake();
            let content: String = content.chars().take(TWEET_MAX_LEN).collect();
            state
                .tweets
                .create(CreateTweetRequest {
                    content,
                    by: user.clone(),
                })
                .await?;

            current_tweet += 1;
            if current_tweet % 100 == 0 {
                println!("Created {}/{} tweets", current_tweet, total_tweets);
            }
        }
    }

    Ok(())
}
