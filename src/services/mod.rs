mod auth;
mod tweets;
mod users;

pub use self::auth::AuthGateway;
pub use self::tweets::TweetFeed;
pub use self::users::UserDirectory;

use std::sync::Arc;

use crate::password::PasswordHasher;
use crate::store::{TweetStore, UserStore};

/// Everything the HTTP handlers need, shared across workers.
#[derive(Clone)]
pub struct AppState {
    pub users: UserDirectory,
    pub tweets: TweetFeed,
    pub auth: AuthGateway,
}

impl AppState {
    pub fn new(
        user_store: Arc<dyn UserStore>,
        tweet_store: Arc<dyn TweetStore>,
        hasher: PasswordHasher,
    ) -> Self {
        AppState {
            users: UserDirectory::new(user_store.clone(), hasher),
            tweets: TweetFeed::new(tweet_store),
            auth: AuthGateway::new(user_store, hasher),
        }
    }

    /// State over a single store that holds both collections.
    pub fn with_store<S>(store: Arc<S>, hasher: PasswordHasher) -> Self
    where
        S: UserStore + TweetStore + 'static,
    {
        AppState::new(store.clone(), store, hasher)
    }
}
