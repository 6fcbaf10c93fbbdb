use log::info;
use scylla::transport::errors::QueryError;
use scylla::{Session, SessionBuilder};

use crate::config::AppConfig;
use crate::store::StoreResult;

pub async fn create_session(config: &AppConfig) -> StoreResult<Session> {
    let mut builder = SessionBuilder::new();
    for node in &config.scylla_nodes {
        builder = builder.known_node(node);
    }
    let session = builder.build().await?;

    Ok(session)
}

/// Create the keyspace and tables if they are missing.
pub async fn init_schema(session: &Session, keyspace: &str) -> Result<(), QueryError> {
    info!("Ensuring schema in keyspace {}", keyspace);
    let statements = [
        format!(
            "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
            keyspace
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {}.users (user_id text PRIMARY KEY, id text, email text, password_hash text, first_name text, last_name text, birth_date text)",
            keyspace
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {}.users_by_email (email text PRIMARY KEY, user_id text)",
            keyspace
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {}.tweets (id uuid PRIMARY KEY, content text, created_at timestamp, updated_at timestamp, author text)",
            keyspace
        ),
    ];
    for statement in statements {
        session.query(statement, &[]).await?;
    }
    Ok(())
}
