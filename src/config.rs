use log::{debug, info, warn};
use std::env;
use std::str::FromStr;

/// Cost bounds accepted by bcrypt.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Which persistence layer the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Scylla,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scylla" => Ok(StoreBackend::Scylla),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::InvalidValue {
                name: "STORE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub backend: StoreBackend,
    pub scylla_nodes: Vec<String>,
    pub keyspace: String,
    pub bcrypt_cost: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: num_cpus::get(),
            backend: StoreBackend::Scylla,
            scylla_nodes: vec!["127.0.0.1:9042".to_string()],
            keyspace: "tweet_api".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Recognised variables: `APP_HOST`, `APP_PORT`, `HTTP_WORKERS`,
    /// `STORE_BACKEND`, `SCYLLA_NODES`, `SCYLLA_KEYSPACE`, `BCRYPT_COST`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`AppConfig::from_env`] but reads values through `lookup`,
    /// which keeps parsing testable without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        info!("Loading application configuration");
        let defaults = AppConfig::default();

        let host = lookup("APP_HOST").unwrap_or(defaults.host);
        debug!("Bind host: {}", host);

        let port = parse_or("APP_PORT", lookup("APP_PORT"), defaults.port)?;
        debug!("Bind port: {}", port);

        let workers = parse_or("HTTP_WORKERS", lookup("HTTP_WORKERS"), defaults.workers)?;
        debug!("HTTP workers: {}", workers);

        let backend = match lookup("STORE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.backend,
        };
        debug!("Store backend: {:?}", backend);

        let scylla_nodes = match lookup("SCYLLA_NODES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|node| !node.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.scylla_nodes,
        };
        debug!("ScyllaDB nodes: {:?}", scylla_nodes);

        let keyspace = lookup("SCYLLA_KEYSPACE").unwrap_or(defaults.keyspace);
        debug!("ScyllaDB keyspace: {}", keyspace);

        let bcrypt_cost = match lookup("BCRYPT_COST") {
            Some(raw) => parse_or("BCRYPT_COST", Some(raw), defaults.bcrypt_cost)?,
            None => {
                warn!("BCRYPT_COST not set, using default: {}", defaults.bcrypt_cost);
                defaults.bcrypt_cost
            }
        };

        let config = AppConfig {
            host,
            port,
            workers,
            backend,
            scylla_nodes,
            keyspace,
            bcrypt_cost,
        };
        config.validate()?;
        info!("Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::ValidationError("APP_HOST cannot be empty".to_string()));
        }
        if self.workers == 0 {
            return Err(ConfigError::ValidationError(
                "HTTP_WORKERS must be greater than 0".to_string(),
            ));
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::ValidationError(format!(
                "BCRYPT_COST must be between {} and {}",
                MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }
        if self.backend == StoreBackend::Scylla {
            if self.scylla_nodes.is_empty() {
                return Err(ConfigError::ValidationError(
                    "SCYLLA_NODES must name at least one node".to_string(),
                ));
            }
            // The keyspace is interpolated into DDL, so only identifier characters are allowed.
            let valid_keyspace = !self.keyspace.is_empty()
                && self.keyspace.len() <= 48
                && self
                    .keyspace
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid_keyspace {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid SCYLLA_KEYSPACE: {}",
                    self.keyspace
                )));
            }
        }
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_or<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}
