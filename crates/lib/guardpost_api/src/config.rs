//! API server configuration.

use guardpost_core::identity::IdentityConfig;
use guardpost_core::identity::config::IdentityConfigError;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Maximum number of pooled database connections.
    pub max_connections: u32,
    /// Identity provider settings.
    pub identity: IdentityConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable             | Default                               |
    /// |----------------------|---------------------------------------|
    /// | `BIND_ADDR`          | `127.0.0.1:3100`                      |
    /// | `DATABASE_URL`       | `postgres://localhost:5432/guardpost` |
    /// | `DB_MAX_CONNECTIONS` | `5`                                   |
    /// | `IDP_*`              | see [`IdentityConfig::from_env`]      |
    pub fn from_env() -> Result<Self, IdentityConfigError> {
        let max_connections = match std::env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                IdentityConfigError::Invalid(format!("DB_MAX_CONNECTIONS is not a number: {raw:?}"))
            })?,
            Err(_) => 5,
        };
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/guardpost".into()),
            max_connections,
            identity: IdentityConfig::from_env()?,
        })
    }
}
