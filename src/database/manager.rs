use sqlx::postgres::{PgConnectOptions, PgDatabaseError, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors surfaced by the store layer, already classified by how callers should react
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    /// Pool exhausted or closed, connection dropped, statement timed out.
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Foreign key violation on client_id {client_id:?}")]
    ForeignKeyViolation { client_id: Option<i32> },

    /// Serialization failure or deadlock reported by Postgres.
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    QueryError(String),
}

// SQLSTATE codes that drive classification
const FOREIGN_KEY_VIOLATION: &str = "23503";
const QUERY_CANCELED: &str = "57014";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => {
                DatabaseError::Unavailable("timed out acquiring a pooled connection".to_string())
            }
            sqlx::Error::PoolClosed => DatabaseError::Unavailable("connection pool is closed".to_string()),
            sqlx::Error::Io(e) => DatabaseError::Unavailable(e.to_string()),
            sqlx::Error::Tls(e) => DatabaseError::Unavailable(e.to_string()),
            sqlx::Error::WorkerCrashed => DatabaseError::Unavailable("database worker crashed".to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
                match code.as_str() {
                    FOREIGN_KEY_VIOLATION => {
                        let client_id = db_err
                            .try_downcast_ref::<PgDatabaseError>()
                            .and_then(|pg| pg.detail())
                            .and_then(parse_foreign_key_detail);
                        DatabaseError::ForeignKeyViolation { client_id }
                    }
                    QUERY_CANCELED => DatabaseError::Unavailable(db_err.message().to_string()),
                    SERIALIZATION_FAILURE | DEADLOCK_DETECTED => {
                        DatabaseError::Conflict(db_err.message().to_string())
                    }
                    _ => DatabaseError::QueryError(db_err.message().to_string()),
                }
            }
            other => DatabaseError::QueryError(other.to_string()),
        }
    }
}

/// Pull the offending key out of a Postgres foreign key detail such as
/// `Key (client_id)=(3) is not present in table "clients".`
pub fn parse_foreign_key_detail(detail: &str) -> Option<i32> {
    let rest = detail.strip_prefix("Key (client_id)=(")?;
    let end = rest.find(')')?;
    rest[..end].trim().parse().ok()
}

/// Builds the shared connection pool from configuration
pub struct DatabaseManager;

impl DatabaseManager {
    /// Create the pool without touching the network; connections open on first use
    /// so the process can start (and report degraded health) while Postgres is down.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let connection_string = Self::build_connection_string(config)?;
        let statement_timeout = format!("{}s", config.statement_timeout);
        let options = PgConnectOptions::from_str(&connection_string)
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?
            .options([("statement_timeout", statement_timeout.as_str())]);

        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .max_lifetime(Some(config.max_lifetime()))
            .connect_lazy_with(options);

        info!(
            host = %config.host,
            database = %config.name,
            min_connections = config.min_connections,
            max_connections = config.max_connections,
            "Created lazy database pool"
        );
        Ok(pool)
    }

    /// Use the configured URL as-is, otherwise compose one from the individual parts
    pub fn build_connection_string(config: &DatabaseConfig) -> Result<String, DatabaseError> {
        if let Some(raw) = &config.url {
            let url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
            return Ok(url.into());
        }

        let mut url = url::Url::parse("postgres://localhost").map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_host(Some(&config.host))
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_port(Some(config.port))
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_username(&config.user)
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !config.password.is_empty() {
            url.set_password(Some(&config.password))
                .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        }
        url.set_path(&format!("/{}", config.name));
        if config.ssl {
            url.query_pairs_mut().append_pair("sslmode", "require");
        }
        Ok(url.into())
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close(pool: &PgPool) {
        pool.close().await;
        info!("Closed database pool");
    }
}
