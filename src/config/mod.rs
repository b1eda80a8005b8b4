use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection string; when set it wins over the individual parts below.
    pub url: Option<String>,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub ssl: bool,
    pub min_connections: u32,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection.
    pub connection_timeout: u64,
    /// Seconds a connection may sit idle before being closed.
    pub idle_timeout: u64,
    /// Seconds before a connection is recycled regardless of use.
    pub max_lifetime: u64,
    /// Seconds before Postgres cancels a single statement.
    pub statement_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub title: String,
    pub description: String,
    pub version: String,
    pub max_batch_size: usize,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl AppConfig {
    /// Build from the process environment. An explicit `profile` (the
    /// `--environment` flag) takes precedence over `ENVIRONMENT`/`APP_ENV`.
    pub fn from_env(profile: Option<&str>) -> Self {
        Self::from_lookup(|key| match (key, profile) {
            ("ENVIRONMENT", Some(profile)) => Some(profile.to_string()),
            _ => env::var(key).ok(),
        })
    }

    /// Build a config from an arbitrary key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let selector = lookup("ENVIRONMENT").or_else(|| lookup("APP_ENV"));
        let environment = match selector.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&lookup)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = lookup("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("SERVER_PORT").or_else(|| lookup("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = lookup("SERVER_DEBUG") {
            self.server.debug = v.parse().unwrap_or(self.server.debug);
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Some(v) = lookup("DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = lookup("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = lookup("DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = lookup("DB_PORT") {
            self.database.port = v.parse().unwrap_or(self.database.port);
        }
        if let Some(v) = lookup("DB_DATABASE") {
            self.database.name = v;
        }
        if let Some(v) = lookup("DB_SSL") {
            self.database.ssl = v.parse().unwrap_or(self.database.ssl);
        }
        if let Some(v) = lookup("DB_MIN_CONNECTIONS") {
            self.database.min_connections = v.parse().unwrap_or(self.database.min_connections);
        }
        if let Some(v) = lookup("DB_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DB_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Some(v) = lookup("DB_IDLE_TIMEOUT") {
            self.database.idle_timeout = v.parse().unwrap_or(self.database.idle_timeout);
        }
        if let Some(v) = lookup("DB_MAX_LIFETIME") {
            self.database.max_lifetime = v.parse().unwrap_or(self.database.max_lifetime);
        }
        if let Some(v) = lookup("DB_STATEMENT_TIMEOUT") {
            self.database.statement_timeout = v.parse().unwrap_or(self.database.statement_timeout);
        }

        // API overrides
        if let Some(v) = lookup("API_TITLE") {
            self.api.title = v;
        }
        if let Some(v) = lookup("API_MAX_BATCH_SIZE") {
            self.api.max_batch_size = v.parse().unwrap_or(self.api.max_batch_size);
        }
        if let Some(v) = lookup("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Some(v) = lookup("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }
        if let Some(v) = lookup("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // CORS overrides
        if let Some(v) = lookup("CORS_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = split_list(&v);
        }
        if let Some(v) = lookup("CORS_ALLOW_CREDENTIALS") {
            self.cors.allow_credentials = v.parse().unwrap_or(self.cors.allow_credentials);
        }
        if let Some(v) = lookup("CORS_ALLOW_METHODS") {
            self.cors.allow_methods = split_list(&v);
        }
        if let Some(v) = lookup("CORS_ALLOW_HEADERS") {
            self.cors.allow_headers = split_list(&v);
        }

        self
    }

    /// Reject combinations the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.max_batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "api.max_batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.api.max_page_size < 1 {
            return Err(ConfigError::Invalid {
                field: "api.max_page_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.api.default_page_size < 1 || self.api.default_page_size > self.api.max_page_size {
            return Err(ConfigError::Invalid {
                field: "api.default_page_size",
                reason: format!("must be between 1 and {}", self.api.max_page_size),
            });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "database.max_connections",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                field: "database.min_connections",
                reason: format!("must not exceed max_connections ({})", self.database.max_connections),
            });
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Default `RUST_LOG` filter when none is set
    pub fn default_log_level(&self) -> &'static str {
        if self.server.debug {
            "debug"
        } else {
            "info"
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                debug: true,
            },
            database: DatabaseConfig::default(),
            api: ApiConfig::default(),
            cors: CorsConfig {
                allowed_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ],
                ..CorsConfig::default()
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8001,
                debug: false,
            },
            database: DatabaseConfig::default(),
            api: ApiConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: "admin".to_string(),
            password: String::new(),
            host: "localhost".to_string(),
            port: 5432,
            name: "xlite".to_string(),
            ssl: false,
            min_connections: 5,
            max_connections: 20,
            connection_timeout: 10,
            idle_timeout: 30,
            max_lifetime: 30 * 60,
            statement_timeout: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            title: "Call Records API".to_string(),
            description: "REST API for call records".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            max_batch_size: 1000,
            default_page_size: 50,
            max_page_size: 1000,
            max_request_size_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allow_credentials: true,
            allow_methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "PUT".to_string(),
                "DELETE".to_string(),
            ],
            allow_headers: vec!["*".to_string()],
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
