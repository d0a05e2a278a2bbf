//! Process configuration.
//!
//! [`Cli`] is parsed once at startup from flags and environment variables
//! (the `DB_*` names match existing `.env` files) and split into the typed
//! configs each subsystem consumes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::network::NetworkConfig;
use crate::service::ServiceConfig;

/// Control-table read that yields the role a session must assume.
pub const DEFAULT_ROLE_QUERY: &str = "SELECT cbd_use_role FROM controle_bd";

/// Role elevation statement. `{role}` and `{secret}` are substituted at
/// session-open time.
pub const DEFAULT_ELEVATION_TEMPLATE: &str = "SET ROLE {role} IDENTIFIED BY \"{secret}\"";

/// Elevation statement for `PostgreSQL`, where `SET ROLE` takes no password
/// and is authorized by role membership. The secret is still required to be
/// configured before any session opens.
pub const POSTGRES_ELEVATION_TEMPLATE: &str = "SET ROLE {role}";

/// A configuration value that must never be printed.
///
/// `Debug` is redacted and there is no `Display` or `Serialize`; the only
/// way to read it is [`Secret::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl FromStr for Secret {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// Connection parameters for the relational store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    /// Database (service) name.
    pub database: String,
    pub user: String,
    pub password: Secret,
    /// Server-side statement timeout applied to every session.
    pub statement_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: String::new(),
            user: String::new(),
            password: Secret::new(""),
            statement_timeout: Duration::from_secs(30),
        }
    }
}

/// Settings for the mandatory role elevation step.
#[derive(Debug, Clone)]
pub struct ElevationConfig {
    /// Query returning a single row with the role name.
    pub role_query: String,
    /// Statement template with `{role}` and `{secret}` tokens.
    pub template: String,
    /// Role password. Elevation fails when unset.
    pub secret: Option<Secret>,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            role_query: DEFAULT_ROLE_QUERY.to_string(),
            template: DEFAULT_ELEVATION_TEMPLATE.to_string(),
            secret: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Command-line / environment configuration for the `querydesk` binary.
#[derive(Debug, Parser)]
#[command(name = "querydesk", version, about = "Catalog-driven query and row update service")]
pub struct Cli {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = "QUERYDESK_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on (0 = OS-assigned).
    #[arg(long, env = "QUERYDESK_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Path of the JSON query catalog.
    #[arg(long, env = "QUERYDESK_CATALOG", default_value = "queries.json")]
    pub catalog: PathBuf,

    #[arg(long, env = "DB_HOST")]
    pub db_host: String,

    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    /// Database / service name.
    #[arg(long, env = "DB_SERVICE")]
    pub db_service: String,

    #[arg(long, env = "DB_USER")]
    pub db_user: String,

    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Secret,

    /// Password of the role assumed on every session.
    #[arg(long, env = "DB_ROLE_PASSWORD", hide_env_values = true)]
    pub role_secret: Option<Secret>,

    #[arg(long, env = "QUERYDESK_ROLE_QUERY", default_value = DEFAULT_ROLE_QUERY)]
    pub role_query: String,

    /// Role elevation statement; defaults to the backend's own dialect.
    #[arg(long, env = "QUERYDESK_ELEVATION_TEMPLATE")]
    pub elevation_template: Option<String>,

    /// Server-side statement timeout in milliseconds.
    #[arg(long, env = "QUERYDESK_STATEMENT_TIMEOUT_MS", default_value_t = 30_000)]
    pub statement_timeout_ms: u64,

    /// Upper bound for one query or update operation in milliseconds.
    #[arg(long, env = "QUERYDESK_OPERATION_TIMEOUT_MS", default_value_t = 60_000)]
    pub operation_timeout_ms: u64,

    /// Concurrent operations accepted before load shedding.
    #[arg(long, env = "QUERYDESK_MAX_CONCURRENT", default_value_t = 64)]
    pub max_concurrent_operations: u32,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "QUERYDESK_REQUEST_TIMEOUT_SECS", default_value_t = 90)]
    pub request_timeout_secs: u64,

    /// Allowed CORS origins, comma separated.
    #[arg(long, env = "QUERYDESK_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    #[arg(long, env = "QUERYDESK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Cli {
    #[must_use]
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            host: self.db_host.clone(),
            port: self.db_port,
            database: self.db_service.clone(),
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            statement_timeout: Duration::from_millis(self.statement_timeout_ms),
        }
    }

    /// Elevation settings, using `backend_template` unless a template was
    /// given explicitly.
    #[must_use]
    pub fn elevation_config(&self, backend_template: &str) -> ElevationConfig {
        ElevationConfig {
            role_query: self.role_query.clone(),
            template: self
                .elevation_template
                .clone()
                .unwrap_or_else(|| backend_template.to_string()),
            secret: self.role_secret.clone().filter(|s| !s.is_empty()),
        }
    }

    #[must_use]
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            operation_timeout_ms: self.operation_timeout_ms,
            max_concurrent_operations: self.max_concurrent_operations,
        }
    }

    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..NetworkConfig::default()
        }
    }
}
