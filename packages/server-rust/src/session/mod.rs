//! Role-elevated database sessions.
//!
//! The backend seam is three traits:
//!
//! - [`Connector`]: opens a raw connection with configured credentials
//! - [`Connection`]: one open connection (control-table read, SELECT, begin)
//! - [`Transaction`]: statements executed under `begin`, ended by commit or rollback
//!
//! [`ConnectionSession`] is the only way engine code obtains a connection. It
//! performs the role elevation step and never hands out a connection on which
//! that step did not succeed.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use querydesk_core::placeholder::is_identifier;
use querydesk_core::{BindMap, QueryResult};

use crate::config::{ElevationConfig, Secret};
use crate::error::EngineError;

pub use memory::{MemoryConnector, MemoryEvent};
#[cfg(feature = "postgres")]
pub use postgres::PgConnector;

/// Opens raw connections to the relational store.
///
/// Used as `Arc<dyn Connector>`.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect with the configured credentials. No role is assumed yet.
    async fn connect(&self) -> anyhow::Result<Box<dyn Connection>>;
}

/// One open database connection.
#[async_trait]
pub trait Connection: Send {
    /// Runs `sql` and returns the first column of the first row as text.
    async fn query_scalar(&mut self, sql: &str) -> anyhow::Result<Option<String>>;

    /// Runs a statement without parameters or result rows.
    async fn execute_unprepared(&mut self, sql: &str) -> anyhow::Result<()>;

    /// Runs a SELECT with named binds and materializes every row.
    async fn fetch_all(&mut self, sql: &str, binds: &BindMap) -> anyhow::Result<QueryResult>;

    /// Starts a transaction that borrows this connection until it ends.
    async fn begin<'c>(&'c mut self) -> anyhow::Result<Box<dyn Transaction + 'c>>;

    /// Closes the connection.
    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}

/// An open transaction.
#[async_trait]
pub trait Transaction: Send {
    /// Executes one statement with named binds, returning rows affected.
    async fn execute(&mut self, sql: &str, binds: &BindMap) -> anyhow::Result<u64>;

    async fn commit(self: Box<Self>) -> anyhow::Result<()>;

    async fn rollback(self: Box<Self>) -> anyhow::Result<()>;
}

/// The role elevation step run on every new connection.
#[derive(Debug, Clone)]
pub struct RoleElevation {
    role_query: String,
    template: String,
    secret: Option<Secret>,
}

impl RoleElevation {
    #[must_use]
    pub fn new(config: ElevationConfig) -> Self {
        Self {
            role_query: config.role_query,
            template: config.template,
            secret: config.secret,
        }
    }

    /// Reads the required role from the control table and assumes it.
    ///
    /// # Errors
    ///
    /// Fails when the secret is not configured or contains a double quote,
    /// when the control table yields no role or a role that is not a plain
    /// identifier, or when the elevation statement itself fails. The last
    /// case carries a fixed message without the driver's text, so it never
    /// contains the secret.
    pub async fn apply(&self, conn: &mut dyn Connection) -> anyhow::Result<()> {
        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("role secret is not configured"))?;
        if secret.expose().contains('"') {
            anyhow::bail!("role secret must not contain a double quote");
        }

        let role = conn
            .query_scalar(&self.role_query)
            .await
            .map_err(|e| e.context("reading required role from control table"))?
            .ok_or_else(|| anyhow::anyhow!("control table returned no role"))?;
        let role = role.trim();
        if !is_identifier(role) {
            anyhow::bail!("control table returned an invalid role name");
        }

        let statement = self
            .template
            .replace("{role}", role)
            .replace("{secret}", secret.expose());
        // Driver text may echo the statement, so none of it is forwarded.
        if conn.execute_unprepared(&statement).await.is_err() {
            anyhow::bail!("setting role {role} failed");
        }

        tracing::debug!(role = %role, "session role elevated");
        Ok(())
    }
}

/// Opens connections and elevates their role before handing them out.
pub struct ConnectionSession {
    connector: Arc<dyn Connector>,
    elevation: RoleElevation,
}

impl ConnectionSession {
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, elevation: ElevationConfig) -> Self {
        Self {
            connector,
            elevation: RoleElevation::new(elevation),
        }
    }

    /// Opens a connection with the elevated role.
    ///
    /// If elevation fails the half-open connection is closed before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Connection`] when connecting or elevating fails.
    pub async fn open(&self) -> Result<Box<dyn Connection>, EngineError> {
        let mut conn = self
            .connector
            .connect()
            .await
            .map_err(EngineError::Connection)?;

        if let Err(e) = self.elevation.apply(conn.as_mut()).await {
            tracing::warn!(error = %e, "role elevation failed, closing connection");
            release(conn).await;
            return Err(EngineError::Connection(e));
        }
        Ok(conn)
    }
}

/// Closes `conn`, logging rather than propagating a close failure.
pub async fn release(conn: Box<dyn Connection>) {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "failed to close database connection");
    }
}
