//! Scripted in-memory [`Connector`].
//!
//! [`MemoryConnector`] executes nothing. It records every call as a
//! [`MemoryEvent`], answers the control-table read with a configurable role,
//! returns a canned [`QueryResult`] for every SELECT, and can be told to fail
//! at connect, elevation, or the n-th transactional statement. Useful for
//! testing the session and executor protocols without a database.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use querydesk_core::{BindMap, QueryResult};

use super::{Connection, Connector, Transaction};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryEvent {
    Connect,
    Scalar(String),
    Unprepared(String),
    Fetch { sql: String, binds: BindMap },
    Begin,
    Execute { sql: String, binds: BindMap },
    Commit,
    Rollback,
    Close,
}

#[derive(Debug, Default)]
struct MemoryState {
    role: Option<String>,
    result: QueryResult,
    fail_connect: bool,
    fail_elevation: bool,
    fail_fetch: bool,
    /// 1-based index of the transactional statement that fails.
    fail_execute_on: Option<usize>,
    executes: usize,
    opened: usize,
    closed: usize,
    events: Vec<MemoryEvent>,
}

/// In-memory connector. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    /// Creates a connector whose control table yields `APP_ROLE`.
    #[must_use]
    pub fn new() -> Self {
        let state = MemoryState {
            role: Some("APP_ROLE".to_string()),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    #[must_use]
    pub fn with_role(self, role: &str) -> Self {
        self.state.lock().role = Some(role.to_string());
        self
    }

    /// Control table returns no rows.
    #[must_use]
    pub fn without_role(self) -> Self {
        self.state.lock().role = None;
        self
    }

    /// Result returned for every SELECT.
    #[must_use]
    pub fn with_result(self, result: QueryResult) -> Self {
        self.state.lock().result = result;
        self
    }

    #[must_use]
    pub fn fail_connect(self) -> Self {
        self.state.lock().fail_connect = true;
        self
    }

    #[must_use]
    pub fn fail_elevation(self) -> Self {
        self.state.lock().fail_elevation = true;
        self
    }

    #[must_use]
    pub fn fail_fetch(self) -> Self {
        self.state.lock().fail_fetch = true;
        self
    }

    /// Makes the `n`-th (1-based) transactional statement fail.
    #[must_use]
    pub fn fail_execute_on(self, n: usize) -> Self {
        self.state.lock().fail_execute_on = Some(n);
        self
    }

    /// Every call recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<MemoryEvent> {
        self.state.lock().events.clone()
    }

    /// Number of successful connects.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state.lock().opened
    }

    /// Connections opened and not yet closed.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        let state = self.state.lock();
        state.opened - state.closed
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> anyhow::Result<Box<dyn Connection>> {
        let mut state = self.state.lock();
        if state.fail_connect {
            anyhow::bail!("connection refused");
        }
        state.opened += 1;
        state.events.push(MemoryEvent::Connect);
        Ok(Box::new(MemoryConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn query_scalar(&mut self, sql: &str) -> anyhow::Result<Option<String>> {
        let mut state = self.state.lock();
        state.events.push(MemoryEvent::Scalar(sql.to_string()));
        Ok(state.role.clone())
    }

    async fn execute_unprepared(&mut self, sql: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        if state.fail_elevation {
            anyhow::bail!("insufficient privileges executing: {sql}");
        }
        state.events.push(MemoryEvent::Unprepared(sql.to_string()));
        Ok(())
    }

    async fn fetch_all(&mut self, sql: &str, binds: &BindMap) -> anyhow::Result<QueryResult> {
        let mut state = self.state.lock();
        state.events.push(MemoryEvent::Fetch {
            sql: sql.to_string(),
            binds: binds.clone(),
        });
        if state.fail_fetch {
            anyhow::bail!("table or view does not exist");
        }
        Ok(state.result.clone())
    }

    async fn begin<'c>(&'c mut self) -> anyhow::Result<Box<dyn Transaction + 'c>> {
        self.state.lock().events.push(MemoryEvent::Begin);
        Ok(Box::new(MemoryTransaction { conn: self }))
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.closed += 1;
        state.events.push(MemoryEvent::Close);
        Ok(())
    }
}

struct MemoryTransaction<'c> {
    conn: &'c mut MemoryConnection,
}

#[async_trait]
impl<'c> Transaction for MemoryTransaction<'c> {
    async fn execute(&mut self, sql: &str, binds: &BindMap) -> anyhow::Result<u64> {
        let mut state = self.conn.state.lock();
        state.executes += 1;
        state.events.push(MemoryEvent::Execute {
            sql: sql.to_string(),
            binds: binds.clone(),
        });
        if state.fail_execute_on == Some(state.executes) {
            anyhow::bail!("unique constraint violated");
        }
        Ok(1)
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.conn.state.lock().events.push(MemoryEvent::Commit);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        self.conn.state.lock().events.push(MemoryEvent::Rollback);
        Ok(())
    }
}
