use std::sync::Arc;

use querydesk_core::{BuiltQuery, QueryResult};

use crate::error::EngineError;
use crate::session::{release, ConnectionSession};

/// Runs filtered SELECTs, one fresh session per call.
pub struct QueryExecutor {
    session: Arc<ConnectionSession>,
}

impl QueryExecutor {
    #[must_use]
    pub fn new(session: Arc<ConnectionSession>) -> Self {
        Self { session }
    }

    /// Executes `query` and returns its headers and rows.
    ///
    /// The connection is closed before returning, on success and failure.
    ///
    /// # Errors
    ///
    /// [`EngineError::Connection`] if the session cannot be opened,
    /// [`EngineError::Query`] if the SELECT fails.
    pub async fn run(&self, query: &BuiltQuery) -> Result<QueryResult, EngineError> {
        let mut conn = self.session.open().await?;
        let outcome = conn.fetch_all(&query.sql, &query.binds).await;
        release(conn).await;

        let result = outcome.map_err(EngineError::Query)?;
        tracing::debug!(rows = result.rows.len(), "query executed");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use querydesk_core::{filter, BindMap, ParamMap, Row};
    use serde_json::json;

    use super::*;
    use crate::config::{ElevationConfig, Secret};
    use crate::session::{MemoryConnector, MemoryEvent};

    fn executor(connector: &MemoryConnector) -> QueryExecutor {
        let elevation = ElevationConfig {
            secret: Some(Secret::new("s")),
            ..ElevationConfig::default()
        };
        QueryExecutor::new(Arc::new(ConnectionSession::new(
            Arc::new(connector.clone()),
            elevation,
        )))
    }

    fn one_row() -> QueryResult {
        let mut row = Row::new();
        row.insert("ROWID".into(), json!("AAA"));
        row.insert("X".into(), json!(7));
        QueryResult {
            headers: vec!["ROWID".into(), "X".into()],
            rows: vec![row],
        }
    }

    #[tokio::test]
    async fn run_returns_rows_and_closes() {
        let connector = MemoryConnector::new().with_result(one_row());
        let mut params = ParamMap::new();
        params.insert("p".into(), "7".into());
        let built = filter::build("SELECT a.rowid, a.x FROM t a WHERE a.x = :p", &params);

        let result = executor(&connector).run(&built).await.unwrap();
        assert_eq!(result.headers, vec!["ROWID", "X"]);
        assert_eq!(result.rows[0]["ROWID"], "AAA");
        assert_eq!(connector.open_connections(), 0);

        let mut expected = BindMap::new();
        expected.insert("p".into(), "7".into());
        assert!(connector.events().contains(&MemoryEvent::Fetch {
            sql: "SELECT a.rowid, a.x FROM t a WHERE a.x = :p".into(),
            binds: expected,
        }));
    }

    #[tokio::test]
    async fn elided_query_reaches_backend_with_empty_binds() {
        let connector = MemoryConnector::new();
        let mut params = ParamMap::new();
        params.insert("p".into(), String::new());
        let built = filter::build("SELECT a.rowid, a.x FROM t a WHERE a.x = :p", &params);

        executor(&connector).run(&built).await.unwrap();
        assert!(connector.events().contains(&MemoryEvent::Fetch {
            sql: "SELECT a.rowid, a.x FROM t a WHERE a.x = 1=1".into(),
            binds: BindMap::new(),
        }));
    }

    #[tokio::test]
    async fn fetch_failure_is_surfaced_after_close() {
        let connector = MemoryConnector::new().fail_fetch();
        let built = filter::build("SELECT 1", &ParamMap::new());

        let err = executor(&connector).run(&built).await.unwrap_err();
        assert!(matches!(err, EngineError::Query(_)));
        assert!(err.to_string().contains("does not exist"));
        assert_eq!(connector.events().last(), Some(&MemoryEvent::Close));
        assert_eq!(connector.open_connections(), 0);
    }

    #[tokio::test]
    async fn elevation_failure_never_runs_select() {
        let connector = MemoryConnector::new().fail_elevation();
        let built = filter::build("SELECT 1", &ParamMap::new());

        let err = executor(&connector).run(&built).await.unwrap_err();
        assert!(matches!(err, EngineError::Connection(_)));
        assert!(!connector
            .events()
            .iter()
            .any(|e| matches!(e, MemoryEvent::Fetch { .. })));
    }
}
