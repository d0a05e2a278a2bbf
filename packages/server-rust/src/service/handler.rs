//! The query desk service: catalog lookups, filtered queries, and updates.
//!
//! All validation happens here, before a session is opened, in this order
//! for updates: query id, definition lookup, `target_table`, column
//! whitelist, row ids, identifier checks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use querydesk_core::{
    compile_update, filter, ExecuteRequest, QueryDefinition, QueryResponse, UpdateRequest,
    UpdateResponse, UpdateStatement, ValidationError,
};
use tower::Service;

use super::operation::{Operation, OperationResponse};
use crate::catalog::{CatalogError, QueryCatalog};
use crate::engine::{QueryExecutor, UpdateExecutor};
use crate::error::EngineError;
use crate::session::ConnectionSession;

pub struct QueryDeskService {
    catalog: Arc<dyn QueryCatalog>,
    queries: QueryExecutor,
    updates: UpdateExecutor,
}

impl QueryDeskService {
    #[must_use]
    pub fn new(catalog: Arc<dyn QueryCatalog>, session: Arc<ConnectionSession>) -> Self {
        Self {
            catalog,
            queries: QueryExecutor::new(Arc::clone(&session)),
            updates: UpdateExecutor::new(session),
        }
    }

    async fn handle(&self, op: Operation) -> Result<OperationResponse, EngineError> {
        match op {
            Operation::ListQueries { .. } => {
                let listing = self.with_catalog(|c| c.list()).await?;
                Ok(OperationResponse::Queries(listing))
            }
            Operation::GetQuery { query_id, .. } => {
                let definition = self.definition(query_id).await?;
                Ok(OperationResponse::Definition(Box::new(definition)))
            }
            Operation::SaveSql { query_id, sql, .. } => {
                self.save_sql(query_id, sql).await?;
                Ok(OperationResponse::Saved)
            }
            Operation::Execute { request, .. } => {
                self.execute(request).await.map(OperationResponse::Rows)
            }
            Operation::Update { request, .. } => {
                self.update(request).await.map(OperationResponse::Updated)
            }
        }
    }

    /// Runs a synchronous catalog call off the async runtime.
    async fn with_catalog<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn QueryCatalog) -> Result<T, CatalogError> + Send + 'static,
    {
        let catalog = Arc::clone(&self.catalog);
        let joined = tokio::task::spawn_blocking(move || f(catalog.as_ref()))
            .await
            .map_err(|e| CatalogError::Io(std::io::Error::other(e)))?;
        Ok(joined?)
    }

    async fn definition(&self, query_id: String) -> Result<QueryDefinition, EngineError> {
        if query_id.is_empty() {
            return Err(ValidationError::MissingField { field: "query_id" }.into());
        }
        self.with_catalog(move |c| {
            c.get_by_id(&query_id)?
                .ok_or(CatalogError::NotFound { id: query_id })
        })
        .await
    }

    async fn save_sql(&self, query_id: String, sql: String) -> Result<(), EngineError> {
        if query_id.is_empty() {
            return Err(ValidationError::MissingField { field: "query_id" }.into());
        }
        if sql.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "sql" }.into());
        }
        self.with_catalog(move |c| c.replace_sql(&query_id, &sql))
            .await
    }

    async fn execute(&self, request: ExecuteRequest) -> Result<QueryResponse, EngineError> {
        let definition = self.definition(request.query_id).await?;
        let built = filter::build(&definition.sql, &request.params);

        tracing::info!(query_id = %definition.id, binds = built.binds.len(), "executing query");
        let result = self.queries.run(&built).await?;
        Ok(QueryResponse::new(result, definition.update_rules))
    }

    async fn update(&self, request: UpdateRequest) -> Result<UpdateResponse, EngineError> {
        let definition = self.definition(request.query_id).await?;
        let table = match definition.target_table.as_deref() {
            Some(table) if definition.permits_updates() => table,
            _ => {
                return Err(ValidationError::NotUpdatable {
                    query_id: definition.id,
                }
                .into())
            }
        };

        let compiled = compile_update(&definition.update_rules, &request.updates)?;
        if request.rowids.is_empty() {
            return Err(ValidationError::NoRowIds.into());
        }
        let skipped = compiled.skipped.len();
        let statement = UpdateStatement::new(table, definition.row_id_column(), compiled)?;

        tracing::info!(
            query_id = %definition.id,
            table = %table,
            rows = request.rowids.len(),
            skipped,
            "applying update"
        );
        let updated = self.updates.apply(&statement, &request.rowids).await?;
        Ok(UpdateResponse::committed(updated))
    }
}

impl Service<Operation> for Arc<QueryDeskService> {
    type Response = OperationResponse;
    type Error = EngineError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, EngineError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let svc = Arc::clone(self);
        Box::pin(async move { svc.handle(op).await })
    }
}
