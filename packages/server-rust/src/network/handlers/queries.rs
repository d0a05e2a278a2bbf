//! Catalog, query, and update API endpoints.
//!
//! Each handler turns the request into an [`Operation`], runs it through the
//! pipeline, and renders the response. Failures become [`ApiError`] JSON.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use querydesk_core::{
    ExecuteRequest, QueryDefinition, QueryListing, QueryResponse, UpdateRequest, UpdateResponse,
};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

use super::{ApiError, AppState};
use crate::error::ErrorKind;
use crate::service::{Operation, OperationContext, OperationResponse};

/// Body of `POST /api/query/{id}`.
#[derive(Debug, Deserialize)]
pub struct SaveSqlRequest {
    #[serde(default)]
    pub sql: String,
}

#[derive(Debug, Serialize)]
pub struct SaveSqlResponse {
    pub success: bool,
    pub message: String,
}

/// Admits, tracks, and runs one operation.
async fn dispatch(
    state: &AppState,
    make_op: impl FnOnce(OperationContext) -> Operation,
) -> Result<OperationResponse, ApiError> {
    if !state.shutdown.is_accepting() {
        return Err(ApiError::new(
            ErrorKind::Unavailable,
            "server is not accepting requests",
        ));
    }
    let _guard = state.shutdown.in_flight_guard();

    let op = make_op(state.next_context());
    let name = op.name();
    let response = state.pipeline.clone().oneshot(op).await?;
    tracing::debug!(operation = name, "operation dispatched");
    Ok(response)
}

fn unexpected(response: &OperationResponse) -> ApiError {
    tracing::error!(?response, "pipeline returned a mismatched response");
    ApiError::new(ErrorKind::Execution, "unexpected operation response")
}

/// `GET /api/queries`
pub async fn list_queries_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<QueryListing>>, ApiError> {
    match dispatch(&state, |ctx| Operation::ListQueries { ctx }).await? {
        OperationResponse::Queries(listing) => Ok(Json(listing)),
        other => Err(unexpected(&other)),
    }
}

/// `GET /api/query/{id}`
pub async fn get_query_handler(
    State(state): State<AppState>,
    Path(query_id): Path<String>,
) -> Result<Json<QueryDefinition>, ApiError> {
    match dispatch(&state, |ctx| Operation::GetQuery { ctx, query_id }).await? {
        OperationResponse::Definition(definition) => Ok(Json(*definition)),
        other => Err(unexpected(&other)),
    }
}

/// `POST /api/query/{id}`: replaces the stored SQL template.
pub async fn save_query_handler(
    State(state): State<AppState>,
    Path(query_id): Path<String>,
    payload: Result<Json<SaveSqlRequest>, JsonRejection>,
) -> Result<Json<SaveSqlResponse>, ApiError> {
    let Json(body) = payload?;
    match dispatch(&state, |ctx| Operation::SaveSql {
        ctx,
        query_id,
        sql: body.sql,
    })
    .await?
    {
        OperationResponse::Saved => Ok(Json(SaveSqlResponse {
            success: true,
            message: "Query saved.".to_string(),
        })),
        other => Err(unexpected(&other)),
    }
}

/// `POST /api/execute`
///
/// An empty result set is answered with 404 `no records found`.
pub async fn execute_handler(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload?;
    match dispatch(&state, |ctx| Operation::Execute { ctx, request }).await? {
        OperationResponse::Rows(rows) if rows.rows.is_empty() => {
            Err(ApiError::new(ErrorKind::NotFound, "no records found"))
        }
        OperationResponse::Rows(rows) => Ok(Json(rows)),
        other => Err(unexpected(&other)),
    }
}

/// `POST /api/update`
pub async fn update_handler(
    State(state): State<AppState>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let Json(request) = payload?;
    match dispatch(&state, |ctx| Operation::Update { ctx, request }).await? {
        OperationResponse::Updated(outcome) => Ok(Json(outcome)),
        other => Err(unexpected(&other)),
    }
}
