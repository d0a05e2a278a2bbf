use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::definition::UpdateRules;

/// Bind parameter name -> value, in insertion order.
///
/// Values are always sent to the driver out-of-band; they never become part
/// of the SQL text.
pub type BindMap = IndexMap<String, String>;

/// Caller-supplied name -> value map (filters or column updates).
///
/// Insertion order is preserved from the inbound JSON object, which is the
/// order [`compile_update`](crate::update::compile_update) walks.
pub type ParamMap = IndexMap<String, String>;

/// One result row: column header -> value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Materialized result of one SELECT execution.
///
/// Produced fresh per execution and never persisted. By convention the first
/// header is the opaque row identifier used to target later updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in result order.
    pub headers: Vec<String>,
    /// Rows keyed by header name.
    pub rows: Vec<Row>,
}

/// Inbound request to run a catalog query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Catalog id of the definition to run.
    #[serde(default)]
    pub query_id: String,
    /// Filter name -> value. Empty values mark the filter as absent.
    #[serde(default)]
    pub params: ParamMap,
}

/// Inbound request to update previously fetched rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Catalog id of the definition whose result produced the rows.
    #[serde(default)]
    pub query_id: String,
    /// Opaque row identifiers taken from a prior [`QueryResult`].
    #[serde(default)]
    pub rowids: Vec<String>,
    /// Column name -> new value, in caller order.
    #[serde(default)]
    pub updates: ParamMap,
}

/// Outbound query result with the definition's update rules echoed back so
/// the caller knows which columns it may edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub update_rules: UpdateRules,
}

impl QueryResponse {
    #[must_use]
    pub fn new(result: QueryResult, update_rules: UpdateRules) -> Self {
        Self {
            headers: result.headers,
            rows: result.rows,
            update_rules,
        }
    }
}

/// Outbound update outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub updated_count: u64,
    pub message: String,
}

impl UpdateResponse {
    /// Successful outcome for `updated_count` committed rows.
    #[must_use]
    pub fn committed(updated_count: u64) -> Self {
        Self {
            success: true,
            updated_count,
            message: format!("{updated_count} rows were updated and committed."),
        }
    }
}
