//! Operation types flowing through the service pipeline.

use querydesk_core::{
    ExecuteRequest, QueryDefinition, QueryListing, QueryResponse, UpdateRequest, UpdateResponse,
};

/// Context carried with every operation through the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct OperationContext {
    pub call_id: u64,
    pub call_timeout_ms: u64,
}

impl OperationContext {
    #[must_use]
    pub fn new(call_id: u64, call_timeout_ms: u64) -> Self {
        Self {
            call_id,
            call_timeout_ms,
        }
    }
}

/// One engine call.
#[derive(Debug)]
pub enum Operation {
    /// Catalog listing.
    ListQueries { ctx: OperationContext },
    /// Full definition by id.
    GetQuery {
        ctx: OperationContext,
        query_id: String,
    },
    /// Replace a definition's SQL template.
    SaveSql {
        ctx: OperationContext,
        query_id: String,
        sql: String,
    },
    /// Run a catalog query with optional filters.
    Execute {
        ctx: OperationContext,
        request: ExecuteRequest,
    },
    /// Apply whitelisted column updates to selected rows.
    Update {
        ctx: OperationContext,
        request: UpdateRequest,
    },
}

impl Operation {
    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        match self {
            Self::ListQueries { ctx }
            | Self::GetQuery { ctx, .. }
            | Self::SaveSql { ctx, .. }
            | Self::Execute { ctx, .. }
            | Self::Update { ctx, .. } => ctx,
        }
    }

    /// Short name used in spans and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListQueries { .. } => "list_queries",
            Self::GetQuery { .. } => "get_query",
            Self::SaveSql { .. } => "save_sql",
            Self::Execute { .. } => "execute",
            Self::Update { .. } => "update",
        }
    }

    /// Catalog id the operation refers to, if any.
    #[must_use]
    pub fn query_id(&self) -> Option<&str> {
        match self {
            Self::ListQueries { .. } => None,
            Self::GetQuery { query_id, .. } | Self::SaveSql { query_id, .. } => Some(query_id),
            Self::Execute { request, .. } => Some(&request.query_id),
            Self::Update { request, .. } => Some(&request.query_id),
        }
    }
}

/// Successful response from the service.
#[derive(Debug)]
pub enum OperationResponse {
    Queries(Vec<QueryListing>),
    Definition(Box<QueryDefinition>),
    Saved,
    Rows(QueryResponse),
    Updated(UpdateResponse),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctx_and_names_cover_every_variant() {
        let ctx = OperationContext::new(7, 1000);
        let ops = [
            Operation::ListQueries { ctx },
            Operation::GetQuery {
                ctx,
                query_id: "q1".into(),
            },
            Operation::SaveSql {
                ctx,
                query_id: "q1".into(),
                sql: "SELECT 1".into(),
            },
            Operation::Execute {
                ctx,
                request: ExecuteRequest::default(),
            },
            Operation::Update {
                ctx,
                request: UpdateRequest::default(),
            },
        ];

        let names: Vec<_> = ops.iter().map(Operation::name).collect();
        assert_eq!(
            names,
            ["list_queries", "get_query", "save_sql", "execute", "update"]
        );
        assert!(ops.iter().all(|op| op.ctx().call_id == 7));
        assert_eq!(ops[0].query_id(), None);
        assert_eq!(ops[1].query_id(), Some("q1"));
    }
}
