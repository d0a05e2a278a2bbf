use std::sync::Arc;

use querydesk_core::{UpdateStatement, ValidationError};

use crate::error::EngineError;
use crate::session::{release, Connection, ConnectionSession};

/// Applies one compiled UPDATE to a set of row ids, all-or-nothing.
///
/// Per call: `Idle -> SessionOpen -> Executing(i) -> Committed | RolledBack -> Closed`.
pub struct UpdateExecutor {
    session: Arc<ConnectionSession>,
}

impl UpdateExecutor {
    #[must_use]
    pub fn new(session: Arc<ConnectionSession>) -> Self {
        Self { session }
    }

    /// Executes `statement` once per row id in one transaction.
    ///
    /// Commits only after every row succeeded and returns the number of
    /// executions. Any failure rolls back the whole set; no partial count is
    /// ever reported.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] with [`ValidationError::NoRowIds`] when
    ///   `row_ids` is empty (no session is opened).
    /// - [`EngineError::Connection`] if the session cannot be opened.
    /// - [`EngineError::Update`] if begin, any row, or commit fails.
    pub async fn apply(
        &self,
        statement: &UpdateStatement,
        row_ids: &[String],
    ) -> Result<u64, EngineError> {
        if row_ids.is_empty() {
            return Err(ValidationError::NoRowIds.into());
        }

        let mut conn = self.session.open().await?;
        let outcome = apply_in_transaction(conn.as_mut(), statement, row_ids).await;
        release(conn).await;
        outcome
    }
}

async fn apply_in_transaction(
    conn: &mut dyn Connection,
    statement: &UpdateStatement,
    row_ids: &[String],
) -> Result<u64, EngineError> {
    let mut tx = conn.begin().await.map_err(EngineError::Update)?;

    let mut updated = 0_u64;
    let mut affected = 0_u64;
    for (i, row_id) in row_ids.iter().enumerate() {
        match tx.execute(&statement.sql, &statement.binds_for(row_id)).await {
            Ok(n) => {
                updated += 1;
                affected += n;
            }
            Err(e) => {
                tracing::warn!(row = i, error = %e, "row update failed, rolling back");
                if let Err(rb) = tx.rollback().await {
                    tracing::error!(error = %rb, "rollback failed");
                }
                return Err(EngineError::Update(e));
            }
        }
    }

    tx.commit().await.map_err(EngineError::Update)?;
    tracing::info!(updated, affected, "update committed");
    Ok(updated)
}
