//! Engine error taxonomy.

use querydesk_core::ValidationError;

use crate::catalog::CatalogError;

/// Errors returned by every engine operation.
///
/// Nothing is retried automatically: a failure either aborts the whole
/// logical operation or is rejected before any side effect.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Session could not be opened or elevated.
    #[error("database connection failed: {0:#}")]
    Connection(anyhow::Error),
    /// SELECT execution failed.
    #[error("query failed: {0:#}")]
    Query(anyhow::Error),
    /// Input rejected before touching the database.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A per-row update failed; the transaction was rolled back.
    #[error("update failed and was rolled back: {0:#}")]
    Update(anyhow::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("server overloaded, try again later")]
    Overloaded,
}

/// Coarse error class exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Execution,
    Timeout,
    Unavailable,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidInput => "invalid_input",
            Self::Execution => "execution_failure",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
        }
    }
}

impl EngineError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::InvalidInput,
            Self::Catalog(CatalogError::NotFound { .. }) => ErrorKind::NotFound,
            Self::Catalog(_) | Self::Connection(_) | Self::Query(_) | Self::Update(_) => {
                ErrorKind::Execution
            }
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Overloaded => ErrorKind::Unavailable,
        }
    }
}
