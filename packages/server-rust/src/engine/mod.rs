//! Query and update execution over role-elevated sessions.
//!
//! - [`QueryExecutor`]: one SELECT per session, rows materialized eagerly
//! - [`UpdateExecutor`]: one UPDATE per row id inside a single transaction

pub mod query;
pub mod update;

pub use query::QueryExecutor;
pub use update::UpdateExecutor;
