/// Input rejected before any database work happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("no valid or permitted column updates were supplied")]
    NoValidColumns,
    #[error("no row identifiers were selected for update")]
    NoRowIds,
    #[error("query '{query_id}' does not define a target_table for updates")]
    NotUpdatable { query_id: String },
    #[error("update rule for column '{column}' must contain exactly one :val_name marker")]
    MalformedRule { column: String },
    #[error("'{value}' is not a valid SQL identifier")]
    InvalidIdentifier { value: String },
}

/// A placeholder in the SQL text has no bound value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no value bound for placeholder :{name}")]
pub struct MissingBind {
    pub name: String,
}
