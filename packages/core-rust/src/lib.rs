//! `QueryDesk` Core — query definitions, optional-filter elision, and
//! whitelisted update compilation.
//!
//! Everything here is pure text/data manipulation; no module in this crate
//! talks to a database.

pub mod definition;
pub mod error;
pub mod filter;
pub mod placeholder;
pub mod types;
pub mod update;

pub use definition::{QueryDefinition, QueryListing, UpdateRules};
pub use error::{MissingBind, ValidationError};
pub use filter::BuiltQuery;
pub use types::{
    BindMap, ExecuteRequest, ParamMap, QueryResponse, QueryResult, Row, UpdateRequest,
    UpdateResponse,
};
pub use update::{compile_update, CompiledUpdate, UpdateStatement, ROW_ID_BIND};
