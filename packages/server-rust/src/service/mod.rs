//! Operation pipeline.
//!
//! 1. **Operations** (`operation`): typed engine calls with a per-call context
//! 2. **Handler** (`handler`): [`QueryDeskService`], the catalog/query/update logic
//! 3. **Middleware** (`middleware`): Tower layers (load-shedding, timeout, metrics)

pub mod config;
pub mod handler;
pub mod middleware;
pub mod operation;

pub use config::ServiceConfig;
pub use handler::QueryDeskService;
pub use middleware::{build_operation_pipeline, OperationPipeline};
pub use operation::{Operation, OperationContext, OperationResponse};
