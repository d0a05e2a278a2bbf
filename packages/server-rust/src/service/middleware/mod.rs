//! Tower middleware layers for the operation pipeline.
//!
//! - [`timeout`]: Per-operation timeout enforcement
//! - [`metrics`]: Operation timing and outcome via `tracing` spans
//! - [`load_shed`]: Semaphore-based concurrency limiting
//! - [`pipeline`]: Composes all layers around [`QueryDeskService`](crate::service::QueryDeskService)

pub mod load_shed;
pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use load_shed::LoadShedLayer;
pub use metrics::MetricsLayer;
pub use pipeline::{build_operation_pipeline, OperationPipeline};
pub use timeout::TimeoutLayer;
