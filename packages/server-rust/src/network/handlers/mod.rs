//! HTTP handlers and the shared state they extract.

pub mod error;
pub mod health;
pub mod queries;

pub use error::ApiError;
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use queries::{
    execute_handler, get_query_handler, list_queries_handler, save_query_handler, update_handler,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::{NetworkConfig, ShutdownController};
use crate::service::{OperationContext, OperationPipeline, ServiceConfig};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Layered operation service; cloned per request.
    pub pipeline: OperationPipeline,
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
    pub service_config: Arc<ServiceConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
    call_ids: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(
        pipeline: OperationPipeline,
        shutdown: Arc<ShutdownController>,
        config: Arc<NetworkConfig>,
        service_config: Arc<ServiceConfig>,
    ) -> Self {
        Self {
            pipeline,
            shutdown,
            config,
            service_config,
            start_time: Instant::now(),
            call_ids: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Context for the next operation: fresh call id, configured timeout.
    #[must_use]
    pub fn next_context(&self) -> OperationContext {
        let call_id = self.call_ids.fetch_add(1, Ordering::Relaxed);
        OperationContext::new(call_id, self.service_config.operation_timeout_ms)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use querydesk_core::QueryDefinition;

    use super::AppState;
    use crate::catalog::MemoryCatalog;
    use crate::config::{ElevationConfig, Secret};
    use crate::network::{NetworkConfig, ShutdownController};
    use crate::service::{build_operation_pipeline, QueryDeskService, ServiceConfig};
    use crate::session::{ConnectionSession, MemoryConnector};

    pub fn definitions() -> Vec<QueryDefinition> {
        vec![
            QueryDefinition::new("q1", "Example", "SELECT a.rowid, a.x FROM t a WHERE a.x = :p")
                .with_updates("t", [("X", "X = :val_name")]),
            QueryDefinition::new("q2", "Read only", "SELECT b.rowid, b.y FROM u b"),
        ]
    }

    /// Ready state over a memory catalog and the given scripted backend.
    pub fn test_state(connector: &MemoryConnector) -> AppState {
        let elevation = ElevationConfig {
            secret: Some(Secret::new("s")),
            ..ElevationConfig::default()
        };
        let session = Arc::new(ConnectionSession::new(Arc::new(connector.clone()), elevation));
        let service = Arc::new(QueryDeskService::new(
            Arc::new(MemoryCatalog::new(definitions())),
            session,
        ));
        let service_config = ServiceConfig::default();
        let pipeline = build_operation_pipeline(service, &service_config);

        let shutdown = Arc::new(ShutdownController::new());
        shutdown.set_ready();
        AppState::new(
            pipeline,
            shutdown,
            Arc::new(NetworkConfig::default()),
            Arc::new(service_config),
        )
    }
}
