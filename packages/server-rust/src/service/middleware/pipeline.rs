//! Pipeline composition: wraps [`QueryDeskService`] in every middleware layer.

use std::sync::Arc;

use tower::ServiceBuilder;

use super::load_shed::{LoadShedLayer, LoadShedService};
use super::metrics::{MetricsLayer, MetricsService};
use super::timeout::{TimeoutLayer, TimeoutService};
use crate::service::config::ServiceConfig;
use crate::service::handler::QueryDeskService;

/// The fully layered service handed to the network layer.
pub type OperationPipeline =
    LoadShedService<TimeoutService<MetricsService<Arc<QueryDeskService>>>>;

/// Layer order (outermost to innermost):
/// 1. `LoadShedLayer`: reject when overloaded, before doing any work
/// 2. `TimeoutLayer`: enforce per-operation timeouts
/// 3. `MetricsLayer`: record timing and outcome closest to the handler
#[must_use]
pub fn build_operation_pipeline(
    service: Arc<QueryDeskService>,
    config: &ServiceConfig,
) -> OperationPipeline {
    ServiceBuilder::new()
        .layer(LoadShedLayer::new(config.max_concurrent_operations))
        .layer(TimeoutLayer)
        .layer(MetricsLayer)
        .service(service)
}

#[cfg(test)]
mod tests {
    use querydesk_core::QueryDefinition;
    use tower::ServiceExt;

    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::config::ElevationConfig;
    use crate::service::operation::{Operation, OperationContext, OperationResponse};
    use crate::session::{ConnectionSession, MemoryConnector};

    #[tokio::test]
    async fn pipeline_routes_through_all_layers() {
        let catalog = MemoryCatalog::new(vec![QueryDefinition::new("q1", "One", "SELECT 1")]);
        let session = ConnectionSession::new(
            Arc::new(MemoryConnector::new()),
            ElevationConfig::default(),
        );
        let service = Arc::new(QueryDeskService::new(Arc::new(catalog), Arc::new(session)));

        let svc = build_operation_pipeline(service, &ServiceConfig::default());
        let resp = svc
            .oneshot(Operation::ListQueries {
                ctx: OperationContext::new(42, 5_000),
            })
            .await
            .unwrap();
        let OperationResponse::Queries(listing) = resp else {
            panic!("expected listing");
        };
        assert_eq!(listing[0].id, "q1");
    }
}
