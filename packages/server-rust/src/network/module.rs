//! Network module with deferred startup lifecycle.
//!
//! `new()` allocates shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until the shutdown future resolves.

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    execute_handler, get_query_handler, health_handler, list_queries_handler, liveness_handler,
    readiness_handler, save_query_handler, update_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::service::{OperationPipeline, ServiceConfig};

pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    state: AppState,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        pipeline: OperationPipeline,
        service_config: ServiceConfig,
    ) -> Self {
        let state = AppState::new(
            pipeline,
            Arc::new(ShutdownController::new()),
            Arc::new(config.clone()),
            Arc::new(service_config),
        );
        Self {
            config,
            listener: None,
            state,
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.state.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health`, `/health/live`, `/health/ready`
    /// - `GET /api/queries`: catalog listing
    /// - `GET /api/query/{id}`: full definition
    /// - `POST /api/query/{id}`: replace SQL
    /// - `POST /api/execute`: run a query
    /// - `POST /api/update`: update selected rows
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .route("/api/queries", get(list_queries_handler))
            .route(
                "/api/query/{id}",
                get(get_query_handler).post(save_query_handler),
            )
            .route("/api/execute", axum::routing::post(execute_handler))
            .route("/api/update", axum::routing::post(update_handler))
            .layer(build_http_layers(&self.config))
            .with_state(self.state.clone())
    }

    /// Binds the listener and returns the actual port (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();
        info!(host = %self.config.host, port, "TCP listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves, then drains in-flight calls.
    ///
    /// # Errors
    ///
    /// Fails if `start()` was not called or the server hits a fatal I/O
    /// error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();
        let controller = self.shutdown_controller();

        controller.set_ready();
        info!("serving HTTP");

        let signal_controller = Arc::clone(&controller);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                signal_controller.trigger_shutdown();
                info!("shutdown requested, draining");
            })
            .await?;

        if controller.wait_for_drain(self.config.drain_timeout).await {
            info!("all in-flight calls drained");
        } else {
            warn!(
                in_flight = controller.in_flight_count(),
                "drain timeout expired with calls still in flight"
            );
        }
        Ok(())
    }
}
