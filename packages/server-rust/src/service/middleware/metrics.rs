//! Operation timing and outcome, recorded on `tracing` spans.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::error::EngineError;
use crate::service::operation::{Operation, OperationResponse};

#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

/// Wraps each call in an `operation` span with `duration_ms` and `outcome`.
///
/// `outcome` is `ok` or the error kind (`not_found`, `invalid_input`, ...).
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<Operation> for MetricsService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = EngineError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = EngineError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, EngineError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let operation = op.name();
        let call_id = op.ctx().call_id;
        let query_id = op.query_id().unwrap_or_default().to_string();

        let span = info_span!(
            "operation",
            operation,
            call_id,
            query_id = %query_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(op);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = start.elapsed().as_millis() as u64;
                let outcome = match &result {
                    Ok(_) => "ok",
                    Err(e) => e.kind().as_str(),
                };

                let span = tracing::Span::current();
                span.record("duration_ms", duration_ms);
                span.record("outcome", outcome);

                match &result {
                    Ok(_) => tracing::info!(duration_ms, outcome, "operation complete"),
                    Err(e) => tracing::warn!(duration_ms, outcome, error = %e, "operation failed"),
                }

                result
            }
            .instrument(span),
        )
    }
}
