//! Per-operation timeout.
//!
//! Operations that exceed their `call_timeout_ms` fail with
//! [`EngineError::Timeout`]. Dropping the inner future drops any open
//! transaction, which the driver rolls back.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tower::{Layer, Service};

use crate::error::EngineError;
use crate::service::operation::{Operation, OperationResponse};

/// Reads the timeout from each operation's context.
#[derive(Debug, Clone)]
pub struct TimeoutLayer;

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
}

impl<S> Service<Operation> for TimeoutService<S>
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
        let timeout_ms = op.ctx().call_timeout_ms;
        let fut = self.inner.call(op);
        Box::pin(async move {
            match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
                Ok(result) => result,
                Err(_elapsed) => Err(EngineError::Timeout { timeout_ms }),
            }
        })
    }
}
