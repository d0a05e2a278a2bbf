//! HTTP middleware stack for the `QueryDesk` server.
//!
//! The first layer listed is the outermost: it sees the request first on the
//! way in and the response last on the way out.

use axum::body::Body;
use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;

type HttpLayers = Stack<
    RequestBodyLimitLayer,
    Stack<
        MapResponseBodyLayer<fn(LimitedBody) -> Body>,
        Stack<
            PropagateRequestIdLayer,
            Stack<
                TimeoutLayer,
                Stack<
                    CorsLayer,
                    Stack<
                        CompressionLayer,
                        Stack<
                            TraceLayer<SharedClassifier<ServerErrorsAsFailures>>,
                            Stack<SetRequestIdLayer<MakeRequestUuid>, Identity>,
                        >,
                    >,
                >,
            >,
        >,
    >,
>;

type LimitedBody = tower_http::limit::ResponseBody<Body>;

/// Builds the HTTP-level Tower middleware stack.
///
/// **Order (outermost to innermost):**
/// 1. `SetRequestId`: assigns a UUID `X-Request-Id` to every request
/// 2. `Tracing`: request/response spans
/// 3. `Compression`: gzip responses (query results can be large)
/// 4. `CORS`: configured origins, GET and POST only
/// 5. `Timeout`: 408 after `request_timeout`
/// 6. `PropagateRequestId`: copies `X-Request-Id` onto the response
/// 7. `RequestBodyLimit`: 413 above `max_body_bytes`
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            x_request_id.clone(),
            MakeRequestUuid,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .layer(MapResponseBodyLayer::new(
            Body::new as fn(LimitedBody) -> Body,
        ))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .into_inner()
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
