use axum::body::Body;
use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;
use tracing::{Span, info_span};
use uuid::Uuid;

/// One `http_request` span per request, tagged with a fresh trace id.
pub fn http_trace_layer()
-> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, fn(&Request<Body>) -> Span> {
    TraceLayer::new_for_http().make_span_with(make_span as fn(&Request<Body>) -> Span)
}

fn make_span(request: &Request<Body>) -> Span {
    let trace_id = Uuid::now_v7();

    info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}
