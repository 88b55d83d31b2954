//! Request logging
//!

use std::time::Duration;

use axum::extract::MatchedPath;
use axum::http::header::CONTENT_LENGTH;
use axum::http::Request;
use axum::response::Response;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{MakeSpan, OnRequest, OnResponse, TraceLayer},
};
use tracing::{trace, Level, Span};

#[derive(Copy, Clone)]
pub(crate) struct PortfolioSpanner {}

impl<B> MakeSpan<B> for PortfolioSpanner {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        // the route template keeps ids out of the span name
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_string())
            .unwrap_or_default();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            route = %route,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
            bytes = tracing::field::Empty
        )
    }
}

impl<B> OnRequest<B> for PortfolioSpanner {
    fn on_request(&mut self, _request: &Request<B>, _span: &Span) {
        trace!("request received");
    }
}

impl<B> OnResponse<B> for PortfolioSpanner {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status();
        span.record("status", status.as_u16());
        span.record("latency_ms", latency.as_millis() as u64);
        if let Some(content_length) = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
        {
            span.record("bytes", content_length);
        }
        if status.is_server_error() {
            tracing::event!(Level::WARN, "response sent");
        } else {
            tracing::event!(Level::INFO, "response sent");
        }
    }
}

pub(crate) fn logging_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    PortfolioSpanner,
    PortfolioSpanner,
    PortfolioSpanner,
> {
    TraceLayer::new_for_http()
        .on_request(PortfolioSpanner {})
        .make_span_with(PortfolioSpanner {})
        .on_response(PortfolioSpanner {})
}
