//! Span lifecycle orchestration middleware.
//!
//! Wraps the downstream service: starts or continues a span before the
//! call, enriches it with HTTP metadata and correlation data, captures the
//! downstream outcome, and guarantees span closure and response header
//! injection on every exit path. Skipped requests pass through untouched.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::{Request, Response};
use serde_json::Value;
use tower::{Layer, Service};

use super::context::{self, CurrentTrace, HttpTags};
use super::headers::write_trace_headers;
use super::skip::SkipRules;
use crate::tracer::{SpanTags, Tracer};

/// Layer name for spans opened at this protocol boundary.
const HTTP_LAYER: &str = "http";

/// Response extension carrying a framework-provided path template
/// (e.g. `/users/{id}`), copied into the span's `http.path_tpl` tag.
#[derive(Debug, Clone)]
pub struct PathTemplate(pub String);

/// Tower layer applying [`RequestTraceService`] to the wrapped service.
#[derive(Clone)]
pub struct RequestTraceLayer {
    tracer: Tracer,
    service_name: Option<String>,
    skip: SkipRules,
}

impl RequestTraceLayer {
    pub fn new(tracer: Tracer) -> Self {
        Self {
            tracer,
            service_name: None,
            skip: SkipRules::default(),
        }
    }

    /// Logical service name merged into the closing tag set.
    pub fn with_service_name(mut self, name: Option<String>) -> Self {
        self.service_name = name;
        self
    }

    /// Request paths that bypass tracing entirely.
    pub fn with_skip_paths(mut self, paths: Vec<String>) -> Self {
        self.skip = SkipRules::new(paths);
        self
    }
}

impl<S> Layer<S> for RequestTraceLayer {
    type Service = RequestTraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTraceService {
            inner,
            tracer: self.tracer.clone(),
            service_name: self.service_name.clone(),
            skip: self.skip.clone(),
        }
    }
}

/// The middleware proper. One span is opened and closed per non-skipped
/// request, whether the downstream call returns a response, returns a
/// fault, or is cancelled mid-flight.
#[derive(Clone)]
pub struct RequestTraceService<S> {
    inner: S,
    tracer: Tracer,
    service_name: Option<String>,
    skip: SkipRules,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestTraceService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Display,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        // The clone is the service that already polled ready.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if self.skip.should_skip(&req) {
            return Box::pin(async move { inner.call(req).await });
        }

        let incoming = context::incoming_context(req.headers());
        let correlation = context::correlation_data(req.headers());
        let mut http_tags = HttpTags::from_request(&req);

        let mut span = self
            .tracer
            .start_or_continue(HTTP_LAYER, SpanTags::new(), incoming);
        if !correlation.is_empty() {
            span.annotate("crid", Value::String(correlation.id));
            span.annotate("crtp", Value::String(correlation.kind));
        }

        req.extensions_mut().insert(CurrentTrace {
            trace_id: span.trace_id(),
            span_id: span.span_id(),
        });

        let service_name = self.service_name.clone();

        Box::pin(async move {
            match inner.call(req).await {
                Ok(mut response) => {
                    let status = coerce_status(Some(response.status().as_str()));
                    http_tags.status = Some(status);
                    if (500..=511).contains(&status) {
                        // Errored because of the 5xx alone; no fault to attach.
                        span.flag_error(None);
                    }
                    if let Some(tpl) = response.extensions().get::<PathTemplate>() {
                        http_tags.path_tpl = Some(tpl.0.clone());
                    }

                    write_trace_headers(response.headers_mut(), span.trace_id(), span.span_id());
                    span.end(closing_tags(&http_tags, service_name.as_deref()));
                    Ok(response)
                }
                Err(fault) => {
                    // No response was produced: record the fault, close the
                    // span without a status, and return the fault unchanged.
                    span.flag_error(Some(fault.to_string()));
                    span.end(closing_tags(&http_tags, service_name.as_deref()));
                    Err(fault)
                }
            }
        })
    }
}

/// Total status conversion: numeric strings parse normally, anything else
/// (including absence) maps to `0`, the "no status was reported" sentinel.
/// Never panics.
pub fn coerce_status(raw: Option<&str>) -> u16 {
    raw.and_then(|s| s.trim().parse::<u16>().ok()).unwrap_or(0)
}

/// Closing tag set: the `http` sub-map plus the top-level `service` name,
/// each present only when non-empty.
fn closing_tags(http_tags: &HttpTags, service_name: Option<&str>) -> SpanTags {
    let mut tags = SpanTags::new();
    if let Ok(Value::Object(map)) = serde_json::to_value(http_tags) {
        if !map.is_empty() {
            tags.insert("http".to_string(), Value::Object(map));
        }
    }
    if let Some(name) = service_name.filter(|n| !n.is_empty()) {
        tags.insert("service".to_string(), Value::String(name.to_string()));
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_status_numeric() {
        assert_eq!(coerce_status(Some("200")), 200);
        assert_eq!(coerce_status(Some("503")), 503);
    }

    #[test]
    fn test_coerce_status_non_numeric_is_sentinel() {
        assert_eq!(coerce_status(Some("asdfasdf")), 0);
        assert_eq!(coerce_status(Some("")), 0);
        assert_eq!(coerce_status(Some("-1")), 0);
    }

    #[test]
    fn test_coerce_status_missing_is_sentinel() {
        assert_eq!(coerce_status(None), 0);
    }

    #[test]
    fn test_closing_tags_include_http_map_and_service() {
        let http_tags = HttpTags {
            method: "GET".into(),
            path: "/".into(),
            host: None,
            status: Some(200),
            path_tpl: None,
        };
        let tags = closing_tags(&http_tags, Some("billing"));
        let http = tags.get("http").unwrap().as_object().unwrap();
        assert_eq!(http.get("status").unwrap(), 200);
        assert_eq!(tags.get("service").unwrap(), "billing");
    }

    #[test]
    fn test_closing_tags_omit_unconfigured_service() {
        let tags = closing_tags(&HttpTags::default(), None);
        assert!(!tags.contains_key("service"));
        let tags = closing_tags(&HttpTags::default(), Some(""));
        assert!(!tags.contains_key("service"));
    }
}
