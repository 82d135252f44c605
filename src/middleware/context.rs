//! Incoming trace context and correlation extraction.
//!
//! Pure functions over the request header map. A request either carries a
//! complete, decodable parent context or it starts a new trace; malformed
//! propagation headers are never surfaced to the caller.

use http::{header::HOST, HeaderMap, Request};
use serde::Serialize;

use super::codec;

/// Header carrying the hex-encoded 128-bit trace id.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Header carrying the hex-encoded 64-bit span id.
pub const SPAN_ID_HEADER: &str = "x-span-id";

/// Trace level header: `0` opts the request out of tracing entirely, and
/// the value may carry a correlation suffix, e.g.
/// `1,correlationType=web;correlationId=1234567890abcdef`.
pub const LEVEL_HEADER: &str = "x-sampled";

/// Parent trace context recovered from the propagation headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: u128,
    pub span_id: u64,
    pub sampled: bool,
}

/// Business correlation pair, orthogonal to trace continuation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationData {
    pub id: String,
    pub kind: String,
}

impl CorrelationData {
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.kind.is_empty()
    }
}

/// Trace identifiers of the request currently being handled, exposed to
/// handlers as a request extension.
#[derive(Debug, Clone, Copy)]
pub struct CurrentTrace {
    pub trace_id: u128,
    pub span_id: u64,
}

/// HTTP metadata attached to the span for the request lifetime.
///
/// `status` stays unset until the downstream call completes; `0` means "no
/// status was reported" and is recorded as-is, never treated as an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HttpTags {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_tpl: Option<String>,
}

impl HttpTags {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            host: header_str(request.headers(), HOST.as_str()).map(str::to_string),
            status: None,
            path_tpl: None,
        }
    }
}

/// Recover the parent trace context, if the request carries one.
///
/// Returns `None` when either id header is missing or fails to decode;
/// the request then starts a new trace.
pub fn incoming_context(headers: &HeaderMap) -> Option<TraceContext> {
    let trace_id = codec::decode_trace_id(header_str(headers, TRACE_ID_HEADER)?).ok()?;
    let span_id = codec::decode_span_id(header_str(headers, SPAN_ID_HEADER)?).ok()?;
    let sampled = !matches!(level_value(headers), Some("0"));

    Some(TraceContext {
        trace_id,
        span_id,
        sampled,
    })
}

/// Read the correlation pair off the level header, defaulting to an empty
/// pair; absence is not an error and never blocks span creation.
pub fn correlation_data(headers: &HeaderMap) -> CorrelationData {
    let raw = match header_str(headers, LEVEL_HEADER) {
        Some(value) => value,
        None => return CorrelationData::default(),
    };

    // "1,correlationType=web;correlationId=1234" — everything after the
    // first comma is the correlation part.
    let suffix = match raw.split_once(',') {
        Some((_, suffix)) => suffix,
        None => return CorrelationData::default(),
    };

    let mut data = CorrelationData::default();
    for pair in suffix.split(';') {
        match pair.trim().split_once('=') {
            Some(("correlationId", v)) => data.id = v.trim().to_string(),
            Some(("correlationType", v)) => data.kind = v.trim().to_string(),
            _ => {}
        }
    }
    data
}

/// Level portion of the level header (the part before any correlation
/// suffix), e.g. `Some("0")` for an opt-out.
pub fn level_value(headers: &HeaderMap) -> Option<&str> {
    let raw = header_str(headers, LEVEL_HEADER)?;
    Some(raw.split_once(',').map_or(raw, |(level, _)| level).trim())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(entries: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in entries {
            map.insert(
                http::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_incoming_context_round_trips_ids() {
        let map = headers(&[
            (TRACE_ID_HEADER, "0af7651916cd43dd8448eb211c80319c"),
            (SPAN_ID_HEADER, "b7ad6b7169069314"),
        ]);
        let ctx = incoming_context(&map).unwrap();
        assert_eq!(ctx.trace_id, 0x0af7651916cd43dd8448eb211c80319c);
        assert_eq!(ctx.span_id, 0xb7ad6b7169069314);
        assert!(ctx.sampled);
    }

    #[test]
    fn test_missing_span_id_means_no_context() {
        let map = headers(&[(TRACE_ID_HEADER, "0af7651916cd43dd8448eb211c80319c")]);
        assert_eq!(incoming_context(&map), None);
    }

    #[test]
    fn test_missing_trace_id_means_no_context() {
        let map = headers(&[(SPAN_ID_HEADER, "b7ad6b7169069314")]);
        assert_eq!(incoming_context(&map), None);
    }

    #[test]
    fn test_malformed_trace_id_degrades_to_no_context() {
        let map = headers(&[
            (TRACE_ID_HEADER, "not-hex-at-all"),
            (SPAN_ID_HEADER, "b7ad6b7169069314"),
        ]);
        assert_eq!(incoming_context(&map), None);
    }

    #[test]
    fn test_level_zero_is_unsampled() {
        let map = headers(&[
            (TRACE_ID_HEADER, "0af7651916cd43dd8448eb211c80319c"),
            (SPAN_ID_HEADER, "b7ad6b7169069314"),
            (LEVEL_HEADER, "0"),
        ]);
        assert!(!incoming_context(&map).unwrap().sampled);
    }

    #[test]
    fn test_correlation_parsed_from_level_suffix() {
        let map = headers(&[(LEVEL_HEADER, "1,correlationType=web;correlationId=1234567890abcdef")]);
        let data = correlation_data(&map);
        assert_eq!(data.id, "1234567890abcdef");
        assert_eq!(data.kind, "web");
        assert!(!data.is_empty());
    }

    #[test]
    fn test_correlation_defaults_to_empty_pair() {
        assert!(correlation_data(&headers(&[])).is_empty());
        assert!(correlation_data(&headers(&[(LEVEL_HEADER, "1")])).is_empty());
    }

    #[test]
    fn test_correlation_is_independent_of_trace_headers() {
        // Correlation present without any trace context
        let map = headers(&[(LEVEL_HEADER, "1,correlationType=mobile;correlationId=42")]);
        assert_eq!(incoming_context(&map), None);
        let data = correlation_data(&map);
        assert_eq!(data.kind, "mobile");
        assert_eq!(data.id, "42");
    }

    #[test]
    fn test_partial_correlation_keeps_known_fields() {
        let map = headers(&[(LEVEL_HEADER, "1,correlationId=42")]);
        let data = correlation_data(&map);
        assert_eq!(data.id, "42");
        assert_eq!(data.kind, "");
    }

    #[test]
    fn test_level_value_strips_correlation_suffix() {
        let map = headers(&[(LEVEL_HEADER, "1,correlationType=web;correlationId=9")]);
        assert_eq!(level_value(&map), Some("1"));
    }

    #[test]
    fn test_http_tags_from_request() {
        let request = Request::builder()
            .method("POST")
            .uri("http://api.example.com/users/42?verbose=1")
            .header("host", "api.example.com")
            .body(())
            .unwrap();
        let tags = HttpTags::from_request(&request);
        assert_eq!(tags.method, "POST");
        assert_eq!(tags.path, "/users/42");
        assert_eq!(tags.host.as_deref(), Some("api.example.com"));
        assert_eq!(tags.status, None);
    }

    #[test]
    fn test_http_tags_serialization_skips_unset_fields() {
        let tags = HttpTags {
            method: "GET".into(),
            path: "/".into(),
            host: None,
            status: None,
            path_tpl: None,
        };
        let value = serde_json::to_value(&tags).unwrap();
        let map = value.as_object().unwrap();
        assert!(map.contains_key("method"));
        assert!(!map.contains_key("status"));
        assert!(!map.contains_key("path_tpl"));
    }
}
