//! The per-request span handle and its finished form.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::SpanSink;

/// Tag map attached to a span. Nested maps (like the `http` sub-map) are
/// plain JSON objects.
pub type SpanTags = serde_json::Map<String, serde_json::Value>;

/// Error state of a finished span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanError {
    /// Errored because of the response status alone; no fault was raised.
    StatusOnly,
    /// A fault escaped the downstream handler.
    Fault { message: String },
}

/// A finished span as delivered to the sink.
#[derive(Debug, Clone)]
pub struct SpanData {
    pub trace_id: u128,
    pub span_id: u64,
    pub parent_span_id: Option<u64>,
    pub layer: &'static str,
    pub duration: Duration,
    pub tags: SpanTags,
    pub error: Option<SpanError>,
}

/// Live span handle, owned by the request being traced.
///
/// Exactly one [`SpanData`] reaches the sink per handle: either through
/// [`end`](Self::end), or through `Drop` when the request future is
/// cancelled before it can close the span itself.
pub struct ActiveSpan {
    trace_id: u128,
    span_id: u64,
    parent_span_id: Option<u64>,
    layer: &'static str,
    started: Instant,
    annotations: SpanTags,
    error: Option<SpanError>,
    sink: Arc<dyn SpanSink>,
    ended: bool,
}

impl ActiveSpan {
    pub(super) fn new(
        trace_id: u128,
        span_id: u64,
        parent_span_id: Option<u64>,
        layer: &'static str,
        annotations: SpanTags,
        sink: Arc<dyn SpanSink>,
    ) -> Self {
        Self {
            trace_id,
            span_id,
            parent_span_id,
            layer,
            started: Instant::now(),
            annotations,
            error: None,
            sink,
            ended: false,
        }
    }

    pub fn trace_id(&self) -> u128 {
        self.trace_id
    }

    pub fn span_id(&self) -> u64 {
        self.span_id
    }

    /// Whether the span is still open.
    pub fn is_tracing(&self) -> bool {
        !self.ended
    }

    /// Attach a key/value annotation, kept through to the closing tag set.
    pub fn annotate(&mut self, key: &str, value: serde_json::Value) {
        self.annotations.insert(key.to_string(), value);
    }

    /// Mark the span errored.
    ///
    /// `Some(message)` records a fault that escaped the downstream handler;
    /// `None` records a status-only error (5xx response, no fault).
    pub fn flag_error(&mut self, fault: Option<String>) {
        self.error = Some(match fault {
            Some(message) => SpanError::Fault { message },
            None => SpanError::StatusOnly,
        });
    }

    /// Close the span, merging `tags` over the accumulated annotations.
    pub fn end(mut self, tags: SpanTags) {
        self.finish(tags);
    }

    fn finish(&mut self, tags: SpanTags) {
        if self.ended {
            return;
        }
        self.ended = true;

        let mut merged = std::mem::take(&mut self.annotations);
        for (key, value) in tags {
            merged.insert(key, value);
        }

        self.sink.record(SpanData {
            trace_id: self.trace_id,
            span_id: self.span_id,
            parent_span_id: self.parent_span_id,
            layer: self.layer,
            duration: self.started.elapsed(),
            tags: merged,
            error: self.error.take(),
        });
    }
}

impl Drop for ActiveSpan {
    fn drop(&mut self) {
        if !self.ended {
            self.annotations
                .insert("cancelled".to_string(), serde_json::Value::Bool(true));
            self.finish(SpanTags::new());
        }
    }
}
