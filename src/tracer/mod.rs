//! Span construction and lifecycle.
//!
//! The tracer hands out one [`ActiveSpan`] per traced request. The handle
//! is owned by the in-flight request future rather than stored in any
//! process-global slot, so concurrent requests never observe each other's
//! spans. Finished spans are delivered through the [`SpanSink`] seam;
//! sampling and export decisions live entirely behind it.

mod span;

pub use span::{ActiveSpan, SpanData, SpanError, SpanTags};

use std::sync::{Arc, Mutex};

use rand::Rng;

use crate::middleware::context::TraceContext;

/// Destination for finished spans.
pub trait SpanSink: Send + Sync + 'static {
    fn record(&self, span: SpanData);
}

/// Creates spans, either as fresh roots or as continuations of an
/// externally-supplied parent context.
#[derive(Clone)]
pub struct Tracer {
    sink: Arc<dyn SpanSink>,
}

impl Tracer {
    pub fn new(sink: Arc<dyn SpanSink>) -> Self {
        Self { sink }
    }

    /// Start a span for `layer`, continuing `incoming` when present.
    ///
    /// Continuation keeps the incoming trace id and records the incoming
    /// span id as the parent; without a parent context a new root is
    /// created with fresh identifiers.
    pub fn start_or_continue(
        &self,
        layer: &'static str,
        tags: SpanTags,
        incoming: Option<TraceContext>,
    ) -> ActiveSpan {
        let mut rng = rand::rng();
        let (trace_id, parent_span_id) = match incoming {
            Some(ctx) => (ctx.trace_id, Some(ctx.span_id)),
            None => (nonzero_u128(&mut rng), None),
        };
        let span_id = nonzero_u64(&mut rng);

        ActiveSpan::new(
            trace_id,
            span_id,
            parent_span_id,
            layer,
            tags,
            self.sink.clone(),
        )
    }
}

// All-zero identifiers are reserved as "invalid" by the usual trace
// context conventions, so redraw on zero.
fn nonzero_u128(rng: &mut impl Rng) -> u128 {
    loop {
        let id: u128 = rng.random();
        if id != 0 {
            return id;
        }
    }
}

fn nonzero_u64(rng: &mut impl Rng) -> u64 {
    loop {
        let id: u64 = rng.random();
        if id != 0 {
            return id;
        }
    }
}

/// Emits each finished span as a structured log event.
pub struct LogSink;

impl SpanSink for LogSink {
    fn record(&self, span: SpanData) {
        let tags = serde_json::Value::Object(span.tags.clone());
        tracing::debug!(
            trace_id = %crate::middleware::codec::encode_trace_id(span.trace_id),
            span_id = %crate::middleware::codec::encode_span_id(span.span_id),
            parent_span_id = span.parent_span_id,
            layer = span.layer,
            duration_us = span.duration.as_micros() as u64,
            error = ?span.error,
            %tags,
            "span closed"
        );
    }
}

/// Captures finished spans in memory so tests and embedders can inspect them.
#[derive(Default)]
pub struct RecordingSink {
    spans: Mutex<Vec<SpanData>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the spans recorded so far.
    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl SpanSink for RecordingSink {
    fn record(&self, span: SpanData) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.push(span);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracer() -> (Tracer, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        (Tracer::new(sink.clone()), sink)
    }

    #[test]
    fn test_new_root_has_fresh_nonzero_ids() {
        let (tracer, sink) = tracer();
        let span = tracer.start_or_continue("http", SpanTags::new(), None);
        assert_ne!(span.trace_id(), 0);
        assert_ne!(span.span_id(), 0);
        span.end(SpanTags::new());

        let spans = sink.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].parent_span_id, None);
    }

    #[test]
    fn test_continuation_keeps_trace_id_and_parent() {
        let (tracer, sink) = tracer();
        let incoming = TraceContext {
            trace_id: 0xabc123,
            span_id: 0xdef456,
            sampled: true,
        };
        let span = tracer.start_or_continue("http", SpanTags::new(), Some(incoming));
        assert_eq!(span.trace_id(), 0xabc123);
        assert_ne!(span.span_id(), 0xdef456);
        span.end(SpanTags::new());

        let spans = sink.spans();
        assert_eq!(spans[0].trace_id, 0xabc123);
        assert_eq!(spans[0].parent_span_id, Some(0xdef456));
    }

    #[test]
    fn test_dropped_span_is_still_recorded() {
        let (tracer, sink) = tracer();
        let span = tracer.start_or_continue("http", SpanTags::new(), None);
        drop(span);

        let spans = sink.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(
            spans[0].tags.get("cancelled"),
            Some(&serde_json::Value::Bool(true))
        );
    }

    #[test]
    fn test_span_recorded_exactly_once() {
        let (tracer, sink) = tracer();
        let span = tracer.start_or_continue("http", SpanTags::new(), None);
        assert!(span.is_tracing());
        span.end(SpanTags::new());
        assert_eq!(sink.spans().len(), 1);
    }

    #[test]
    fn test_annotations_and_closing_tags_merge() {
        let (tracer, sink) = tracer();
        let mut span = tracer.start_or_continue("http", SpanTags::new(), None);
        span.annotate("crid", serde_json::Value::String("42".into()));

        let mut closing = SpanTags::new();
        closing.insert("service".into(), serde_json::Value::String("web".into()));
        span.end(closing);

        let tags = &sink.spans()[0].tags;
        assert_eq!(tags.get("crid").unwrap(), "42");
        assert_eq!(tags.get("service").unwrap(), "web");
    }
}
