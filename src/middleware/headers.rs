//! Response trace header injection.

use http::{HeaderMap, HeaderValue};

use super::codec;
use super::context::{LEVEL_HEADER, SPAN_ID_HEADER, TRACE_ID_HEADER};

/// Standards-based timing hint header.
pub const SERVER_TIMING_HEADER: &str = "server-timing";

/// Write the trace identifiers into the outgoing response headers.
///
/// Adds the hex trace id, hex span id, the sampling level fixed to `1`,
/// and a `Server-Timing` entry embedding the trace id. Insertion replaces
/// any existing values, so repeated writes are idempotent.
pub fn write_trace_headers(headers: &mut HeaderMap, trace_id: u128, span_id: u64) {
    let trace_hex = codec::encode_trace_id(trace_id);
    let span_hex = codec::encode_span_id(span_id);

    let entries = [
        (TRACE_ID_HEADER, trace_hex.clone()),
        (SPAN_ID_HEADER, span_hex),
        (LEVEL_HEADER, "1".to_string()),
        (SERVER_TIMING_HEADER, format!("intid;desc={trace_hex}")),
    ];

    for (name, value) in entries {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}
