//! Fixed-width hexadecimal identifier codec.
//!
//! Trace ids are 128-bit and encode to exactly 32 lowercase hex characters;
//! span ids are 64-bit and encode to exactly 16. No truncation, no
//! variable width.

use crate::error::{AppError, Result};

/// Hex width of an encoded 128-bit trace id.
pub const TRACE_ID_WIDTH: usize = 32;

/// Hex width of an encoded 64-bit span id.
pub const SPAN_ID_WIDTH: usize = 16;

/// Encode a trace id as a zero-padded lowercase hex string.
pub fn encode_trace_id(id: u128) -> String {
    format!("{id:032x}")
}

/// Encode a span id as a zero-padded lowercase hex string.
pub fn encode_span_id(id: u64) -> String {
    format!("{id:016x}")
}

/// Decode a 32-character hex trace id.
pub fn decode_trace_id(hex: &str) -> Result<u128> {
    if hex.len() != TRACE_ID_WIDTH || !is_hex(hex) {
        return Err(AppError::MalformedIdentifier(hex.to_string()));
    }
    u128::from_str_radix(hex, 16).map_err(|_| AppError::MalformedIdentifier(hex.to_string()))
}

/// Decode a 16-character hex span id.
pub fn decode_span_id(hex: &str) -> Result<u64> {
    if hex.len() != SPAN_ID_WIDTH || !is_hex(hex) {
        return Err(AppError::MalformedIdentifier(hex.to_string()));
    }
    u64::from_str_radix(hex, 16).map_err(|_| AppError::MalformedIdentifier(hex.to_string()))
}

// from_str_radix tolerates a leading '+', which is not valid hex on the wire.
fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}
