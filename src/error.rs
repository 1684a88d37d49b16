//! Error types and the WebTransport ↔ HTTP/3 error code mapping.

use thiserror::Error;

use crate::frame::{WT_APP_ERROR_FIRST, WT_APP_ERROR_LAST};

pub type Result<T> = std::result::Result<T, Error>;

/// Error code carried in a `CLOSE_WEBTRANSPORT_SESSION` capsule.
pub type SessionErrorCode = u32;

/// Application error code on an individual WebTransport stream.
pub type StreamErrorCode = u8;

#[derive(Error, Debug)]
pub enum Error {
    #[error("buffer too short")]
    BufferTooShort,

    #[error("varint exceeds maximum value (2^62 - 1)")]
    VarintOverflow,

    #[error("invalid session id: {0}")]
    InvalidSessionId(u64),

    #[error("capsule decode error: {0}")]
    CapsuleError(String),

    #[error("close message too long (max 1024 bytes)")]
    CloseMessageTooLong,
}

// ---------------------------------------------------------------------------
// Application error code mapping
//
// HTTP/3 reserves the contiguous range [WT_APP_ERROR_FIRST, WT_APP_ERROR_LAST]
// for WebTransport stream errors, with every 0x1f-th codepoint (those of the
// form 0x1f * N + 0x21) withheld for GREASE. Removing the withheld points
// leaves exactly 256 codes, mapped 1:1 onto the 8-bit WebTransport space.
// ---------------------------------------------------------------------------

/// WebTransport stream error used when an HTTP/3 code has no mapping.
pub const DEFAULT_STREAM_ERROR: StreamErrorCode = 0;

/// Convert a WebTransport stream error code to its HTTP/3 equivalent.
pub fn webtransport_to_http3_error(e: StreamErrorCode) -> u64 {
    let e = u64::from(e);
    WT_APP_ERROR_FIRST + e + e / 0x1e
}

/// Convert an HTTP/3 error code to a WebTransport stream error code.
///
/// Returns `None` if the code is outside the reserved range or falls on a
/// GREASE codepoint.
pub fn http3_to_webtransport_error(h: u64) -> Option<StreamErrorCode> {
    if !(WT_APP_ERROR_FIRST..=WT_APP_ERROR_LAST).contains(&h) {
        return None;
    }
    if (h - 0x21) % 0x1f == 0 {
        return None;
    }
    let shifted = h - WT_APP_ERROR_FIRST;
    let wt = shifted - shifted / 0x1f;
    debug_assert!(wt <= u64::from(StreamErrorCode::MAX));
    Some(wt as StreamErrorCode)
}

/// Like [`http3_to_webtransport_error`], but substitutes
/// [`DEFAULT_STREAM_ERROR`] when no mapping exists.
pub fn http3_to_webtransport_error_or_default(h: u64) -> StreamErrorCode {
    http3_to_webtransport_error(h).unwrap_or(DEFAULT_STREAM_ERROR)
}
