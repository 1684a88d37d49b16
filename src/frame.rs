//! Wire constants from draft-ietf-webtrans-http3 and RFC 9114.
//!
//! All numeric codepoints used by the session core are collected here to
//! avoid magic numbers scattered across the codebase.

// ---------------------------------------------------------------------------
// WebTransport stream framing
// ---------------------------------------------------------------------------

/// Unidirectional WebTransport stream type. First varint of the preamble on
/// every unidirectional WebTransport stream, followed by the session ID.
pub const WT_UNI_STREAM_TYPE: u64 = 0x54;

// ---------------------------------------------------------------------------
// HTTP Capsule types
// ---------------------------------------------------------------------------

/// Close the WebTransport session with an error code and message.
pub const CAPSULE_CLOSE_SESSION: u64 = 0x2843;

/// Maximum length of the UTF-8 message carried in a close capsule.
pub const MAX_CLOSE_MESSAGE_LEN: usize = 1024;

// ---------------------------------------------------------------------------
// Reset codes
// ---------------------------------------------------------------------------

/// Data stream aborted because its session is gone. Applied to every
/// associated stream when the session tears down.
pub const WT_SESSION_GONE: u64 = 0x170d7b68;

/// H3 error: internal error. Raised when an internal invariant is violated,
/// e.g. sending a stream preamble at the wrong time.
pub const H3_INTERNAL_ERROR: u64 = 0x0102;

/// H3 error: request cancelled. Resets the CONNECT stream on a duplicate
/// server-side datagram context registration.
pub const H3_REQUEST_CANCELLED: u64 = 0x010c;

/// H3 error: malformed message payload. Resets the CONNECT stream on a
/// context registration carrying format data, or on any context close.
pub const H3_MESSAGE_ERROR: u64 = 0x010e;

// ---------------------------------------------------------------------------
// WebTransport application error code range
// ---------------------------------------------------------------------------

/// First H3 error code reserved for WebTransport stream errors.
pub const WT_APP_ERROR_FIRST: u64 = 0x52e4a40fa8db;

/// Last H3 error code reserved for WebTransport stream errors.
pub const WT_APP_ERROR_LAST: u64 = 0x52e4a40fa9e2;
