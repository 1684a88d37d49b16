//! The carrier interface.
//!
//! The session core does not own a QUIC connection. Everything
//! transport-shaped (stream creation, resets, datagram emission, the
//! CONNECT stream body) goes through [`Carrier`], implemented by the
//! HTTP/3-over-QUIC stack embedding this crate. Sessions and streams hold
//! identifiers, never transport handles, and re-resolve through the carrier
//! on every access.

use std::time::Duration;

use crate::session::{Session, SessionId};

/// Outcome of handing a datagram to the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramStatus {
    /// Passed to the transport for immediate delivery.
    Sent,
    /// Queued in the carrier; will be sent when capacity allows.
    Buffered,
    /// Dropped: larger than the current maximum datagram size.
    DroppedTooBig,
    /// Dropped: the carrier's queue is full.
    DroppedNoCapacity,
    /// Not sent: the transport is congestion-blocked.
    Blocked,
}

/// Format type announced in a datagram context registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramFormat {
    WebTransport,
    Unknown(u64),
}

/// Interface to the HTTP/3-over-QUIC stack.
///
/// All methods complete synchronously; the carrier may buffer writes
/// internally. Back-pressure surfaces as `open_outgoing_*` returning `None`
/// and as a non-`Sent` [`DatagramStatus`].
pub trait Carrier {
    /// Write body bytes (capsules, or an empty buffer for a bare FIN) on the
    /// CONNECT stream of `session_id`. The carrier applies HTTP/3 DATA
    /// framing.
    fn write_connect_body(&mut self, session_id: SessionId, data: &[u8], fin: bool);

    /// Write raw bytes on a data stream.
    fn write_stream(&mut self, stream_id: u64, data: &[u8], fin: bool);

    /// Abruptly terminate a stream with an HTTP/3 error code.
    fn reset_stream(&mut self, stream_id: u64, error_code: u64);

    /// Tear down the connection after an unrecoverable internal error.
    fn fatal_error(&mut self, error_code: u64, reason: &str);

    /// Whether `stream_id` still resolves to a live stream. Streams reset
    /// between arrival and acceptance stop resolving.
    fn stream_is_live(&self, stream_id: u64) -> bool;

    /// Admission control for outgoing streams: transport flow control plus
    /// per-session stream-count limits.
    fn can_open_outgoing_bidirectional_stream(&mut self, session_id: SessionId) -> bool;
    fn can_open_outgoing_unidirectional_stream(&mut self, session_id: SessionId) -> bool;

    /// Allocate an outgoing stream for the session, or `None` when refused.
    /// The caller retries after the matching `on_can_create_new_outgoing_*`
    /// visitor upcall.
    fn open_outgoing_bidirectional_stream(&mut self, session_id: SessionId) -> Option<u64>;
    fn open_outgoing_unidirectional_stream(&mut self, session_id: SessionId) -> Option<u64>;

    /// Emit an HTTP/3 datagram on the session's CONNECT stream.
    fn send_datagram(
        &mut self,
        session_id: SessionId,
        context_id: Option<u64>,
        payload: &[u8],
    ) -> DatagramStatus;

    /// Largest datagram payload currently accepted for this session.
    fn max_datagram_size(&self, session_id: SessionId, context_id: Option<u64>) -> usize;

    /// Drop queued datagrams older than `expiry` instead of sending them.
    fn set_datagram_queue_expiry(&mut self, session_id: SessionId, expiry: Duration);

    /// Install the session as the datagram registration visitor of its
    /// CONNECT stream.
    fn register_datagram_visitor(&mut self, session_id: SessionId, use_contexts: bool);
    fn unregister_datagram_visitor(&mut self, session_id: SessionId);

    /// Allocate a fresh datagram context ID on the CONNECT stream.
    fn next_datagram_context_id(&mut self, session_id: SessionId) -> u64;

    /// Claim / release the datagram context slot on the CONNECT stream.
    fn register_datagram_context(&mut self, session_id: SessionId, context_id: Option<u64>);
    fn unregister_datagram_context(&mut self, session_id: SessionId, context_id: Option<u64>);

    /// Route a preamble-resolved incoming stream to its session. The carrier
    /// calls [`Session::associate_stream`], or buffers the stream until the
    /// named session exists.
    fn associate_stream(&mut self, session_id: SessionId, stream_id: u64);

    /// Re-deliver unidirectional streams whose preamble named `session_id`
    /// before the session was ready.
    fn process_buffered_streams(&mut self, session_id: SessionId);

    /// Look up a live session by ID.
    fn session_mut(&mut self, session_id: SessionId) -> Option<&mut Session>;
}
