//! Upcall surface from a session to the embedding application.

use crate::error::SessionErrorCode;

/// Capability set installed on a [`Session`](crate::session::Session).
///
/// Stream-availability and can-create upcalls are edge-triggered: the
/// visitor must drain via the matching `accept_*` / `open_outgoing_*` call
/// until it returns `None`.
pub trait SessionVisitor {
    /// The CONNECT exchange succeeded. Fired once, before any
    /// `on_incoming_*_available` for buffered streams.
    fn on_session_ready(&mut self, headers: &[(String, String)]);

    /// Terminal close. Fired exactly once, with the error state of whichever
    /// side sent first.
    fn on_session_closed(&mut self, error_code: SessionErrorCode, error_message: &str);

    fn on_incoming_bidirectional_stream_available(&mut self);
    fn on_incoming_unidirectional_stream_available(&mut self);

    /// A datagram arrived. Unordered; may be dropped under carrier pressure.
    fn on_datagram_received(&mut self, payload: &[u8]);

    fn on_can_create_new_outgoing_bidirectional_stream(&mut self);
    fn on_can_create_new_outgoing_unidirectional_stream(&mut self);
}

/// Default sink installed by the session constructor so that upcalls arriving
/// before the application installs its own visitor never fault.
#[derive(Debug, Default)]
pub struct NoopVisitor;

impl SessionVisitor for NoopVisitor {
    fn on_session_ready(&mut self, _headers: &[(String, String)]) {}
    fn on_session_closed(&mut self, _error_code: SessionErrorCode, _error_message: &str) {}
    fn on_incoming_bidirectional_stream_available(&mut self) {}
    fn on_incoming_unidirectional_stream_available(&mut self) {}
    fn on_datagram_received(&mut self, _payload: &[u8]) {}
    fn on_can_create_new_outgoing_bidirectional_stream(&mut self) {}
    fn on_can_create_new_outgoing_unidirectional_stream(&mut self) {}
}
