//! The WebTransport session object.
//!
//! A session binds an extended-CONNECT stream to the population of data
//! streams and datagrams associated with it, mediates bidirectional close,
//! and reshapes carrier events into [`SessionVisitor`] upcalls. The carrier
//! owns the session; streams refer to it by [`SessionId`] and re-resolve on
//! every access.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use crate::capsule::CloseCapsule;
use crate::carrier::{Carrier, DatagramFormat, DatagramStatus};
use crate::error::{Error, Result, SessionErrorCode};
use crate::frame;
use crate::stream::{is_bidi, is_locally_initiated};
use crate::varint;
use crate::visitor::{NoopVisitor, SessionVisitor};

/// Identity of a WebTransport session: the transport stream ID of its
/// CONNECT stream.
pub type SessionId = u64;

pub struct Session {
    id: SessionId,
    is_server: bool,
    ready: bool,

    /// Transport stream IDs currently associated with this session.
    streams: HashSet<u64>,
    pending_incoming_bidi: VecDeque<u64>,
    pending_incoming_uni: VecDeque<u64>,

    visitor: Box<dyn SessionVisitor>,

    close_sent: bool,
    close_received: bool,
    close_notified: bool,
    error_code: SessionErrorCode,
    error_message: String,

    context_known: bool,
    context_registered: bool,
    context_id: Option<u64>,
}

impl Session {
    /// Create a session for an established extended-CONNECT exchange.
    ///
    /// `id` is the CONNECT stream's ID, which must be client-initiated and
    /// bidirectional. The session installs itself as the CONNECT stream's
    /// datagram registration visitor; a client additionally claims the
    /// context slot up front, allocating a fresh context ID when
    /// `use_datagram_contexts` is set.
    pub fn new<C: Carrier>(
        carrier: &mut C,
        id: SessionId,
        is_server: bool,
        use_datagram_contexts: bool,
    ) -> Result<Self> {
        if id % 4 != 0 || id > varint::MAX_VARINT {
            return Err(Error::InvalidSessionId(id));
        }
        carrier.register_datagram_visitor(id, use_datagram_contexts);

        let mut session = Self {
            id,
            is_server,
            ready: false,
            streams: HashSet::new(),
            pending_incoming_bidi: VecDeque::new(),
            pending_incoming_uni: VecDeque::new(),
            visitor: Box::new(NoopVisitor),
            close_sent: false,
            close_received: false,
            close_notified: false,
            error_code: 0,
            error_message: String::new(),
            context_known: false,
            context_registered: false,
            context_id: None,
        };
        if !is_server {
            session.context_known = true;
            session.context_registered = true;
            if use_datagram_contexts {
                session.context_id = Some(carrier.next_datagram_context_id(id));
            }
        }
        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_closed(&self) -> bool {
        self.close_notified
    }

    pub fn context_id(&self) -> Option<u64> {
        self.context_id
    }

    /// Replace the visitor. The constructor installs a no-op visitor so that
    /// upcalls arriving before the application installs its own never fault.
    pub fn set_visitor(&mut self, visitor: Box<dyn SessionVisitor>) {
        self.visitor = visitor;
    }

    // -----------------------------------------------------------------------
    // Stream association and acceptance
    // -----------------------------------------------------------------------

    /// Take ownership of a stream the carrier has determined to belong to
    /// this session. Peer-initiated streams are queued for acceptance and
    /// announced to the visitor; locally-initiated ones are only tracked,
    /// since the application already holds their handle.
    pub fn associate_stream(&mut self, stream_id: u64) {
        self.streams.insert(stream_id);

        if is_locally_initiated(stream_id, self.is_server) {
            return;
        }
        if is_bidi(stream_id) {
            self.pending_incoming_bidi.push_back(stream_id);
            self.visitor.on_incoming_bidirectional_stream_available();
        } else {
            self.pending_incoming_uni.push_back(stream_id);
            self.visitor.on_incoming_unidirectional_stream_available();
        }
    }

    /// A stream associated with this session closed normally.
    pub fn on_stream_closed(&mut self, stream_id: u64) {
        self.streams.remove(&stream_id);
    }

    pub fn accept_incoming_bidirectional_stream<C: Carrier>(
        &mut self,
        carrier: &C,
    ) -> Option<u64> {
        if self.close_notified {
            return None;
        }
        Self::pop_live(&mut self.pending_incoming_bidi, carrier)
    }

    pub fn accept_incoming_unidirectional_stream<C: Carrier>(
        &mut self,
        carrier: &C,
    ) -> Option<u64> {
        if self.close_notified {
            return None;
        }
        Self::pop_live(&mut self.pending_incoming_uni, carrier)
    }

    fn pop_live<C: Carrier>(queue: &mut VecDeque<u64>, carrier: &C) -> Option<u64> {
        while let Some(stream_id) = queue.pop_front() {
            // Skip streams reset between arrival and acceptance.
            if carrier.stream_is_live(stream_id) {
                return Some(stream_id);
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Outgoing streams
    // -----------------------------------------------------------------------

    pub fn can_open_next_outgoing_bidirectional_stream<C: Carrier>(
        &mut self,
        carrier: &mut C,
    ) -> bool {
        carrier.can_open_outgoing_bidirectional_stream(self.id)
    }

    pub fn can_open_next_outgoing_unidirectional_stream<C: Carrier>(
        &mut self,
        carrier: &mut C,
    ) -> bool {
        carrier.can_open_outgoing_unidirectional_stream(self.id)
    }

    /// Open an outgoing stream, or `None` when the carrier refuses admission.
    /// The application retries after `on_can_create_new_outgoing_*`.
    pub fn open_outgoing_bidirectional_stream<C: Carrier>(
        &mut self,
        carrier: &mut C,
    ) -> Option<u64> {
        if self.close_notified {
            return None;
        }
        let stream_id = carrier.open_outgoing_bidirectional_stream(self.id)?;
        self.associate_stream(stream_id);
        Some(stream_id)
    }

    pub fn open_outgoing_unidirectional_stream<C: Carrier>(
        &mut self,
        carrier: &mut C,
    ) -> Option<u64> {
        if self.close_notified {
            return None;
        }
        let stream_id = carrier.open_outgoing_unidirectional_stream(self.id)?;
        self.associate_stream(stream_id);
        Some(stream_id)
    }

    /// Carrier re-arm after a refused open.
    pub fn on_can_create_new_outgoing_bidirectional_stream(&mut self) {
        self.visitor.on_can_create_new_outgoing_bidirectional_stream();
    }

    pub fn on_can_create_new_outgoing_unidirectional_stream(&mut self) {
        self.visitor.on_can_create_new_outgoing_unidirectional_stream();
    }

    // -----------------------------------------------------------------------
    // Datagrams
    // -----------------------------------------------------------------------

    pub fn send_or_queue_datagram<C: Carrier>(
        &mut self,
        carrier: &mut C,
        payload: &[u8],
    ) -> DatagramStatus {
        carrier.send_datagram(self.id, self.context_id, payload)
    }

    pub fn max_datagram_size<C: Carrier>(&self, carrier: &C) -> usize {
        carrier.max_datagram_size(self.id, self.context_id)
    }

    pub fn set_datagram_max_time_in_queue<C: Carrier>(
        &mut self,
        carrier: &mut C,
        max_time_in_queue: Duration,
    ) {
        carrier.set_datagram_queue_expiry(self.id, max_time_in_queue);
    }

    /// A datagram arrived on the CONNECT stream.
    pub fn on_http3_datagram(&mut self, stream_id: u64, context_id: Option<u64>, payload: &[u8]) {
        debug_assert_eq!(stream_id, self.id);
        debug_assert_eq!(context_id, self.context_id);
        self.visitor.on_datagram_received(payload);
    }

    // -----------------------------------------------------------------------
    // Datagram context negotiation
    // -----------------------------------------------------------------------

    /// The peer registered a datagram context on a stream.
    pub fn on_context_received<C: Carrier>(
        &mut self,
        carrier: &mut C,
        stream_id: u64,
        context_id: Option<u64>,
        format: DatagramFormat,
        format_additional_data: &[u8],
    ) {
        if stream_id != self.id {
            debug_assert!(false, "context registered on an unexpected stream");
            tracing::error!(
                stream_id,
                expected = self.id,
                "datagram context registered on the wrong stream"
            );
            return;
        }
        if format != DatagramFormat::WebTransport {
            tracing::debug!(?format, session_id = self.id, "ignoring unknown datagram format");
            return;
        }
        if !format_additional_data.is_empty() {
            tracing::error!(
                session_id = self.id,
                "datagram context registration carries format data"
            );
            carrier.reset_stream(self.id, frame::H3_MESSAGE_ERROR);
            return;
        }
        if !self.context_known {
            self.context_known = true;
            self.context_id = context_id;
        }
        if context_id != self.context_id {
            tracing::debug!(
                ?context_id,
                current = ?self.context_id,
                session_id = self.id,
                "ignoring unexpected datagram context"
            );
            return;
        }
        if self.is_server {
            // A single context slot per session; a second registration is a
            // peer protocol violation.
            if self.context_registered {
                tracing::error!(
                    ?context_id,
                    session_id = self.id,
                    "duplicate datagram context registration"
                );
                carrier.reset_stream(self.id, frame::H3_REQUEST_CANCELLED);
                return;
            }
            self.context_registered = true;
            carrier.register_datagram_context(self.id, self.context_id);
        }
    }

    /// The peer closed a datagram context on a stream.
    pub fn on_context_closed<C: Carrier>(
        &mut self,
        carrier: &mut C,
        stream_id: u64,
        context_id: Option<u64>,
        close_code: u64,
        close_details: &str,
    ) {
        if stream_id != self.id {
            debug_assert!(false, "context closed on an unexpected stream");
            tracing::error!(
                stream_id,
                expected = self.id,
                "datagram context closed on the wrong stream"
            );
            return;
        }
        if context_id != self.context_id {
            tracing::debug!(
                ?context_id,
                current = ?self.context_id,
                session_id = self.id,
                "ignoring close of an unknown datagram context"
            );
            return;
        }
        tracing::debug!(
            close_code,
            close_details,
            session_id = self.id,
            "peer closed the datagram context, resetting CONNECT stream"
        );
        carrier.reset_stream(self.id, frame::H3_MESSAGE_ERROR);
    }

    // -----------------------------------------------------------------------
    // CONNECT response
    // -----------------------------------------------------------------------

    /// The CONNECT response (client) or request (server) headers arrived.
    /// Clients require a 2xx `:status`; anything else leaves the session
    /// un-ready. On success the carrier re-delivers unidirectional streams
    /// whose preamble named this session before it existed.
    pub fn headers_received<C: Carrier>(&mut self, carrier: &mut C, headers: &[(String, String)]) {
        if !self.is_server {
            let status = headers
                .iter()
                .find(|(name, _)| name == ":status")
                .and_then(|(_, value)| value.parse::<u16>().ok());
            match status {
                Some(code) if (200..300).contains(&code) => {}
                Some(code) => {
                    tracing::debug!(
                        session_id = self.id,
                        code,
                        "rejecting CONNECT response status"
                    );
                    return;
                }
                None => {
                    tracing::debug!(
                        session_id = self.id,
                        "CONNECT response without a valid :status, rejecting"
                    );
                    return;
                }
            }
        }

        tracing::debug!(session_id = self.id, "session ready");
        self.ready = true;
        self.visitor.on_session_ready(headers);
        carrier.process_buffered_streams(self.id);
    }

    // -----------------------------------------------------------------------
    // Close protocol
    // -----------------------------------------------------------------------

    /// Close the session, writing a close capsule with FIN on the CONNECT
    /// stream. Strictly single-shot: a second call is a programmer error.
    pub fn close<C: Carrier>(
        &mut self,
        carrier: &mut C,
        error_code: SessionErrorCode,
        error_message: &str,
    ) -> Result<()> {
        if self.close_sent {
            debug_assert!(false, "close() called more than once");
            tracing::error!(session_id = self.id, "close() called more than once");
            return Ok(());
        }
        self.close_sent = true;

        // The peer may have closed first; our answering FIN is already in
        // flight, and nothing more may be written on the stream.
        if self.close_received {
            tracing::debug!(
                session_id = self.id,
                "peer already closed, not sending a close capsule"
            );
            return Ok(());
        }

        self.error_code = error_code;
        self.error_message = error_message.to_string();
        let mut buf = Vec::new();
        CloseCapsule {
            error_code,
            error_message: error_message.to_string(),
        }
        .encode(&mut buf)?;
        carrier.write_connect_body(self.id, &buf, true);
        Ok(())
    }

    /// Close by sending a bare FIN with no capsule. Test hook for driving
    /// the peer's FIN-only close path.
    pub fn close_with_fin_only<C: Carrier>(&mut self, carrier: &mut C) {
        debug_assert!(!self.close_sent);
        self.close_sent = true;
        if self.close_received {
            return;
        }
        carrier.write_connect_body(self.id, &[], true);
    }

    /// The peer's close capsule arrived.
    pub fn on_close_received<C: Carrier>(
        &mut self,
        carrier: &mut C,
        error_code: SessionErrorCode,
        error_message: &str,
    ) {
        if self.close_received {
            debug_assert!(false, "on_close_received called more than once");
            tracing::error!(session_id = self.id, "duplicate close capsule notification");
            return;
        }
        self.close_received = true;

        // If the peer's close crossed ours on the wire, ours was first:
        // keep the local error and ignore the echo.
        if self.close_sent {
            tracing::debug!(
                session_id = self.id,
                "ignoring peer close, already sent our own"
            );
            return;
        }

        self.error_code = error_code;
        self.error_message = error_message.to_string();
        carrier.write_connect_body(self.id, &[], true);
        self.maybe_notify_close();
    }

    /// The CONNECT stream's read side finished without a close capsule.
    pub fn on_connect_stream_fin_received<C: Carrier>(&mut self, carrier: &mut C) {
        // A close capsule already accounted for the FIN that carried it.
        if self.close_received {
            return;
        }
        self.close_received = true;
        if self.close_sent {
            tracing::debug!(
                session_id = self.id,
                "ignoring peer FIN, already sent our close"
            );
            return;
        }

        carrier.write_connect_body(self.id, &[], true);
        self.maybe_notify_close();
    }

    /// Terminal teardown: the CONNECT stream is fully closed in both
    /// directions. Resets every associated stream with the session-gone
    /// code, releases the datagram registration, and fires the close
    /// notification if it has not fired yet.
    pub fn on_connect_stream_closing<C: Carrier>(&mut self, carrier: &mut C) {
        // Snapshot before resetting: resets re-enter the carrier and may
        // mutate its stream tables.
        let streams: Vec<u64> = self.streams.drain().collect();
        for stream_id in streams {
            carrier.reset_stream(stream_id, frame::WT_SESSION_GONE);
        }
        if self.context_registered {
            self.context_registered = false;
            carrier.unregister_datagram_context(self.id, self.context_id);
        }
        carrier.unregister_datagram_visitor(self.id);

        self.maybe_notify_close();
    }

    /// The only path that ever fires `on_session_closed`.
    fn maybe_notify_close(&mut self) {
        if self.close_notified {
            return;
        }
        self.close_notified = true;
        self.visitor
            .on_session_closed(self.error_code, &self.error_message);
    }
}
