//! Unidirectional WebTransport stream wrapper.
//!
//! Every unidirectional WebTransport stream opens with a preamble of two
//! varints: the stream type and the owning session's ID. An outgoing stream
//! writes the preamble before any application byte; an incoming stream
//! cannot deliver application bytes until the session ID has been read and
//! the stream routed to its session.

use crate::carrier::Carrier;
use crate::error::{http3_to_webtransport_error_or_default, Result, StreamErrorCode};
use crate::frame;
use crate::session::SessionId;
use crate::varint;

// ---------------------------------------------------------------------------
// Stream ID parity
// ---------------------------------------------------------------------------

/// Whether the QUIC stream was opened by the client.
pub fn is_client_initiated(stream_id: u64) -> bool {
    stream_id & 0x01 == 0
}

/// Whether the QUIC stream is bidirectional.
pub fn is_bidi(stream_id: u64) -> bool {
    stream_id & 0x02 == 0
}

/// Whether this endpoint opened the stream.
pub fn is_locally_initiated(stream_id: u64, is_server: bool) -> bool {
    is_client_initiated(stream_id) != is_server
}

// ---------------------------------------------------------------------------
// Application-facing adapter
// ---------------------------------------------------------------------------

/// Upcalls from a stream to the application reading or writing it.
pub trait StreamVisitor {
    fn on_can_read(&mut self);
    fn on_can_write(&mut self);
    fn on_reset_stream_received(&mut self, error: StreamErrorCode);
    fn on_stop_sending_received(&mut self, error: StreamErrorCode);
    fn on_write_side_in_data_recvd_state(&mut self);
}

/// Sink between the stream and the application. Holds the application's
/// visitor; upcalls arriving before one is installed are dropped.
#[derive(Default)]
pub struct StreamAdapter {
    visitor: Option<Box<dyn StreamVisitor>>,
}

impl StreamAdapter {
    pub fn set_visitor(&mut self, visitor: Box<dyn StreamVisitor>) {
        self.visitor = Some(visitor);
    }

    pub fn visitor_mut(&mut self) -> Option<&mut (dyn StreamVisitor + 'static)> {
        self.visitor.as_deref_mut()
    }
}

// ---------------------------------------------------------------------------
// The stream wrapper
// ---------------------------------------------------------------------------

/// Session binding of a unidirectional stream. An incoming stream starts
/// unbound and binds exactly once, when its preamble resolves; an outgoing
/// stream is bound at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    AwaitingPreamble,
    Bound(SessionId),
}

pub struct UnidirectionalStream {
    id: u64,
    binding: Binding,
    needs_preamble: bool,
    adapter: StreamAdapter,
    recv_buf: Vec<u8>,
    fin_received: bool,
}

impl UnidirectionalStream {
    /// Wrap a newly-arrived peer stream. The carrier has already consumed
    /// the stream-type varint while classifying it; the session ID is still
    /// on the wire.
    pub fn new_incoming(id: u64) -> Self {
        Self {
            id,
            binding: Binding::AwaitingPreamble,
            needs_preamble: false,
            adapter: StreamAdapter::default(),
            recv_buf: Vec::new(),
            fin_received: false,
        }
    }

    /// Wrap a locally-created stream, bound to its session from the start.
    pub fn new_outgoing(id: u64, session_id: SessionId) -> Self {
        Self {
            id,
            binding: Binding::Bound(session_id),
            needs_preamble: true,
            adapter: StreamAdapter::default(),
            recv_buf: Vec::new(),
            fin_received: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn session_id(&self) -> Option<SessionId> {
        match self.binding {
            Binding::Bound(session_id) => Some(session_id),
            Binding::AwaitingPreamble => None,
        }
    }

    pub fn adapter_mut(&mut self) -> &mut StreamAdapter {
        &mut self.adapter
    }

    // -----------------------------------------------------------------------
    // Write side
    // -----------------------------------------------------------------------

    /// Send the `(stream-type, session-id)` preamble on an outgoing stream.
    /// Valid exactly once; any other time is an internal invariant violation
    /// that tears the connection down.
    pub fn write_preamble<C: Carrier>(&mut self, carrier: &mut C) -> Result<()> {
        let session_id = match self.binding {
            Binding::Bound(session_id) if self.needs_preamble => session_id,
            _ => {
                tracing::error!(
                    stream_id = self.id,
                    "attempted to send a stream preamble at the wrong time"
                );
                carrier.fatal_error(
                    frame::H3_INTERNAL_ERROR,
                    "attempted to send a unidirectional stream preamble at the wrong time",
                );
                return Ok(());
            }
        };

        let mut buf = Vec::with_capacity(16);
        varint::encode(frame::WT_UNI_STREAM_TYPE, &mut buf)?;
        varint::encode(session_id, &mut buf)?;
        carrier.write_stream(self.id, &buf, false);
        self.needs_preamble = false;
        tracing::debug!(stream_id = self.id, session_id, "sent stream preamble");
        Ok(())
    }

    /// Write application bytes. The preamble must have been written first.
    pub fn write<C: Carrier>(&mut self, carrier: &mut C, data: &[u8], fin: bool) {
        debug_assert!(!self.needs_preamble, "application bytes before the preamble");
        carrier.write_stream(self.id, data, fin);
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    /// Bytes (and possibly FIN) arrived from the transport.
    pub fn on_data<C: Carrier>(&mut self, carrier: &mut C, data: &[u8], fin: bool) {
        self.recv_buf.extend_from_slice(data);
        if fin {
            self.fin_received = true;
        }
        self.on_data_available(carrier);
    }

    /// Resolve the preamble if still pending, then wake the application.
    pub fn on_data_available<C: Carrier>(&mut self, carrier: &mut C) {
        if self.binding == Binding::AwaitingPreamble && !self.read_session_id(carrier) {
            return;
        }
        if self.recv_buf.is_empty() && !self.fin_received {
            return;
        }
        if let Some(visitor) = self.adapter.visitor_mut() {
            visitor.on_can_read();
        }
    }

    /// Try to decode the session ID off the front of the receive buffer.
    ///
    /// On success, consumes exactly the preamble bytes, binds the stream and
    /// asks the carrier to route it to its session. On a short read, leaves
    /// the buffer intact for the next data arrival. If the stream has
    /// already finished, everything buffered is consumed instead so the
    /// stream can close cleanly.
    fn read_session_id<C: Carrier>(&mut self, carrier: &mut C) -> bool {
        match varint::decode(&self.recv_buf) {
            Ok((session_id, consumed)) => {
                self.recv_buf.drain(..consumed);
                self.binding = Binding::Bound(session_id);
                carrier.associate_stream(session_id, self.id);
                true
            }
            Err(_) => {
                if self.fin_received {
                    tracing::warn!(
                        stream_id = self.id,
                        "stream ended before its session id could be read"
                    );
                    self.recv_buf.clear();
                }
                false
            }
        }
    }

    /// Read buffered application bytes into `out`, returning the count.
    /// Yields nothing until the stream is bound: preamble bytes are never
    /// application data.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        if self.binding == Binding::AwaitingPreamble {
            return 0;
        }
        let n = out.len().min(self.recv_buf.len());
        out[..n].copy_from_slice(&self.recv_buf[..n]);
        self.recv_buf.drain(..n);
        n
    }

    pub fn readable_bytes(&self) -> usize {
        match self.binding {
            Binding::Bound(_) => self.recv_buf.len(),
            Binding::AwaitingPreamble => 0,
        }
    }

    pub fn fin_received(&self) -> bool {
        self.fin_received
    }

    // -----------------------------------------------------------------------
    // Lifecycle notifications from the carrier
    // -----------------------------------------------------------------------

    /// The stream is fully closed; tell the owning session to forget it.
    pub fn on_close<C: Carrier>(&mut self, carrier: &mut C) {
        let Binding::Bound(session_id) = self.binding else {
            return;
        };
        match carrier.session_mut(session_id) {
            Some(session) => session.on_stream_closed(self.id),
            // The session can be torn down before its streams finish closing.
            None => tracing::warn!(
                stream_id = self.id,
                session_id,
                "closed stream could not find its session"
            ),
        }
    }

    /// Peer reset the stream. The HTTP/3 code maps into the WebTransport
    /// error space before reaching the application.
    pub fn on_stream_reset(&mut self, http3_error_code: u64) {
        if let Some(visitor) = self.adapter.visitor_mut() {
            visitor.on_reset_stream_received(http3_to_webtransport_error_or_default(
                http3_error_code,
            ));
        }
    }

    /// Peer asked us to stop sending.
    pub fn on_stop_sending(&mut self, http3_error_code: u64) {
        if let Some(visitor) = self.adapter.visitor_mut() {
            visitor.on_stop_sending_received(http3_to_webtransport_error_or_default(
                http3_error_code,
            ));
        }
    }

    /// Every outgoing byte has been acknowledged.
    pub fn on_write_side_in_data_recvd_state(&mut self) {
        if let Some(visitor) = self.adapter.visitor_mut() {
            visitor.on_write_side_in_data_recvd_state();
        }
    }

    pub fn on_can_write(&mut self) {
        if let Some(visitor) = self.adapter.visitor_mut() {
            visitor.on_can_write();
        }
    }
}
