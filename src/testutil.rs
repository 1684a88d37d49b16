//! Shared mocks for unit tests: a recording carrier and visitor.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use crate::carrier::{Carrier, DatagramStatus};
use crate::error::SessionErrorCode;
use crate::session::{Session, SessionId};
use crate::visitor::SessionVisitor;

#[derive(Debug, Clone, PartialEq)]
pub enum Ev {
    Ready,
    Closed(SessionErrorCode, String),
    BidiAvailable,
    UniAvailable,
    Datagram(Vec<u8>),
    CanBidi,
    CanUni,
}

#[derive(Clone, Default)]
pub struct RecordingVisitor(pub Rc<RefCell<Vec<Ev>>>);

impl SessionVisitor for RecordingVisitor {
    fn on_session_ready(&mut self, _headers: &[(String, String)]) {
        self.0.borrow_mut().push(Ev::Ready);
    }
    fn on_session_closed(&mut self, error_code: SessionErrorCode, error_message: &str) {
        self.0
            .borrow_mut()
            .push(Ev::Closed(error_code, error_message.to_string()));
    }
    fn on_incoming_bidirectional_stream_available(&mut self) {
        self.0.borrow_mut().push(Ev::BidiAvailable);
    }
    fn on_incoming_unidirectional_stream_available(&mut self) {
        self.0.borrow_mut().push(Ev::UniAvailable);
    }
    fn on_datagram_received(&mut self, payload: &[u8]) {
        self.0.borrow_mut().push(Ev::Datagram(payload.to_vec()));
    }
    fn on_can_create_new_outgoing_bidirectional_stream(&mut self) {
        self.0.borrow_mut().push(Ev::CanBidi);
    }
    fn on_can_create_new_outgoing_unidirectional_stream(&mut self) {
        self.0.borrow_mut().push(Ev::CanUni);
    }
}

/// Carrier that records every interaction for assertions.
pub struct TestCarrier {
    pub connect_writes: Vec<(SessionId, Vec<u8>, bool)>,
    pub stream_writes: Vec<(u64, Vec<u8>, bool)>,
    pub resets: Vec<(u64, u64)>,
    pub dead_streams: HashSet<u64>,
    pub admit_streams: bool,
    pub open_ids: VecDeque<u64>,
    pub datagrams: Vec<(SessionId, Option<u64>, Vec<u8>)>,
    pub datagram_status: DatagramStatus,
    pub queue_expiries: Vec<(SessionId, Duration)>,
    pub visitor_registrations: Vec<(SessionId, bool)>,
    pub visitor_unregistrations: Vec<SessionId>,
    pub context_registrations: Vec<(SessionId, Option<u64>)>,
    pub context_unregistrations: Vec<(SessionId, Option<u64>)>,
    pub associations: Vec<(SessionId, u64)>,
    pub buffered_drains: Vec<SessionId>,
    pub fatal: Option<(u64, String)>,
    pub next_context_id: u64,
    /// Session handed back by `session_mut`, for stream-to-session tests.
    pub session: Option<Session>,
}

impl Default for TestCarrier {
    fn default() -> Self {
        Self {
            connect_writes: Vec::new(),
            stream_writes: Vec::new(),
            resets: Vec::new(),
            dead_streams: HashSet::new(),
            admit_streams: true,
            open_ids: VecDeque::new(),
            datagrams: Vec::new(),
            datagram_status: DatagramStatus::Sent,
            queue_expiries: Vec::new(),
            visitor_registrations: Vec::new(),
            visitor_unregistrations: Vec::new(),
            context_registrations: Vec::new(),
            context_unregistrations: Vec::new(),
            associations: Vec::new(),
            buffered_drains: Vec::new(),
            fatal: None,
            next_context_id: 0,
            session: None,
        }
    }
}

impl Carrier for TestCarrier {
    fn write_connect_body(&mut self, session_id: SessionId, data: &[u8], fin: bool) {
        self.connect_writes.push((session_id, data.to_vec(), fin));
    }
    fn write_stream(&mut self, stream_id: u64, data: &[u8], fin: bool) {
        self.stream_writes.push((stream_id, data.to_vec(), fin));
    }
    fn reset_stream(&mut self, stream_id: u64, error_code: u64) {
        self.resets.push((stream_id, error_code));
    }
    fn fatal_error(&mut self, error_code: u64, reason: &str) {
        self.fatal = Some((error_code, reason.to_string()));
    }
    fn stream_is_live(&self, stream_id: u64) -> bool {
        !self.dead_streams.contains(&stream_id)
    }
    fn can_open_outgoing_bidirectional_stream(&mut self, _session_id: SessionId) -> bool {
        self.admit_streams
    }
    fn can_open_outgoing_unidirectional_stream(&mut self, _session_id: SessionId) -> bool {
        self.admit_streams
    }
    fn open_outgoing_bidirectional_stream(&mut self, _session_id: SessionId) -> Option<u64> {
        if self.admit_streams {
            self.open_ids.pop_front()
        } else {
            None
        }
    }
    fn open_outgoing_unidirectional_stream(&mut self, _session_id: SessionId) -> Option<u64> {
        if self.admit_streams {
            self.open_ids.pop_front()
        } else {
            None
        }
    }
    fn send_datagram(
        &mut self,
        session_id: SessionId,
        context_id: Option<u64>,
        payload: &[u8],
    ) -> DatagramStatus {
        self.datagrams.push((session_id, context_id, payload.to_vec()));
        self.datagram_status
    }
    fn max_datagram_size(&self, _session_id: SessionId, _context_id: Option<u64>) -> usize {
        1200
    }
    fn set_datagram_queue_expiry(&mut self, session_id: SessionId, expiry: Duration) {
        self.queue_expiries.push((session_id, expiry));
    }
    fn register_datagram_visitor(&mut self, session_id: SessionId, use_contexts: bool) {
        self.visitor_registrations.push((session_id, use_contexts));
    }
    fn unregister_datagram_visitor(&mut self, session_id: SessionId) {
        self.visitor_unregistrations.push(session_id);
    }
    fn next_datagram_context_id(&mut self, _session_id: SessionId) -> u64 {
        let id = self.next_context_id;
        self.next_context_id += 1;
        id
    }
    fn register_datagram_context(&mut self, session_id: SessionId, context_id: Option<u64>) {
        self.context_registrations.push((session_id, context_id));
    }
    fn unregister_datagram_context(&mut self, session_id: SessionId, context_id: Option<u64>) {
        self.context_unregistrations.push((session_id, context_id));
    }
    fn associate_stream(&mut self, session_id: SessionId, stream_id: u64) {
        self.associations.push((session_id, stream_id));
    }
    fn process_buffered_streams(&mut self, session_id: SessionId) {
        self.buffered_drains.push(session_id);
    }
    fn session_mut(&mut self, session_id: SessionId) -> Option<&mut Session> {
        self.session
            .as_mut()
            .filter(|session| session.id() == session_id)
    }
}
