//! Per-call session records and the engine-private session table.
//!
//! A session ties one outstanding call to its connection handle, its timer,
//! and (client side) the continuation awaiting the outcome. It is created
//! when a call starts waiting and destroyed by exactly one of: reply
//! arrival, exception arrival, timeout, or engine teardown.
//!
//! ```text
//! client side:  send_request  -> session -> reply | exception | timeout
//! server side:  process_request -> session -> reply sink invoked | timeout
//! oneway:       no session
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use crate::protocol::RpcHead;

/// Continuation a client installs to receive `(status, payload)` when a
/// reply or exception arrives or a timeout fires. Invoked at most once; its
/// return value replaces the status reported to metrics and completion
/// events, letting callers upgrade or downgrade the observed status.
pub type ResponseCallback = Box<dyn FnOnce(i32, &[u8]) -> i32 + Send>;

/// One outstanding call, client or server side.
pub struct RpcSession {
    /// Unique within the owning engine's lifetime.
    pub session_id: u64,
    /// Opaque transport connection id the outcome is tied to.
    pub handle: i64,
    /// Timer armed for this session;
    /// [`INVALID_TIMER_ID`](crate::timer::INVALID_TIMER_ID) means none.
    pub timer_id: i64,
    /// When the call started waiting, for latency reporting.
    pub start_time: Instant,
    /// Snapshot of the request head, reused to form the reply or exception.
    pub head: RpcHead,
    /// Server side processes a request; client side awaits a reply.
    pub server_side: bool,
    /// Set for client-side sessions only.
    pub on_response: Option<ResponseCallback>,
}

impl RpcSession {
    /// Session for a caller awaiting a reply. Keyed by the session id the
    /// caller stamped into the head.
    pub fn client(handle: i64, timer_id: i64, head: RpcHead, on_response: ResponseCallback) -> Self {
        RpcSession {
            session_id: head.session_id,
            handle,
            timer_id,
            start_time: Instant::now(),
            head,
            server_side: false,
            on_response: Some(on_response),
        }
    }

    /// Session for a request being processed. Keyed by an engine-generated
    /// id; the snapshotted head keeps the caller's session id for the echo.
    pub fn server(session_id: u64, handle: i64, timer_id: i64, head: RpcHead) -> Self {
        RpcSession {
            session_id,
            handle,
            timer_id,
            start_time: Instant::now(),
            head,
            server_side: true,
            on_response: None,
        }
    }

    /// Milliseconds since the call started waiting.
    pub fn elapsed_ms(&self) -> i64 {
        self.start_time.elapsed().as_millis() as i64
    }
}

impl fmt::Debug for RpcSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcSession")
            .field("session_id", &self.session_id)
            .field("handle", &self.handle)
            .field("timer_id", &self.timer_id)
            .field("server_side", &self.server_side)
            .field("function_name", &self.head.function_name)
            .field("has_continuation", &self.on_response.is_some())
            .finish()
    }
}

/// Unique-keyed map `session_id -> RpcSession`, private to one engine.
pub(crate) struct SessionTable {
    sessions: HashMap<u64, RpcSession>,
}

impl SessionTable {
    pub fn new() -> Self {
        SessionTable {
            sessions: HashMap::new(),
        }
    }

    pub fn insert(&mut self, session: RpcSession) {
        tracing::debug!(
            session_id = session.session_id,
            handle = session.handle,
            server_side = session.server_side,
            function = %session.head.function_name,
            total_sessions = self.sessions.len() + 1,
            "session created"
        );
        self.sessions.insert(session.session_id, session);
    }

    pub fn remove(&mut self, session_id: u64) -> Option<RpcSession> {
        let removed = self.sessions.remove(&session_id);
        if removed.is_some() {
            tracing::debug!(
                session_id,
                total_sessions = self.sessions.len(),
                "session removed"
            );
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}
