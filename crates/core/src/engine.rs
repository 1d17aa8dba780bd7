//! The RPC engine: a bidirectional message-dispatch state machine.
//!
//! One [`Rpc`] instance multiplexes request/response and one-way invocations
//! over opaque connection handles. It owns the session table correlating
//! outstanding calls with pending completions, the timeout scheduler that
//! expires them, and the dispatch table mapping function names to handlers.
//! Wire bytes and head layout belong to the injected
//! [`Transport`] and [`HeadCodec`].
//!
//! ## Message flow
//!
//! ```text
//! inbound bytes ──> on_message ──> CALL/ONEWAY ──> dispatch ──> handler ──> ReplySink
//!                              └─> REPLY/EXCEPTION ──> session lookup ──> continuation
//!
//! send_request ──> codec ──> transport        (session armed unless fire-and-forget)
//! update       ──> expired timers ──> timeout completion per session
//! ```
//!
//! For a given session, exactly one of reply arrival, exception arrival, or
//! timeout completes it; whichever reaches the engine first erases the
//! session and cancels the rest. The engine runs every operation to
//! completion on the calling context; handlers and continuations are invoked
//! with no engine lock held, so they may re-enter the engine freely.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{Result, RpcError, SUCCESS, SYSTEM_OVERLOAD_BASE};
use crate::protocol::{HeadCodec, MsgType, RpcException, RpcHead};
use crate::session::{ResponseCallback, RpcSession, SessionTable};
use crate::timer::{BE_REMOVED, SequenceTimer};
use crate::transport::Transport;

/// Timeout applied to a client request when the caller passes `<= 0`.
pub const DEFAULT_REQUEST_TIMEOUT_MS: i32 = 10_000;

/// Window a server-side handler has to invoke its [`ReplySink`] before the
/// session expires with `PROCESS_TIMEOUT`.
pub const REQ_PROC_TIMEOUT_MS: i32 = 10_000;

/// A registered request handler.
///
/// Receives the request body and a [`ReplySink`]; returns an integer status
/// for the dispatch itself. The sink may be invoked inline or retained and
/// invoked later — the engine requires neither.
pub type RequestHandler = Arc<dyn Fn(&[u8], ReplySink) -> i32 + Send + Sync>;

/// Completion events an application may observe, e.g. to feed metrics.
pub trait RpcEventHandler: Send + Sync {
    /// A server-side request finished: replied, failed, or timed out.
    fn on_request_proc_complete(&self, _name: &str, _result: i32, _elapsed_ms: i64) {}

    /// A client-side call finished: reply, exception, send failure,
    /// fire-and-forget completion, or timeout.
    fn on_response_proc_complete(&self, _name: &str, _result: i32, _elapsed_ms: i64) {}
}

struct Shared {
    codec: Arc<dyn HeadCodec>,
    transport: Arc<dyn Transport>,
    core: Mutex<Core>,
}

struct Core {
    next_session_id: u64,
    sessions: SessionTable,
    services: HashMap<String, RequestHandler>,
    timer: SequenceTimer<u64>,
    event_handler: Option<Arc<dyn RpcEventHandler>>,
    task_num: i64,
    latest_handle: i64,
    last_error: String,
    // Encode scratch, reused across operations.
    head_buf: Vec<u8>,
    exception_buf: Vec<u8>,
}

impl Core {
    fn record_error(&mut self, message: String) {
        tracing::warn!("{message}");
        self.last_error = message;
    }

    fn alloc_session_id(&mut self) -> u64 {
        let id = self.next_session_id;
        self.next_session_id += 1;
        id
    }
}

/// The engine handle. Clones share one engine instance.
pub struct Rpc {
    shared: Arc<Shared>,
}

impl Clone for Rpc {
    fn clone(&self) -> Self {
        Rpc {
            shared: self.shared.clone(),
        }
    }
}

impl Rpc {
    /// Create an engine over the given codec and transport.
    pub fn new(codec: Arc<dyn HeadCodec>, transport: Arc<dyn Transport>) -> Rpc {
        Rpc {
            shared: Arc::new(Shared {
                codec,
                transport,
                core: Mutex::new(Core {
                    // 0 is reserved for the inert oneway reply sink.
                    next_session_id: 1,
                    sessions: SessionTable::new(),
                    services: HashMap::new(),
                    timer: SequenceTimer::new(),
                    event_handler: None,
                    task_num: 0,
                    latest_handle: -1,
                    last_error: String::new(),
                    head_buf: Vec::new(),
                    exception_buf: Vec::new(),
                }),
            }),
        }
    }

    /// Install the completion-event observer.
    pub fn set_event_handler(&self, handler: Arc<dyn RpcEventHandler>) {
        self.shared.core.lock().event_handler = Some(handler);
    }

    /// Mint a session id, monotonically increasing and unique within this
    /// engine. Callers stamp it into a request head before
    /// [`send_request`](Self::send_request).
    pub fn gen_session_id(&self) -> u64 {
        self.shared.core.lock().alloc_session_id()
    }

    /// Register a handler for `name`.
    ///
    /// Fails with [`RpcError::FunctionNameExisted`] on a duplicate name
    /// without replacing the existing handler, and
    /// [`RpcError::InvalidParam`] for an empty name.
    pub fn add_on_request_function(&self, name: &str, handler: RequestHandler) -> Result<()> {
        if name.is_empty() {
            self.record_error("cannot register an empty function name".to_string());
            return Err(RpcError::InvalidParam);
        }
        let mut core = self.shared.core.lock();
        if core.services.contains_key(name) {
            core.record_error(format!("'{name}' is already registered"));
            return Err(RpcError::FunctionNameExisted);
        }
        core.services.insert(name.to_string(), handler);
        tracing::debug!(function = name, "request handler registered");
        Ok(())
    }

    /// Remove the handler for `name`. Fails with
    /// [`RpcError::FunctionNameUnexisted`] when the name is not registered.
    pub fn remove_on_request_function(&self, name: &str) -> Result<()> {
        if self.shared.core.lock().services.remove(name).is_some() {
            tracing::debug!(function = name, "request handler removed");
            Ok(())
        } else {
            Err(RpcError::FunctionNameUnexisted)
        }
    }

    /// Entry point for inbound bytes from the transport.
    ///
    /// Decodes the head and routes by message type. `overload_hint` is the
    /// transport's admission-control verdict: non-zero rejects a CALL with
    /// an exception coded `SYSTEM_OVERLOAD_BASE - hint` instead of
    /// dispatching it.
    pub fn on_message(&self, handle: i64, buf: &[u8], overload_hint: u32) -> Result<()> {
        if buf.is_empty() {
            self.record_error(format!("invalid message: empty buffer from handle {handle}"));
            return Err(RpcError::InvalidParam);
        }

        let (head, head_len) = match self.shared.codec.head_decode(buf) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.record_error(format!("head decode failed: {e}"));
                return Err(RpcError::DecodeFailed);
            }
        };
        if head_len > buf.len() {
            self.record_error(format!(
                "decoded head length {head_len} exceeds buffer length {}",
                buf.len()
            ));
            return Err(RpcError::DecodeFailed);
        }
        let body = &buf[head_len..];

        match head.message_type {
            MsgType::Call if overload_hint != 0 => {
                let code = SYSTEM_OVERLOAD_BASE - overload_hint as i32;
                let name = head.function_name.clone();
                let ret = {
                    let mut core = self.shared.core.lock();
                    self.response_exception_locked(&mut core, handle, code, head, &[])
                };
                self.emit_request_complete(&name, code, 0);
                RpcError::check(ret)
            }
            MsgType::Call | MsgType::Oneway => {
                // Handlers invoked from this dispatch can learn who is
                // calling them without the engine exposing call context.
                self.shared.core.lock().latest_handle = handle;
                RpcError::check(self.process_request(handle, head, body))
            }
            MsgType::Reply | MsgType::Exception => {
                RpcError::check(self.process_response(head, body))
            }
        }
    }

    /// Send a request on `handle`.
    ///
    /// With a continuation, a client-side session is armed with
    /// `timeout_ms` (defaulted to [`DEFAULT_REQUEST_TIMEOUT_MS`] when
    /// `<= 0`) and completed by exactly one of reply, exception, or timeout.
    /// Without one, the call is fire-and-forget at the engine layer: the
    /// completion event fires immediately and no session is kept.
    ///
    /// A transport refusal completes the call with `SEND_FAILED` and
    /// returns the transport's own error.
    pub fn send_request(
        &self,
        handle: i64,
        head: RpcHead,
        body: &[u8],
        on_response: Option<ResponseCallback>,
        timeout_ms: i32,
    ) -> Result<()> {
        let ret = {
            let mut core = self.shared.core.lock();
            self.send_locked(&mut core, handle, &head, body)
        };
        if ret != SUCCESS {
            self.record_error(format!(
                "send request '{}' to handle {handle} failed ({ret})",
                head.function_name
            ));
            self.emit_response_complete(&head.function_name, RpcError::SendFailed.code(), 0);
            return RpcError::check(ret);
        }

        let Some(on_response) = on_response else {
            self.emit_response_complete(&head.function_name, SUCCESS, 0);
            return Ok(());
        };

        let timeout_ms = if timeout_ms <= 0 {
            DEFAULT_REQUEST_TIMEOUT_MS
        } else {
            timeout_ms
        };
        let mut core = self.shared.core.lock();
        let timer_id = core
            .timer
            .start_timer(Duration::from_millis(timeout_ms as u64), head.session_id);
        core.sessions
            .insert(RpcSession::client(handle, timer_id, head, on_response));
        Ok(())
    }

    /// Broadcast a request to every instance bound to `name`.
    /// Fire-and-forget: no session is tracked.
    pub fn broadcast_request(&self, name: &str, head: &RpcHead, body: &[u8]) -> Result<()> {
        let receivers = {
            let mut core = self.shared.core.lock();
            core.head_buf.clear();
            if let Err(e) = self.shared.codec.head_encode(head, &mut core.head_buf) {
                core.record_error(format!("head encode failed: {e}"));
                return Err(RpcError::EncodeFailed);
            }
            self.shared
                .transport
                .broadcastv(name, &[&core.head_buf, body])
        };
        if receivers >= 0 {
            Ok(())
        } else {
            self.record_error(format!("broadcast to '{name}' failed ({receivers})"));
            Err(RpcError::BroadcastFailed)
        }
    }

    /// Complete a server-side session.
    ///
    /// Usually reached through [`ReplySink::reply`]. `status == 0` echoes
    /// the snapshotted head as a reply carrying `body`; any other status is
    /// transmitted as an exception with `body` as its message. Either way
    /// the timer is stopped and the session erased — a failed reply send
    /// cannot be retried without a fresh request.
    pub fn send_response(&self, session_id: u64, status: i32, body: &[u8]) -> Result<()> {
        let (name, ret, result, elapsed_ms) = {
            let mut core = self.shared.core.lock();
            let Some(mut session) = core.sessions.remove(session_id) else {
                core.record_error(format!("session {session_id} not found"));
                return Err(RpcError::SessionNotFound);
            };
            core.timer.stop_timer(session.timer_id);

            let name = session.head.function_name.clone();
            let elapsed_ms = session.elapsed_ms();
            let mut ret = status;
            let mut result = SUCCESS;
            if status == SUCCESS {
                session.head.message_type = MsgType::Reply;
                ret = self.send_locked(&mut core, session.handle, &session.head, body);
            } else {
                result = self.response_exception_locked(
                    &mut core,
                    session.handle,
                    status,
                    session.head,
                    body,
                );
            }
            core.task_num -= 1;
            (name, ret, result, elapsed_ms)
        };

        self.emit_request_complete(&name, ret, elapsed_ms);

        if result != SUCCESS || ret != SUCCESS {
            self.record_error(format!("send response failed ({ret}, {result})"));
            return Err(RpcError::SendFailed);
        }
        Ok(())
    }

    /// Advance the timeout scheduler, completing every expired session.
    /// Returns the number of timers fired. The engine does no other
    /// polling; integrators call this periodically from the owning context.
    pub fn update(&self) -> i32 {
        let expired = self.shared.core.lock().timer.take_expired(Instant::now());
        let num = expired.len() as i32;
        for entry in expired {
            let session_id = entry.payload;
            if self.on_timeout(session_id) >= 0 {
                self.shared.core.lock().timer.restart(entry);
            }
        }
        num
    }

    /// Report this instance's live resources: armed-timer count and
    /// live-session count, keyed by an instance-unique tag.
    pub fn resource_used(&self, resource_info: &mut HashMap<String, i64>) {
        let core = self.shared.core.lock();
        let tag = format!("Rpc({:p})", Arc::as_ptr(&self.shared));
        resource_info.insert(format!("{tag}:timer"), core.timer.timer_num() as i64);
        resource_info.insert(format!("{tag}:session"), core.sessions.len() as i64);
    }

    /// Number of server-side requests currently being processed.
    pub fn task_num(&self) -> i64 {
        self.shared.core.lock().task_num
    }

    /// The connection handle of the most recently dispatched request.
    pub fn latest_handle(&self) -> i64 {
        self.shared.core.lock().latest_handle
    }

    /// The most recent error message recorded by this engine.
    pub fn last_error(&self) -> String {
        self.shared.core.lock().last_error.clone()
    }

    /// Route an inbound request to its registered handler.
    ///
    /// Non-oneway requests get a server-side session and a live
    /// [`ReplySink`]; oneway requests are dispatched with an inert sink and
    /// never create a session.
    fn process_request(&self, handle: i64, head: RpcHead, body: &[u8]) -> i32 {
        let handler = self
            .shared
            .core
            .lock()
            .services
            .get(&head.function_name)
            .cloned();
        let Some(handler) = handler else {
            self.record_error(format!(
                "no handler registered for '{}'",
                head.function_name
            ));
            let code = RpcError::UnsupportedFunction.code();
            let name = head.function_name.clone();
            {
                let mut core = self.shared.core.lock();
                self.response_exception_locked(&mut core, handle, code, head, &[]);
            }
            self.emit_request_complete(&name, code, 0);
            return code;
        };

        tracing::debug!(function = %head.function_name, handle, "dispatching request");

        if head.message_type == MsgType::Oneway {
            let name = head.function_name.clone();
            let ret = handler(body, ReplySink::inert(&self.shared));
            self.emit_request_complete(&name, ret, 0);
            return ret;
        }

        let sink = {
            let mut core = self.shared.core.lock();
            let session_id = core.alloc_session_id();
            let timer_id = core.timer.start_timer(
                Duration::from_millis(REQ_PROC_TIMEOUT_MS as u64),
                session_id,
            );
            core.sessions
                .insert(RpcSession::server(session_id, handle, timer_id, head));
            core.task_num += 1;
            ReplySink::new(&self.shared, session_id)
        };
        handler(body, sink)
    }

    /// Complete a client-side session from an inbound reply or exception.
    ///
    /// The session is erased and its timer stopped before the continuation
    /// runs. The continuation's return value replaces the status reported
    /// to metrics and completion events; a returned `MESSAGE_EXPIRED` is
    /// reported to the handle-health sink as `0`.
    fn process_response(&self, head: RpcHead, body: &[u8]) -> i32 {
        let session = {
            let mut core = self.shared.core.lock();
            let Some(session) = core.sessions.remove(head.session_id) else {
                core.record_error(format!(
                    "session {} not found for '{}'",
                    head.session_id, head.function_name
                ));
                return RpcError::SessionNotFound.code();
            };
            core.timer.stop_timer(session.timer_id);
            session
        };

        let mut ret = SUCCESS;
        let mut exception: Option<RpcException> = None;
        if head.message_type == MsgType::Exception {
            match self.shared.codec.exception_decode(body) {
                Ok((exc, _)) => {
                    ret = exc.error_code;
                    exception = Some(exc);
                }
                Err(e) => {
                    self.record_error(format!("exception decode failed: {e}"));
                    ret = RpcError::RecvExceptionMsg.code();
                    exception = Some(RpcException::default());
                }
            }
        }
        let payload: &[u8] = match &exception {
            Some(exc) => &exc.message,
            None => body,
        };

        let RpcSession {
            handle,
            head: request_head,
            on_response,
            start_time,
            ..
        } = session;
        if let Some(on_response) = on_response {
            ret = on_response(ret, payload);
        }

        let elapsed_ms = start_time.elapsed().as_millis() as i64;
        let charged = if ret == RpcError::MessageExpired.code() {
            0
        } else {
            ret
        };
        self.shared
            .transport
            .report_handle_result(handle, charged, elapsed_ms);
        self.emit_response_complete(&request_head.function_name, ret, elapsed_ms);
        ret
    }

    /// Expire one session. Driven by [`update`](Self::update); always
    /// answers [`BE_REMOVED`] for a live session so the timer stays gone.
    fn on_timeout(&self, session_id: u64) -> i32 {
        let session = {
            let mut core = self.shared.core.lock();
            let Some(session) = core.sessions.remove(session_id) else {
                core.record_error(format!("session {session_id} not found"));
                return RpcError::SessionNotFound.code();
            };
            if session.server_side {
                core.task_num -= 1;
            }
            session
        };

        let RpcSession {
            handle,
            head,
            server_side,
            on_response,
            start_time,
            ..
        } = session;
        let elapsed_ms = start_time.elapsed().as_millis() as i64;
        tracing::debug!(session_id, server_side, function = %head.function_name, "session timed out");

        if let Some(on_response) = on_response {
            on_response(RpcError::RequestTimeout.code(), &[]);
            self.shared
                .transport
                .report_handle_result(handle, RpcError::RequestTimeout.code(), 0);
        }

        if server_side {
            self.emit_request_complete(
                &head.function_name,
                RpcError::ProcessTimeout.code(),
                elapsed_ms,
            );
        } else {
            self.emit_response_complete(
                &head.function_name,
                RpcError::RequestTimeout.code(),
                elapsed_ms,
            );
        }
        BE_REMOVED
    }

    /// Encode `head` into the scratch buffer and hand `[head, body]` to the
    /// transport as one two-fragment message.
    fn send_locked(&self, core: &mut Core, handle: i64, head: &RpcHead, body: &[u8]) -> i32 {
        core.head_buf.clear();
        if let Err(e) = self.shared.codec.head_encode(head, &mut core.head_buf) {
            core.record_error(format!("head encode failed: {e}"));
            return RpcError::EncodeFailed.code();
        }
        self.shared
            .transport
            .sendv(handle, &[&core.head_buf, body])
    }

    /// Send an exception reply: clone-mutate the head to `Exception` and
    /// carry `(error_code, body)` as the encoded exception.
    fn response_exception_locked(
        &self,
        core: &mut Core,
        handle: i64,
        error_code: i32,
        mut head: RpcHead,
        body: &[u8],
    ) -> i32 {
        head.message_type = MsgType::Exception;
        let exception = RpcException {
            error_code,
            message: body.to_vec(),
        };
        core.exception_buf.clear();
        if let Err(e) = self.shared.codec.exception_encode(&exception, &mut core.exception_buf) {
            // Demoted to a zero-length exception body; the error code in
            // the head still reaches the peer.
            core.record_error(format!("exception encode failed: {e}"));
            core.exception_buf.clear();
        }
        let payload = std::mem::take(&mut core.exception_buf);
        let ret = self.send_locked(core, handle, &head, &payload);
        core.exception_buf = payload;
        ret
    }

    fn emit_request_complete(&self, name: &str, result: i32, elapsed_ms: i64) {
        let handler = self.shared.core.lock().event_handler.clone();
        if let Some(handler) = handler {
            handler.on_request_proc_complete(name, result, elapsed_ms);
        }
    }

    fn emit_response_complete(&self, name: &str, result: i32, elapsed_ms: i64) {
        let handler = self.shared.core.lock().event_handler.clone();
        if let Some(handler) = handler {
            handler.on_response_proc_complete(name, result, elapsed_ms);
        }
    }

    fn record_error(&self, message: String) {
        self.shared.core.lock().record_error(message);
    }
}

/// Move-only completion handle for one server-side request.
///
/// Handed to the request handler; consuming it with
/// [`reply`](Self::reply) routes through
/// [`Rpc::send_response`] for the session it owns. Move semantics make a
/// second invocation impossible. The sink may outlive the handler's return
/// and holds only a weak reference to the engine, so it never keeps a torn
/// down engine alive.
pub struct ReplySink {
    engine: Weak<Shared>,
    session_id: u64,
}

impl ReplySink {
    fn new(shared: &Arc<Shared>, session_id: u64) -> Self {
        ReplySink {
            engine: Arc::downgrade(shared),
            session_id,
        }
    }

    /// Sink for oneway dispatch: owns session id 0, which is never
    /// allocated, so a stray invocation reports `SESSION_NOT_FOUND`.
    fn inert(shared: &Arc<Shared>) -> Self {
        ReplySink::new(shared, 0)
    }

    /// The server-side session this sink completes.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Complete the request: `status == 0` sends a reply carrying `body`,
    /// anything else an exception with `body` as its message.
    pub fn reply(self, status: i32, body: &[u8]) -> Result<()> {
        let Some(shared) = self.engine.upgrade() else {
            return Err(RpcError::SystemError);
        };
        Rpc { shared }.send_response(self.session_id, status, body)
    }
}
