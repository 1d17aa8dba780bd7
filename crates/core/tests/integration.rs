//! End-to-end engine tests over a capture transport and a fixture codec.
//!
//! The fixture codec uses a simple big-endian layout (type, version,
//! session id, name length, name; exceptions are code + message). The
//! capture transport records outbound messages and handle-health reports;
//! the queue transport feeds two engines back to back for full round trips.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::thread::sleep;
use std::time::Duration;

use parking_lot::Mutex;

use rpckit::{
    CodecError, HeadCodec, MsgType, REQ_PROC_TIMEOUT_MS, ReplySink, ResponseCallback, Rpc,
    RpcError, RpcEventHandler, RpcException, RpcHead, SYSTEM_OVERLOAD_BASE, Transport,
};

const HEAD_FIXED: usize = 1 + 4 + 8 + 2;

struct TestCodec {
    fail_exception_encode: AtomicBool,
}

impl TestCodec {
    fn new() -> Self {
        TestCodec {
            fail_exception_encode: AtomicBool::new(false),
        }
    }
}

impl HeadCodec for TestCodec {
    fn head_encode(&self, head: &RpcHead, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        buf.push(head.message_type as u8);
        buf.extend_from_slice(&head.version.to_be_bytes());
        buf.extend_from_slice(&head.session_id.to_be_bytes());
        let name = head.function_name.as_bytes();
        buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
        buf.extend_from_slice(name);
        Ok(())
    }

    fn head_decode(&self, buf: &[u8]) -> Result<(RpcHead, usize), CodecError> {
        if buf.len() < HEAD_FIXED {
            return Err(CodecError::Truncated);
        }
        let message_type = MsgType::from_i32(buf[0] as i32)
            .map_err(|_| CodecError::Invalid("message type"))?;
        let version = u32::from_be_bytes(buf[1..5].try_into().unwrap());
        let session_id = u64::from_be_bytes(buf[5..13].try_into().unwrap());
        let name_len = u16::from_be_bytes(buf[13..15].try_into().unwrap()) as usize;
        if buf.len() < HEAD_FIXED + name_len {
            return Err(CodecError::Truncated);
        }
        let function_name = String::from_utf8(buf[HEAD_FIXED..HEAD_FIXED + name_len].to_vec())
            .map_err(|_| CodecError::Invalid("function name"))?;
        Ok((
            RpcHead {
                message_type,
                session_id,
                function_name,
                version,
            },
            HEAD_FIXED + name_len,
        ))
    }

    fn exception_encode(
        &self,
        exception: &RpcException,
        buf: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        if self.fail_exception_encode.load(Ordering::SeqCst) {
            return Err(CodecError::Other("forced encode failure".to_string()));
        }
        buf.extend_from_slice(&exception.error_code.to_be_bytes());
        buf.extend_from_slice(&exception.message);
        Ok(())
    }

    fn exception_decode(&self, buf: &[u8]) -> Result<(RpcException, usize), CodecError> {
        if buf.len() < 4 {
            return Err(CodecError::Truncated);
        }
        let error_code = i32::from_be_bytes(buf[..4].try_into().unwrap());
        Ok((
            RpcException {
                error_code,
                message: buf[4..].to_vec(),
            },
            buf.len(),
        ))
    }
}

/// Records every outbound message and handle-health report.
struct CaptureTransport {
    sent: Mutex<Vec<(i64, Vec<u8>)>>,
    broadcasts: Mutex<Vec<(String, Vec<u8>)>>,
    reports: Mutex<Vec<(i64, i32, i64)>>,
    send_status: AtomicI32,
}

impl CaptureTransport {
    fn new() -> Self {
        CaptureTransport {
            sent: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
            reports: Mutex::new(Vec::new()),
            send_status: AtomicI32::new(0),
        }
    }
}

impl Transport for CaptureTransport {
    fn sendv(&self, handle: i64, frags: &[&[u8]]) -> i32 {
        let status = self.send_status.load(Ordering::SeqCst);
        if status != 0 {
            return status;
        }
        let mut bytes = Vec::new();
        for frag in frags {
            bytes.extend_from_slice(frag);
        }
        self.sent.lock().push((handle, bytes));
        0
    }

    fn broadcastv(&self, name: &str, frags: &[&[u8]]) -> i32 {
        let mut bytes = Vec::new();
        for frag in frags {
            bytes.extend_from_slice(frag);
        }
        self.broadcasts.lock().push((name.to_string(), bytes));
        1
    }

    fn report_handle_result(&self, handle: i64, result: i32, elapsed_ms: i64) {
        self.reports.lock().push((handle, result, elapsed_ms));
    }
}

type MessageQueue = Arc<Mutex<VecDeque<(i64, Vec<u8>)>>>;

/// Queues outbound messages for a peer engine to consume via [`deliver`].
struct QueueTransport {
    queue: MessageQueue,
}

impl Transport for QueueTransport {
    fn sendv(&self, handle: i64, frags: &[&[u8]]) -> i32 {
        let mut bytes = Vec::new();
        for frag in frags {
            bytes.extend_from_slice(frag);
        }
        self.queue.lock().push_back((handle, bytes));
        0
    }
}

fn deliver(queue: &MessageQueue, target: &Rpc) -> usize {
    let mut delivered = 0;
    loop {
        let msg = queue.lock().pop_front();
        let Some((handle, bytes)) = msg else {
            break;
        };
        let _ = target.on_message(handle, &bytes, 0);
        delivered += 1;
    }
    delivered
}

#[derive(Default)]
struct Events {
    records: Mutex<Vec<(&'static str, String, i32, i64)>>,
}

impl Events {
    fn find(&self, kind: &str, name: &str) -> Option<(i32, i64)> {
        self.records
            .lock()
            .iter()
            .find(|(k, n, _, _)| *k == kind && n == name)
            .map(|(_, _, result, elapsed)| (*result, *elapsed))
    }
}

impl RpcEventHandler for Events {
    fn on_request_proc_complete(&self, name: &str, result: i32, elapsed_ms: i64) {
        self.records
            .lock()
            .push(("request", name.to_string(), result, elapsed_ms));
    }

    fn on_response_proc_complete(&self, name: &str, result: i32, elapsed_ms: i64) {
        self.records
            .lock()
            .push(("response", name.to_string(), result, elapsed_ms));
    }
}

fn rig() -> (Rpc, Arc<TestCodec>, Arc<CaptureTransport>, Arc<Events>) {
    let codec = Arc::new(TestCodec::new());
    let transport = Arc::new(CaptureTransport::new());
    let events = Arc::new(Events::default());
    let rpc = Rpc::new(codec.clone(), transport.clone());
    rpc.set_event_handler(events.clone());
    (rpc, codec, transport, events)
}

fn encode_message(codec: &TestCodec, head: &RpcHead, body: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    codec.head_encode(head, &mut bytes).unwrap();
    bytes.extend_from_slice(body);
    bytes
}

fn recording(log: Arc<Mutex<Vec<(i32, Vec<u8>)>>>) -> ResponseCallback {
    Box::new(move |status, payload| {
        log.lock().push((status, payload.to_vec()));
        status
    })
}

fn live_count(rpc: &Rpc, suffix: &str) -> i64 {
    let mut usage = HashMap::new();
    rpc.resource_used(&mut usage);
    usage
        .iter()
        .find_map(|(key, value)| key.ends_with(suffix).then_some(*value))
        .unwrap()
}

#[test]
fn round_trip_success() {
    let (rpc, codec, transport, events) = rig();
    let log = Arc::new(Mutex::new(Vec::new()));

    rpc.send_request(7, RpcHead::request(1, "echo"), b"hi", Some(recording(log.clone())), 0)
        .unwrap();

    {
        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        let (handle, bytes) = &sent[0];
        assert_eq!(*handle, 7);
        let (head, consumed) = codec.head_decode(bytes).unwrap();
        assert_eq!(head.message_type, MsgType::Call);
        assert_eq!(head.session_id, 1);
        assert_eq!(head.function_name, "echo");
        assert_eq!(&bytes[consumed..], b"hi");
    }
    assert_eq!(live_count(&rpc, ":session"), 1);
    assert_eq!(live_count(&rpc, ":timer"), 1);

    let reply = encode_message(&codec, &RpcHead {
        message_type: MsgType::Reply,
        session_id: 1,
        function_name: "echo".to_string(),
        version: 0,
    }, b"ok");
    rpc.on_message(7, &reply, 0).unwrap();

    assert_eq!(log.lock().as_slice(), &[(0, b"ok".to_vec())]);
    assert_eq!(live_count(&rpc, ":session"), 0);
    assert_eq!(live_count(&rpc, ":timer"), 0);
    assert_eq!(events.find("response", "echo").map(|(r, _)| r), Some(0));
}

#[test]
fn request_timeout_completes_once() {
    let (rpc, _codec, transport, events) = rig();
    let log = Arc::new(Mutex::new(Vec::new()));

    rpc.send_request(7, RpcHead::request(1, "echo"), b"hi", Some(recording(log.clone())), 30)
        .unwrap();

    sleep(Duration::from_millis(80));
    assert_eq!(rpc.update(), 1);

    let timeout = RpcError::RequestTimeout.code();
    assert_eq!(log.lock().as_slice(), &[(timeout, Vec::new())]);
    assert!(transport.reports.lock().contains(&(7, timeout, 0)));
    assert_eq!(events.find("response", "echo").map(|(r, _)| r), Some(timeout));
    assert_eq!(live_count(&rpc, ":session"), 0);
    assert_eq!(live_count(&rpc, ":timer"), 0);

    // Nothing left to fire.
    assert_eq!(rpc.update(), 0);
    assert_eq!(log.lock().len(), 1);
}

#[test]
fn overloaded_call_rejected_before_dispatch() {
    let (rpc, codec, transport, events) = rig();
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = invoked.clone();
    rpc.add_on_request_function(
        "svc",
        Arc::new(move |_body: &[u8], _sink: ReplySink| {
            flag.store(true, Ordering::SeqCst);
            0
        }),
    )
    .unwrap();

    let call = encode_message(&codec, &RpcHead::request(42, "svc"), b"x");
    rpc.on_message(9, &call, 3).unwrap();

    let sent = transport.sent.lock();
    assert_eq!(sent.len(), 1);
    let (head, consumed) = codec.head_decode(&sent[0].1).unwrap();
    assert_eq!(head.message_type, MsgType::Exception);
    assert_eq!(head.session_id, 42);
    let (exception, _) = codec.exception_decode(&sent[0].1[consumed..]).unwrap();
    assert_eq!(exception.error_code, SYSTEM_OVERLOAD_BASE - 3);

    assert!(!invoked.load(Ordering::SeqCst));
    assert_eq!(live_count(&rpc, ":session"), 0);
    assert_eq!(
        events.find("request", "svc"),
        Some((SYSTEM_OVERLOAD_BASE - 3, 0))
    );
}

#[test]
fn unsupported_function_gets_exception_reply() {
    let (rpc, codec, transport, events) = rig();

    let call = encode_message(&codec, &RpcHead::request(5, "miss"), b"payload");
    assert_eq!(
        rpc.on_message(3, &call, 0),
        Err(RpcError::UnsupportedFunction)
    );

    let sent = transport.sent.lock();
    assert_eq!(sent.len(), 1);
    let (head, consumed) = codec.head_decode(&sent[0].1).unwrap();
    assert_eq!(head.message_type, MsgType::Exception);
    let (exception, _) = codec.exception_decode(&sent[0].1[consumed..]).unwrap();
    assert_eq!(exception.error_code, RpcError::UnsupportedFunction.code());

    assert_eq!(
        events.find("request", "miss"),
        Some((RpcError::UnsupportedFunction.code(), 0))
    );
}

#[test]
fn application_error_round_trip() {
    let codec = Arc::new(TestCodec::new());
    let to_server: MessageQueue = Arc::new(Mutex::new(VecDeque::new()));
    let to_client: MessageQueue = Arc::new(Mutex::new(VecDeque::new()));

    let client = Rpc::new(
        codec.clone(),
        Arc::new(QueueTransport {
            queue: to_server.clone(),
        }),
    );
    let server = Rpc::new(
        codec.clone(),
        Arc::new(QueueTransport {
            queue: to_client.clone(),
        }),
    );

    let sink_result = Arc::new(Mutex::new(None));
    let sink_result_in = sink_result.clone();
    server
        .add_on_request_function(
            "div",
            Arc::new(move |_body: &[u8], sink: ReplySink| {
                sink_result_in.lock().replace(sink.reply(-17, b"divzero"));
                0
            }),
        )
        .unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    let session_id = client.gen_session_id();
    client
        .send_request(
            5,
            RpcHead::request(session_id, "div"),
            b"1 0",
            Some(recording(log.clone())),
            0,
        )
        .unwrap();

    assert_eq!(deliver(&to_server, &server), 1);
    // An error reply is transmitted, but the server-side status is the
    // application's failure.
    assert_eq!(*sink_result.lock(), Some(Err(RpcError::SendFailed)));
    assert_eq!(server.task_num(), 0);

    assert_eq!(deliver(&to_client, &client), 1);
    assert_eq!(log.lock().as_slice(), &[(-17, b"divzero".to_vec())]);
    assert_eq!(live_count(&client, ":session"), 0);
}

#[test]
fn oneway_dispatch_creates_no_session() {
    let (rpc, codec, _transport, events) = rig();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let stash = Arc::new(Mutex::new(None));

    let seen_in = seen.clone();
    let stash_in = stash.clone();
    rpc.add_on_request_function(
        "notify",
        Arc::new(move |body: &[u8], sink: ReplySink| {
            seen_in.lock().push(body.to_vec());
            stash_in.lock().replace(sink);
            0
        }),
    )
    .unwrap();

    let msg = encode_message(&codec, &RpcHead::oneway("notify"), b"ping");
    rpc.on_message(2, &msg, 0).unwrap();

    assert_eq!(seen.lock().as_slice(), &[b"ping".to_vec()]);
    assert_eq!(live_count(&rpc, ":session"), 0);
    assert_eq!(rpc.task_num(), 0);
    assert_eq!(events.find("request", "notify"), Some((0, 0)));

    // The inert sink is valid to call but owns no session.
    let sink = stash.lock().take().unwrap();
    assert_eq!(sink.reply(0, b""), Err(RpcError::SessionNotFound));
}

#[test]
fn request_without_continuation_is_fire_and_forget() {
    let (rpc, _codec, transport, events) = rig();

    rpc.send_request(7, RpcHead::request(1, "log"), b"line", None, 0)
        .unwrap();

    assert_eq!(transport.sent.lock().len(), 1);
    assert_eq!(live_count(&rpc, ":session"), 0);
    assert_eq!(live_count(&rpc, ":timer"), 0);
    assert_eq!(events.find("response", "log"), Some((0, 0)));
}

#[test]
fn send_failure_completes_with_send_failed() {
    let (rpc, _codec, transport, events) = rig();
    transport.send_status.store(-8, Ordering::SeqCst);

    let log = Arc::new(Mutex::new(Vec::new()));
    let result = rpc.send_request(
        7,
        RpcHead::request(1, "echo"),
        b"hi",
        Some(recording(log.clone())),
        0,
    );

    assert_eq!(result, Err(RpcError::SendFailed));
    assert!(log.lock().is_empty());
    assert_eq!(live_count(&rpc, ":session"), 0);
    assert_eq!(
        events.find("response", "echo"),
        Some((RpcError::SendFailed.code(), 0))
    );
    assert!(rpc.last_error().contains("send request"));
}

#[test]
fn continuation_status_override_and_expired_exemption() {
    let (rpc, codec, transport, events) = rig();

    let expired = RpcError::MessageExpired.code();
    rpc.send_request(
        7,
        RpcHead::request(1, "echo"),
        b"hi",
        Some(Box::new(move |_status, _payload| expired)),
        0,
    )
    .unwrap();

    let reply = encode_message(&codec, &RpcHead {
        message_type: MsgType::Reply,
        session_id: 1,
        function_name: "echo".to_string(),
        version: 0,
    }, b"ok");
    assert_eq!(rpc.on_message(7, &reply, 0), Err(RpcError::MessageExpired));

    // Message-expired is not charged against handle health.
    let reports = transport.reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!((reports[0].0, reports[0].1), (7, 0));
    assert_eq!(events.find("response", "echo").map(|(r, _)| r), Some(expired));
}

#[test]
fn exception_encode_failure_demoted_to_empty_body() {
    let (rpc, codec, transport, _events) = rig();
    codec.fail_exception_encode.store(true, Ordering::SeqCst);

    let call = encode_message(&codec, &RpcHead::request(5, "miss"), b"");
    assert_eq!(
        rpc.on_message(3, &call, 0),
        Err(RpcError::UnsupportedFunction)
    );

    // The exception still goes out, with a zero-length body.
    let sent = transport.sent.lock();
    assert_eq!(sent.len(), 1);
    let (head, consumed) = codec.head_decode(&sent[0].1).unwrap();
    assert_eq!(head.message_type, MsgType::Exception);
    assert!(sent[0].1[consumed..].is_empty());
}

#[test]
fn duplicate_registration_keeps_original_handler() {
    let (rpc, codec, _transport, _events) = rig();
    let first_called = Arc::new(AtomicBool::new(false));
    let second_called = Arc::new(AtomicBool::new(false));

    let flag = first_called.clone();
    rpc.add_on_request_function(
        "f",
        Arc::new(move |_body: &[u8], sink: ReplySink| {
            flag.store(true, Ordering::SeqCst);
            let _ = sink.reply(0, b"");
            0
        }),
    )
    .unwrap();

    let flag = second_called.clone();
    assert_eq!(
        rpc.add_on_request_function(
            "f",
            Arc::new(move |_body: &[u8], _sink: ReplySink| {
                flag.store(true, Ordering::SeqCst);
                0
            }),
        ),
        Err(RpcError::FunctionNameExisted)
    );

    let call = encode_message(&codec, &RpcHead::request(1, "f"), b"");
    rpc.on_message(1, &call, 0).unwrap();
    assert!(first_called.load(Ordering::SeqCst));
    assert!(!second_called.load(Ordering::SeqCst));

    assert_eq!(
        rpc.add_on_request_function("", Arc::new(|_: &[u8], _: ReplySink| 0)),
        Err(RpcError::InvalidParam)
    );
}

#[test]
fn remove_registration() {
    let (rpc, _codec, _transport, _events) = rig();
    rpc.add_on_request_function("f", Arc::new(|_: &[u8], _: ReplySink| 0))
        .unwrap();
    rpc.remove_on_request_function("f").unwrap();
    assert_eq!(
        rpc.remove_on_request_function("f"),
        Err(RpcError::FunctionNameUnexisted)
    );
}

#[test]
fn reply_sink_outlives_handler_return() {
    let (rpc, codec, transport, events) = rig();
    let stash: Arc<Mutex<Option<ReplySink>>> = Arc::new(Mutex::new(None));

    let stash_in = stash.clone();
    rpc.add_on_request_function(
        "slow",
        Arc::new(move |_body: &[u8], sink: ReplySink| {
            stash_in.lock().replace(sink);
            0
        }),
    )
    .unwrap();

    let call = encode_message(&codec, &RpcHead::request(77, "slow"), b"work");
    rpc.on_message(4, &call, 0).unwrap();

    assert_eq!(rpc.task_num(), 1);
    assert_eq!(live_count(&rpc, ":session"), 1);
    assert!(transport.sent.lock().is_empty());

    let sink = stash.lock().take().unwrap();
    sink.reply(0, b"done").unwrap();

    let sent = transport.sent.lock();
    assert_eq!(sent.len(), 1);
    let (head, consumed) = codec.head_decode(&sent[0].1).unwrap();
    assert_eq!(head.message_type, MsgType::Reply);
    // The reply echoes the caller's session id, not the server-side one.
    assert_eq!(head.session_id, 77);
    assert_eq!(&sent[0].1[consumed..], b"done");

    assert_eq!(rpc.task_num(), 0);
    assert_eq!(live_count(&rpc, ":session"), 0);
    assert_eq!(events.find("request", "slow").map(|(r, _)| r), Some(0));
}

// Slow: waits out the fixed server-side processing window.
#[test]
fn unanswered_request_expires_with_process_timeout() {
    let (rpc, codec, transport, events) = rig();
    let stash: Arc<Mutex<Option<ReplySink>>> = Arc::new(Mutex::new(None));

    let stash_in = stash.clone();
    rpc.add_on_request_function(
        "stuck",
        Arc::new(move |_body: &[u8], sink: ReplySink| {
            stash_in.lock().replace(sink);
            0
        }),
    )
    .unwrap();

    let call = encode_message(&codec, &RpcHead::request(11, "stuck"), b"");
    rpc.on_message(6, &call, 0).unwrap();
    assert_eq!(rpc.task_num(), 1);

    sleep(Duration::from_millis(REQ_PROC_TIMEOUT_MS as u64 + 300));
    assert_eq!(rpc.update(), 1);

    let (result, elapsed) = events.find("request", "stuck").unwrap();
    assert_eq!(result, RpcError::ProcessTimeout.code());
    assert!(elapsed >= REQ_PROC_TIMEOUT_MS as i64);
    assert_eq!(rpc.task_num(), 0);
    assert_eq!(live_count(&rpc, ":session"), 0);
    // Server-side expiry has no continuation and reports nothing.
    assert!(transport.reports.lock().is_empty());

    // The retained sink's session is gone.
    let sink = stash.lock().take().unwrap();
    assert_eq!(sink.reply(0, b"late"), Err(RpcError::SessionNotFound));
}

#[test]
fn handlers_observe_latest_handle() {
    let (rpc, codec, _transport, _events) = rig();
    let seen = Arc::new(Mutex::new(None));

    let seen_in = seen.clone();
    let engine = rpc.clone();
    rpc.add_on_request_function(
        "who",
        Arc::new(move |_body: &[u8], sink: ReplySink| {
            seen_in.lock().replace(engine.latest_handle());
            let _ = sink.reply(0, b"");
            0
        }),
    )
    .unwrap();

    let call = encode_message(&codec, &RpcHead::request(1, "who"), b"");
    rpc.on_message(7, &call, 0).unwrap();
    assert_eq!(*seen.lock(), Some(7));
}

#[test]
fn broadcast_request_is_fire_and_forget() {
    let (rpc, codec, transport, _events) = rig();

    rpc.broadcast_request("/100/area/login", &RpcHead::oneway("tick"), b"now")
        .unwrap();

    let broadcasts = transport.broadcasts.lock();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].0, "/100/area/login");
    let (head, consumed) = codec.head_decode(&broadcasts[0].1).unwrap();
    assert_eq!(head.function_name, "tick");
    assert_eq!(&broadcasts[0].1[consumed..], b"now");
    assert_eq!(live_count(&rpc, ":session"), 0);
}

#[test]
fn broadcast_fails_on_transport_without_broadcast() {
    struct SendOnly;
    impl Transport for SendOnly {
        fn sendv(&self, _handle: i64, _frags: &[&[u8]]) -> i32 {
            0
        }
    }

    let rpc = Rpc::new(Arc::new(TestCodec::new()), Arc::new(SendOnly));
    assert_eq!(
        rpc.broadcast_request("/svc", &RpcHead::oneway("tick"), b""),
        Err(RpcError::BroadcastFailed)
    );
}

#[test]
fn malformed_input_is_rejected() {
    let (rpc, _codec, transport, _events) = rig();

    assert_eq!(rpc.on_message(1, &[], 0), Err(RpcError::InvalidParam));
    assert_eq!(rpc.on_message(1, &[1, 2, 3], 0), Err(RpcError::DecodeFailed));
    assert!(rpc.last_error().contains("head decode failed"));
    assert!(transport.sent.lock().is_empty());
}

#[test]
fn reply_for_unknown_session_is_dropped() {
    let (rpc, codec, transport, _events) = rig();

    let reply = encode_message(&codec, &RpcHead {
        message_type: MsgType::Reply,
        session_id: 999,
        function_name: "ghost".to_string(),
        version: 0,
    }, b"late");
    assert_eq!(rpc.on_message(1, &reply, 0), Err(RpcError::SessionNotFound));
    assert!(transport.reports.lock().is_empty());
}

#[test]
fn resource_usage_keys_identify_the_instance() {
    let (rpc, _codec, _transport, _events) = rig();
    let other = Rpc::new(Arc::new(TestCodec::new()), Arc::new(CaptureTransport::new()));

    let mut usage = HashMap::new();
    rpc.resource_used(&mut usage);
    other.resource_used(&mut usage);

    // Two engines, two key pairs.
    assert_eq!(usage.len(), 4);
    assert!(usage.keys().all(|k| k.starts_with("Rpc(")));
}
