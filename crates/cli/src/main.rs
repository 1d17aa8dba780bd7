//! Loopback demo: two RPC engines wired back to back over in-process
//! message queues, with a small length-prefixed codec.
//!
//! Shows the three ways a call completes: a served reply, an in-band
//! exception for an unregistered function, and a client-side timeout for a
//! request the server never answers.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use clap::Parser;
use rpckit::{
    CodecError, HeadCodec, MsgType, ReplySink, Rpc, RpcException, RpcHead, Transport,
    error_string,
};

#[derive(Parser)]
#[command(
    name = "rpckit-demo",
    about = "Loopback demo for the rpckit RPC runtime"
)]
struct Args {
    /// Number of echo round trips
    #[arg(long, short, default_value_t = 3)]
    requests: u32,

    /// Client-side timeout for the stalled call (ms)
    #[arg(long, default_value_t = 300)]
    timeout_ms: i32,
}

const HEAD_FIXED: usize = 1 + 4 + 8 + 2;

/// Big-endian demo layout: type, version, session id, name length, name.
/// Exceptions are error code followed by the message bytes.
struct DemoCodec;

impl HeadCodec for DemoCodec {
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

type Queue = Arc<Mutex<VecDeque<(i64, Vec<u8>)>>>;

/// Queues outbound messages for the peer engine; [`deliver`] drains them.
struct QueueTransport {
    queue: Queue,
}

impl Transport for QueueTransport {
    fn sendv(&self, handle: i64, frags: &[&[u8]]) -> i32 {
        let mut bytes = Vec::new();
        for frag in frags {
            bytes.extend_from_slice(frag);
        }
        self.queue.lock().unwrap().push_back((handle, bytes));
        0
    }
}

fn deliver(queue: &Queue, target: &Rpc) {
    loop {
        let msg = queue.lock().unwrap().pop_front();
        let Some((handle, bytes)) = msg else {
            break;
        };
        let _ = target.on_message(handle, &bytes, 0);
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let codec = Arc::new(DemoCodec);
    let to_server: Queue = Arc::default();
    let to_client: Queue = Arc::default();
    let client = Rpc::new(
        codec.clone(),
        Arc::new(QueueTransport {
            queue: to_server.clone(),
        }),
    );
    let server = Rpc::new(
        codec,
        Arc::new(QueueTransport {
            queue: to_client.clone(),
        }),
    );

    server
        .add_on_request_function(
            "echo",
            Arc::new(|body: &[u8], sink: ReplySink| {
                let _ = sink.reply(0, body);
                0
            }),
        )
        .expect("register echo");

    let stalled: Arc<Mutex<Option<ReplySink>>> = Arc::new(Mutex::new(None));
    let stalled_in = stalled.clone();
    server
        .add_on_request_function(
            "stall",
            Arc::new(move |_body: &[u8], sink: ReplySink| {
                stalled_in.lock().unwrap().replace(sink);
                0
            }),
        )
        .expect("register stall");

    for i in 0..args.requests {
        let head = RpcHead::request(client.gen_session_id(), "echo");
        let payload = format!("hello {i}");
        client
            .send_request(
                1,
                head,
                payload.as_bytes(),
                Some(Box::new(move |status, body| {
                    println!(
                        "echo #{i}: status={status} body={:?}",
                        String::from_utf8_lossy(body)
                    );
                    status
                })),
                0,
            )
            .expect("send echo");
        deliver(&to_server, &server);
        deliver(&to_client, &client);
    }

    // A call nobody serves comes back as an in-band exception.
    let head = RpcHead::request(client.gen_session_id(), "missing");
    client
        .send_request(
            1,
            head,
            b"",
            Some(Box::new(|status, _body| {
                println!("missing: {}", error_string(status));
                status
            })),
            0,
        )
        .expect("send missing");
    deliver(&to_server, &server);
    deliver(&to_client, &client);

    // A served-but-never-answered call expires on the client timer.
    let head = RpcHead::request(client.gen_session_id(), "stall");
    client
        .send_request(
            1,
            head,
            b"",
            Some(Box::new(|status, _body| {
                println!("stall: {}", error_string(status));
                status
            })),
            args.timeout_ms,
        )
        .expect("send stall");
    deliver(&to_server, &server);
    sleep(Duration::from_millis(args.timeout_ms.max(1) as u64 + 50));
    client.update();

    let mut usage = HashMap::new();
    client.resource_used(&mut usage);
    server.resource_used(&mut usage);
    let mut keys: Vec<_> = usage.iter().collect();
    keys.sort();
    for (key, value) in keys {
        println!("{key} = {value}");
    }
}
