//! Message model and codec seam.
//!
//! Every message on a connection is a head followed by a body:
//!
//! ```text
//! +----------------+----------------------+
//! |  encoded head  |        body          |
//! +----------------+----------------------+
//! ```
//!
//! The head ([`RpcHead`]) carries the message type, the session id that
//! correlates a reply with its call, and the function name being invoked.
//! For [`Exception`](MsgType::Exception) messages the body is an encoded
//! [`RpcException`] instead of application payload.
//!
//! The byte layout of both structures is owned by a pluggable
//! [`HeadCodec`]; the engine only sees decoded values. Codec-internal head
//! fields are echoed back verbatim when a request head is reused to form a
//! reply or exception.

pub mod codec;
pub mod head;

pub use codec::{CodecError, HeadCodec};
pub use head::{MsgType, RpcException, RpcHead};
