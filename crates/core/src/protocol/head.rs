use crate::error::RpcError;

/// Message type carried in an [`RpcHead`].
///
/// The wire discriminants are stable: codecs use
/// [`from_i32`](Self::from_i32) when decoding and `as i32` when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MsgType {
    /// A request the sender awaits a reply for.
    #[default]
    Call = 0,
    /// A successful reply to an earlier call.
    Reply = 1,
    /// An error reply; the body is an encoded [`RpcException`].
    Exception = 2,
    /// A request the sender does not await. No session is retained.
    Oneway = 3,
}

impl MsgType {
    /// Map a wire discriminant back to a message type.
    ///
    /// Returns [`RpcError::UnknownType`] for values outside the known set,
    /// which codecs surface as a decode failure.
    pub fn from_i32(value: i32) -> Result<MsgType, RpcError> {
        match value {
            0 => Ok(MsgType::Call),
            1 => Ok(MsgType::Reply),
            2 => Ok(MsgType::Exception),
            3 => Ok(MsgType::Oneway),
            _ => Err(RpcError::UnknownType),
        }
    }
}

/// The message head the engine reads and writes.
///
/// The engine interprets `message_type`, `session_id`, and `function_name`.
/// `version` is codec-internal and preserved verbatim when a request head is
/// echoed back as a reply or exception.
#[derive(Debug, Clone, Default)]
pub struct RpcHead {
    pub message_type: MsgType,
    pub session_id: u64,
    pub function_name: String,
    pub version: u32,
}

impl RpcHead {
    /// Head for a request awaiting a reply.
    pub fn request(session_id: u64, function_name: &str) -> Self {
        RpcHead {
            message_type: MsgType::Call,
            session_id,
            function_name: function_name.to_string(),
            version: 0,
        }
    }

    /// Head for a fire-and-forget request.
    pub fn oneway(function_name: &str) -> Self {
        RpcHead {
            message_type: MsgType::Oneway,
            session_id: 0,
            function_name: function_name.to_string(),
            version: 0,
        }
    }
}

/// An error reply, encoded in-band as the body of an
/// [`Exception`](MsgType::Exception) message.
///
/// `error_code` is surfaced to the caller's continuation as its status;
/// `message` becomes the payload the continuation receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcException {
    pub error_code: i32,
    pub message: Vec<u8>,
}
