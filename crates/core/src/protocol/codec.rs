use super::{RpcException, RpcHead};

/// Why a codec rejected a buffer.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The buffer ended before the structure was complete.
    #[error("truncated buffer")]
    Truncated,

    /// A field held a value the codec cannot represent.
    #[error("invalid {0}")]
    Invalid(&'static str),

    /// Codec-specific failure outside the common kinds.
    #[error("{0}")]
    Other(String),
}

/// The pluggable head/exception codec the engine encodes and decodes with.
///
/// The engine never looks at wire bytes itself; the on-wire layout belongs
/// entirely to the codec. Encoders append to the provided buffer (the engine
/// clears its scratch buffer before each call); decoders return the decoded
/// value together with the number of bytes consumed, and the engine treats a
/// consumed count larger than the buffer as a decode failure.
pub trait HeadCodec: Send + Sync {
    /// Append the encoded head to `buf`.
    fn head_encode(&self, head: &RpcHead, buf: &mut Vec<u8>) -> Result<(), CodecError>;

    /// Decode a head from the front of `buf`, returning it with the number
    /// of bytes consumed. The remainder of the buffer is the message body.
    fn head_decode(&self, buf: &[u8]) -> Result<(RpcHead, usize), CodecError>;

    /// Append the encoded exception to `buf`.
    fn exception_encode(
        &self,
        exception: &RpcException,
        buf: &mut Vec<u8>,
    ) -> Result<(), CodecError>;

    /// Decode an exception from the front of `buf`, returning it with the
    /// number of bytes consumed.
    fn exception_decode(&self, buf: &[u8]) -> Result<(RpcException, usize), CodecError>;
}
