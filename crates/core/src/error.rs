//! Error catalogs for the RPC runtime.
//!
//! Two catalogs with stable integer codes:
//!
//! - [`RpcError`] — engine kinds, plus the contiguous overload range anchored
//!   at [`SYSTEM_OVERLOAD_BASE`] and a passthrough for application-defined
//!   codes carried inside exception messages.
//! - [`NamingError`] — naming-subsystem kinds, in their own code range.
//!
//! Codes cross the wire (an exception reply carries its `error_code` to the
//! peer), so every kind maps to and from an `i32` via `code()` /
//! `from_code()`. [`error_string`] resolves any code to its human string.

/// Status code meaning "no error". Engine operations report it as `Ok(())`;
/// it appears as a plain integer at the handler/continuation seams.
pub const SUCCESS: i32 = 0;

/// Anchor of the overload code range. A transport overload hint `h > 0`
/// maps to code `SYSTEM_OVERLOAD_BASE - h`.
pub const SYSTEM_OVERLOAD_BASE: i32 = -1000;

const OVERLOAD_RANGE_END: i32 = -2000;
const NAMING_BASE: i32 = -2000;

/// Errors produced by the RPC engine.
///
/// Every variant has a stable integer code (see [`RpcError::code`]).
/// [`Overload`](Self::Overload) covers overload sub-reasons beyond the two
/// named members of the range; [`App`](Self::App) carries an
/// application-defined code received via the exception channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    /// A required argument was missing or malformed.
    #[error("invalid parameter")]
    InvalidParam,

    /// The codec rejected a head or exception during encoding.
    #[error("encode failed")]
    EncodeFailed,

    /// The codec rejected an inbound buffer, or the decoded head length
    /// exceeded the buffer length.
    #[error("decode failed")]
    DecodeFailed,

    /// An exception message arrived but its body could not be decoded.
    #[error("received an undecodable exception message")]
    RecvExceptionMsg,

    /// Inbound message type outside the known set.
    #[error("unknown message type")]
    UnknownType,

    /// No handler is registered for the requested function name.
    #[error("unsupported function name")]
    UnsupportedFunction,

    /// No live session matches the given session id (it may have expired).
    #[error("session is expired")]
    SessionNotFound,

    /// The transport refused an outbound message.
    #[error("send failed")]
    SendFailed,

    /// A client-side call saw no reply before its timer fired.
    #[error("request timeout")]
    RequestTimeout,

    /// [`add_on_request_function`](crate::Rpc::add_on_request_function) was
    /// called with a name that is already registered.
    #[error("function name is already registered")]
    FunctionNameExisted,

    /// Internal inconsistency, e.g. a reply sink outliving its engine.
    #[error("system error")]
    SystemError,

    /// A server-side request was not answered within the processing window.
    #[error("process service timeout")]
    ProcessTimeout,

    /// The transport reported a broadcast failure.
    #[error("broadcast request failed")]
    BroadcastFailed,

    /// [`remove_on_request_function`](crate::Rpc::remove_on_request_function)
    /// was called with a name that is not registered.
    #[error("function name is not registered")]
    FunctionNameUnexisted,

    /// Overload sub-reason 1: the message sat in a queue past its deadline.
    /// The only code never charged against handle health.
    #[error("system overload: message expired")]
    MessageExpired,

    /// Overload sub-reason 2: too many tasks in flight.
    #[error("system overload: task overload")]
    TaskOverload,

    /// Any other overload sub-reason passed in by the transport.
    #[error("system overload (reason {0})")]
    Overload(i32),

    /// An application-defined code delivered through the exception channel.
    #[error("application error ({0})")]
    App(i32),
}

impl RpcError {
    /// The stable integer code for this kind.
    pub fn code(&self) -> i32 {
        match self {
            RpcError::InvalidParam => -1,
            RpcError::EncodeFailed => -2,
            RpcError::DecodeFailed => -3,
            RpcError::RecvExceptionMsg => -4,
            RpcError::UnknownType => -5,
            RpcError::UnsupportedFunction => -6,
            RpcError::SessionNotFound => -7,
            RpcError::SendFailed => -8,
            RpcError::RequestTimeout => -9,
            RpcError::FunctionNameExisted => -10,
            RpcError::SystemError => -11,
            RpcError::ProcessTimeout => -12,
            RpcError::BroadcastFailed => -13,
            RpcError::FunctionNameUnexisted => -14,
            RpcError::MessageExpired => SYSTEM_OVERLOAD_BASE - 1,
            RpcError::TaskOverload => SYSTEM_OVERLOAD_BASE - 2,
            RpcError::Overload(hint) => SYSTEM_OVERLOAD_BASE - hint,
            RpcError::App(code) => *code,
        }
    }

    /// Map an integer code back to its kind.
    ///
    /// Codes inside the overload range resolve to the named members where
    /// one exists, otherwise to [`Overload`](Self::Overload). Codes outside
    /// every catalog are preserved as [`App`](Self::App).
    pub fn from_code(code: i32) -> RpcError {
        match code {
            -1 => RpcError::InvalidParam,
            -2 => RpcError::EncodeFailed,
            -3 => RpcError::DecodeFailed,
            -4 => RpcError::RecvExceptionMsg,
            -5 => RpcError::UnknownType,
            -6 => RpcError::UnsupportedFunction,
            -7 => RpcError::SessionNotFound,
            -8 => RpcError::SendFailed,
            -9 => RpcError::RequestTimeout,
            -10 => RpcError::FunctionNameExisted,
            -11 => RpcError::SystemError,
            -12 => RpcError::ProcessTimeout,
            -13 => RpcError::BroadcastFailed,
            -14 => RpcError::FunctionNameUnexisted,
            c if c < SYSTEM_OVERLOAD_BASE && c > OVERLOAD_RANGE_END => {
                match SYSTEM_OVERLOAD_BASE - c {
                    1 => RpcError::MessageExpired,
                    2 => RpcError::TaskOverload,
                    hint => RpcError::Overload(hint),
                }
            }
            c => RpcError::App(c),
        }
    }

    /// Convert an integer status into a `Result`, mapping [`SUCCESS`] to
    /// `Ok(())`.
    pub fn check(status: i32) -> Result<()> {
        if status == SUCCESS {
            Ok(())
        } else {
            Err(RpcError::from_code(status))
        }
    }
}

/// Errors produced by the naming subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NamingError {
    /// A required argument was missing or malformed.
    #[error("invalid parameter")]
    InvalidParam,

    /// The url is already bound to the name.
    #[error("url already registered")]
    UrlRegistered,

    /// The name has no bound url.
    #[error("url not binded")]
    UrlNotBinded,

    /// The backend refused the registration.
    #[error("register failed")]
    RegisterFailed,

    /// The factory registry has been torn down.
    #[error("naming factory map is null")]
    FactoryMapNull,

    /// A factory is already bound to the backend-type tag.
    #[error("naming factory is existed")]
    FactoryExisted,
}

impl NamingError {
    /// The stable integer code for this kind.
    pub fn code(&self) -> i32 {
        NAMING_BASE
            - match self {
                NamingError::InvalidParam => 1,
                NamingError::UrlRegistered => 2,
                NamingError::UrlNotBinded => 3,
                NamingError::RegisterFailed => 4,
                NamingError::FactoryMapNull => 5,
                NamingError::FactoryExisted => 6,
            }
    }

    /// Map an integer code back to its kind, if it belongs to this catalog.
    pub fn from_code(code: i32) -> Option<NamingError> {
        match NAMING_BASE - code {
            1 => Some(NamingError::InvalidParam),
            2 => Some(NamingError::UrlRegistered),
            3 => Some(NamingError::UrlNotBinded),
            4 => Some(NamingError::RegisterFailed),
            5 => Some(NamingError::FactoryMapNull),
            6 => Some(NamingError::FactoryExisted),
            _ => None,
        }
    }
}

/// Resolve any status code to its registered human string.
pub fn error_string(code: i32) -> String {
    if code == SUCCESS {
        return "success".to_string();
    }
    if let Some(naming) = NamingError::from_code(code) {
        return naming.to_string();
    }
    RpcError::from_code(code).to_string()
}

/// Convenience alias for `Result<T, RpcError>`.
pub type Result<T> = std::result::Result<T, RpcError>;
