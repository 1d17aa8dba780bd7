//! # rpckit — transport-independent RPC runtime
//!
//! A bidirectional message-dispatch engine that multiplexes
//! request/response and one-way invocations over opaque connection handles.
//! The engine owns session correlation, deterministic timeouts, service
//! dispatch, and an in-band exception channel; bytes-on-wire transport and
//! head layout are pluggable collaborators supplied by the application.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Application (handlers, continuations)       │
//! ├─────────────────────────────────────────────┤
//! │  Rpc           — engine state machine        │
//! │  SessionTable  — outstanding-call records    │
//! │  SequenceTimer — deterministic timeouts      │
//! ├─────────────────────────────────────────────┤
//! │  HeadCodec     — pluggable head/exception    │
//! │  Transport     — pluggable byte sink         │
//! ├─────────────────────────────────────────────┤
//! │  naming        — canonical service names,    │
//! │                  resolver backend registry   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! One engine instance belongs to one execution context: every operation
//! runs to completion before returning, timer callbacks fire only from
//! [`Rpc::update`], and races between a reply and its timeout are resolved
//! by sequential dispatch. Multiple engines may run on different contexts.
//!
//! ## Quick start
//!
//! Wire an engine with your codec and transport, register services, pump
//! `on_message`/`update` from your event loop (the `rpckit-demo` binary in
//! this workspace shows a complete loopback setup):
//!
//! ```
//! use rpckit::naming::{format_name_str, make_name, make_tbuspp_url};
//!
//! let name = make_name(100, "area", "login");
//! assert_eq!(name, "/100/area/login");
//! assert_eq!(make_tbuspp_url(&name, 3), "tbuspp://100.area.login/3");
//! assert_eq!(format_name_str("100.area.login").as_deref(), Some(name.as_str()));
//! ```
//!
//! ## Crate layout
//!
//! - [`engine`] — the [`Rpc`] state machine, [`ReplySink`], completion
//!   events.
//! - [`session`] — per-call records and the session table.
//! - [`timer`] — deadline-ordered timer store driving expiry.
//! - [`protocol`] — head/exception model and the [`HeadCodec`] seam.
//! - [`transport`] — the [`Transport`] seam and handle-health metrics sink.
//! - [`naming`] — canonical names plus the process-wide resolver-backend
//!   registry.
//! - [`error`] — stable integer error catalogs and [`error_string`].

pub mod engine;
pub mod error;
pub mod naming;
pub mod protocol;
pub mod session;
pub mod timer;
pub mod transport;

pub use engine::{
    DEFAULT_REQUEST_TIMEOUT_MS, REQ_PROC_TIMEOUT_MS, ReplySink, RequestHandler, Rpc,
    RpcEventHandler,
};
pub use error::{NamingError, Result, RpcError, SUCCESS, SYSTEM_OVERLOAD_BASE, error_string};
pub use protocol::{CodecError, HeadCodec, MsgType, RpcException, RpcHead};
pub use session::{ResponseCallback, RpcSession};
pub use timer::{BE_REMOVED, SequenceTimer};
pub use transport::Transport;
