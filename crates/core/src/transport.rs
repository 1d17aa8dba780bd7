//! Transport seam.
//!
//! The engine never owns sockets; it hands fully encoded messages to a
//! [`Transport`] and receives inbound buffers through
//! [`Rpc::on_message`](crate::Rpc::on_message). Statuses use the engine's
//! integer convention: `0` success, negative failure. The broadcast pair is
//! optional — the defaults report failure, matching engines deployed
//! point-to-point only.

/// Connection-oriented byte sink the engine sends through.
///
/// Implementations may block; the engine treats each call as an atomic
/// step. The scalar forms default to their vectored counterparts.
pub trait Transport: Send + Sync {
    /// Send one buffer on a connection. Returns `0` on success.
    fn send(&self, handle: i64, data: &[u8]) -> i32 {
        self.sendv(handle, &[data])
    }

    /// Send a message as consecutive fragments on a connection.
    /// Fragments must land on the wire as one message, in order.
    /// Returns `0` on success.
    fn sendv(&self, handle: i64, frags: &[&[u8]]) -> i32;

    /// Broadcast one buffer to every instance bound to a service name.
    /// Returns the number of receivers, or negative on failure.
    fn broadcast(&self, name: &str, data: &[u8]) -> i32 {
        self.broadcastv(name, &[data])
    }

    /// Vectored form of [`broadcast`](Self::broadcast).
    fn broadcastv(&self, _name: &str, _frags: &[&[u8]]) -> i32 {
        -1
    }

    /// Metrics sink: the outcome of one handled message on a connection.
    /// `MESSAGE_EXPIRED` outcomes are reported as `0` so they are not
    /// charged against the handle's health.
    fn report_handle_result(&self, _handle: i64, _result: i32, _elapsed_ms: i64) {}
}
