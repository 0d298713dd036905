pub mod mem;
pub mod udp;

use crate::message::Message;
use std::time::Duration;

/// The abstraction the Raft core uses to talk to the rest of the cluster.
/// It can run against an in-process mailbox in tests just as well as a
/// real UDP socket in production.
pub trait Transport {
    /// Sends `msg` to `msg.dst`, or to every peer if `msg.dst` is
    /// [`BROADCAST`](crate::message::BROADCAST).
    fn send(&self, msg: Message);

    /// Blocks for at most `timeout` waiting for the next inbound message.
    /// Returns `None` on timeout.
    fn recv_timeout(&self, timeout: Duration) -> Option<Message>;
}
