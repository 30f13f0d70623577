use std::net::SocketAddr;

use crate::error::Result;

/// Outbound path for acknowledgment frames.
///
/// Delivery is fire-and-forget: the decoder issues at most one write per
/// decoded frame and never waits for it, and a failed write never affects
/// the decoded record.
pub trait ReplyTransport: Send {
    /// Queue `reply` for delivery to `destination`. Must not block.
    fn send_reply(&mut self, reply: &[u8], destination: SocketAddr) -> Result<()>;
}

/// Transport for decoders that never reply. Cannot be constructed; it only
/// serves as the default type parameter of
/// [`HqDecoder`](crate::decoder::HqDecoder).
#[derive(Debug)]
pub enum NoReply {}

impl ReplyTransport for NoReply {
    fn send_reply(&mut self, _reply: &[u8], _destination: SocketAddr) -> Result<()> {
        match *self {}
    }
}
