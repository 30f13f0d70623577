use std::net::SocketAddr;
use std::sync::Arc;

use hq_protocol::{
    DeviceRegistry, HqDecoder, HqError, PositionRecord, ReplyTransport, SystemClock,
};
use log::{debug, info, warn};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Default listening port for HQ trackers.
pub const DEFAULT_PORT: u16 = 5013;

/// Largest datagram accepted from a device.
const MAX_DATAGRAM: usize = 2048;

type Outbound = (Vec<u8>, SocketAddr);

/// Reply path handed to the decoder: acknowledgment frames are queued on an
/// unbounded channel drained by the socket writer task, so sending never
/// blocks the decode loop.
pub struct ChannelReplyTransport {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelReplyTransport {
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }
}

impl ReplyTransport for ChannelReplyTransport {
    fn send_reply(&mut self, reply: &[u8], destination: SocketAddr) -> hq_protocol::Result<()> {
        self.tx
            .send((reply.to_vec(), destination))
            .map_err(|_| HqError::ChannelClosed)
    }
}

/// Listen on `bind` and decode every inbound datagram as one frame.
pub async fn run(bind: SocketAddr) -> std::io::Result<()> {
    let socket = Arc::new(UdpSocket::bind(bind).await?);
    info!("listening on {}", socket.local_addr()?);

    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let writer = Arc::clone(&socket);
    tokio::spawn(async move {
        while let Some((reply, destination)) = rx.recv().await {
            if let Err(e) = writer.send_to(&reply, destination).await {
                warn!("reply to {destination} failed: {e}");
            }
        }
    });

    let mut decoder = HqDecoder::new(DeviceRegistry::new(), SystemClock)
        .with_transport(ChannelReplyTransport::new(tx));

    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        let (len, source) = socket.recv_from(&mut buf).await?;
        match decoder.decode(source, &buf[..len]) {
            Some(position) => report(&position),
            None => debug!("dropped {len}-byte frame from {source}"),
        }
    }
}

fn report(position: &PositionRecord) {
    info!(
        "device {} at {:.6},{:.6} speed {} course {} valid {} time {}",
        position.device_id,
        position.latitude,
        position.longitude,
        position.speed,
        position.course,
        position.valid,
        position.time,
    );
    if let Some(alarm) = position.alarm {
        warn!("device {} raised {alarm:?} alarm", position.device_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_transport_queues_for_writer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = ChannelReplyTransport::new(tx);
        let destination: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        transport
            .send_reply(b"*HQ,135790246811220,D4,101530#", destination)
            .unwrap();
        let (reply, to) = rx.try_recv().unwrap();
        assert_eq!(reply, b"*HQ,135790246811220,D4,101530#");
        assert_eq!(to, destination);
    }

    #[test]
    fn test_reply_transport_reports_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut transport = ChannelReplyTransport::new(tx);
        let destination: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert!(transport.send_reply(b"#", destination).is_err());
    }
}
