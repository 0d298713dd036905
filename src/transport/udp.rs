use crate::error::TransportError;
use crate::message::{Message, ReplicaId, BROADCAST};
use crate::transport::Transport;
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::Duration;

/// A `UdpSocket`-backed transport encoding [`Message`] as self-describing
/// JSON datagrams. A background thread owns the receiving half of the
/// socket and forwards successfully-decoded messages onto a
/// `crossbeam_channel`; malformed datagrams are logged and dropped, never
/// propagated to the Raft core.
pub struct UdpTransport {
    socket: UdpSocket,
    peers: HashMap<ReplicaId, SocketAddr>,
    rx: Receiver<Message>,
}

impl UdpTransport {
    pub fn bind(
        own_addr: SocketAddr,
        peers: HashMap<ReplicaId, SocketAddr>,
    ) -> Result<UdpTransport, TransportError> {
        let socket = UdpSocket::bind(own_addr)?;
        let recv_socket = socket.try_clone()?;
        let (tx, rx): (Sender<Message>, Receiver<Message>) = crossbeam_channel::unbounded();
        thread::spawn(move || recv_loop(recv_socket, tx));
        Ok(UdpTransport { socket, peers, rx })
    }
}

fn recv_loop(socket: UdpSocket, tx: Sender<Message>) {
    let mut buf = [0u8; 64 * 1024];
    loop {
        match socket.recv_from(&mut buf) {
            Ok((n, from)) => match serde_json::from_slice::<Message>(&buf[..n]) {
                Ok(msg) => {
                    if tx.send(msg).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!(%from, error = %err, "dropping malformed datagram");
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "udp recv error");
            }
        }
    }
}

impl Transport for UdpTransport {
    fn send(&self, msg: Message) {
        let bytes = match serde_json::to_vec(&msg) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode outgoing message");
                return;
            }
        };

        if msg.dst == BROADCAST {
            for addr in self.peers.values() {
                let _ = self.socket.send_to(&bytes, addr);
            }
        } else if let Some(addr) = self.peers.get(&msg.dst) {
            let _ = self.socket.send_to(&bytes, addr);
        }
    }

    fn recv_timeout(&self, timeout: Duration) -> Option<Message> {
        self.rx.recv_timeout(timeout).ok()
    }
}
