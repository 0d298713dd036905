use crate::message::{Message, ReplicaId, BROADCAST};
use crate::transport::Transport;
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::time::Duration;

/// An in-process mailbox transport wiring sibling replicas together with
/// `crossbeam_channel` senders held in a map keyed by replica id. Used by
/// tests and by any in-process simulation of a cluster; production
/// deployments use [`UdpTransport`](crate::transport::udp::UdpTransport)
/// instead.
pub struct InMemoryTransport {
    id: ReplicaId,
    peers: HashMap<ReplicaId, Sender<Message>>,
    rx: Receiver<Message>,
}

impl InMemoryTransport {
    /// Builds a fully-connected mailbox mesh for `ids`: one
    /// `InMemoryTransport` per id, each able to reach every other.
    pub fn cluster(ids: &[ReplicaId]) -> HashMap<ReplicaId, InMemoryTransport> {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for id in ids {
            let (tx, rx) = crossbeam_channel::unbounded();
            senders.insert(id.clone(), tx);
            receivers.insert(id.clone(), rx);
        }

        ids.iter()
            .map(|id| {
                let transport = InMemoryTransport {
                    id: id.clone(),
                    peers: senders.clone(),
                    rx: receivers.remove(id).unwrap(),
                };
                (id.clone(), transport)
            })
            .collect()
    }
}

impl Transport for InMemoryTransport {
    fn send(&self, msg: Message) {
        if msg.dst == BROADCAST {
            for (id, sender) in &self.peers {
                if *id != self.id {
                    let _ = sender.send(msg.clone());
                }
            }
        } else if let Some(sender) = self.peers.get(&msg.dst) {
            let _ = sender.send(msg);
        }
    }

    fn recv_timeout(&self, timeout: Duration) -> Option<Message> {
        self.rx.recv_timeout(timeout).ok()
    }
}
