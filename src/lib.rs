//! `raftkv` is a small, strongly-consistent replicated key-value store. Its
//! core is a leader-based implementation of the Raft consensus algorithm:
//! leader election, log replication, commit advancement, and state-machine
//! application of client `get`/`put` commands across a fixed, static
//! cluster of replicas.
//!
//! The consensus core is transport-agnostic: it consumes a stream of
//! decoded [`Message`](message::Message) values and produces messages to
//! send through the [`Transport`](transport::Transport) trait. Persistence,
//! dynamic membership, and log compaction are explicitly out of scope.

pub mod client;
pub mod clock;
pub mod election;
pub mod error;
pub mod log;
pub mod message;
pub mod replica;
pub mod replication;
pub mod role;
pub mod state_machine;
pub mod transport;

pub use error::TransportError;
pub use message::{Message, ReplicaId, RequestId, BROADCAST};
pub use replica::{ClusterConfig, Replica};
pub use transport::Transport;
