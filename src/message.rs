use crate::log::LogEntry;
use serde::{Deserialize, Serialize};

/// ReplicaID is a type alias used to identify Raft nodes. Ids are short
/// opaque strings (e.g. `"A"`, `"B"`, or a hex identifier), not array
/// indices, so replica sets can be reordered or renamed without
/// renumbering.
pub type ReplicaId = String;

/// RequestId is the opaque client request identifier (`MID` in the wire
/// protocol) echoed back verbatim on every response.
pub type RequestId = String;

/// Reserved id meaning "addressed to all replicas" (as a `dst`) or "no
/// leader is currently known" (as a `leader` hint).
pub const BROADCAST: &str = "FFFF";

/// A fully-formed message as it travels on the wire: envelope fields common
/// to every message type, plus a type-specific body. Splitting envelope
/// from body, rather than repeating `src`/`dst`/`leader` in every variant,
/// keeps those three fields defined once instead of elevenfold.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub src: ReplicaId,
    pub dst: ReplicaId,
    pub leader: ReplicaId,
    pub body: MessageBody,
}

impl Message {
    pub fn new(src: ReplicaId, dst: ReplicaId, leader: ReplicaId, body: MessageBody) -> Message {
        Message {
            src,
            dst,
            leader,
            body,
        }
    }
}

/// MessageBody describes the messages replicas and clients pass between
/// each other to achieve consensus and to serve key-value requests. Dispatch
/// by a string `type` field maps naturally onto one variant per message
/// type, each carrying exactly the fields that message requires.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessageBody {
    /// Broadcast at startup so peers can observe a replica coming up. Carries
    /// no fields and has no effect on Raft state; every role ignores it on
    /// receipt.
    #[serde(rename = "hello")]
    Hello,

    /// Client read request.
    #[serde(rename = "get")]
    Get {
        #[serde(rename = "MID")]
        mid: RequestId,
        key: String,
    },

    /// Client write request.
    #[serde(rename = "put")]
    Put {
        #[serde(rename = "MID")]
        mid: RequestId,
        key: String,
        value: String,
    },

    /// Successful response to a client `get` or `put`.
    #[serde(rename = "ok")]
    Ok {
        #[serde(rename = "MID")]
        mid: RequestId,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },

    /// Response telling the client no leader is currently known.
    #[serde(rename = "fail")]
    Fail {
        #[serde(rename = "MID")]
        mid: RequestId,
    },

    /// Response telling the client to reissue its request to `leader`.
    #[serde(rename = "redirect")]
    Redirect {
        #[serde(rename = "MID")]
        mid: RequestId,
    },

    /// Candidate soliciting a vote from a peer.
    #[serde(rename = "vote")]
    Vote {
        term: u64,
        #[serde(rename = "lastLogIndex")]
        last_log_index: usize,
        #[serde(rename = "lastLogTerm")]
        last_log_term: u64,
    },

    /// Peer responding to a `Vote` request.
    #[serde(rename = "response")]
    VoteResponse {
        term: u64,
        #[serde(rename = "voteGranted")]
        vote_granted: bool,
    },

    /// Leader replicating log entries (or, with empty `entries`, a
    /// heartbeat) to a peer.
    #[serde(rename = "append_entries")]
    AppendEntries {
        term: u64,
        #[serde(rename = "prevLogIndex")]
        prev_log_index: usize,
        #[serde(rename = "prevLogTerm")]
        prev_log_term: u64,
        entries: Vec<LogEntry>,
        #[serde(rename = "leaderCommit")]
        leader_commit: usize,
    },

    /// Follower accepting an `AppendEntries`.
    #[serde(rename = "true")]
    AppendEntriesOk {
        term: u64,
        #[serde(rename = "nextIndex")]
        next_index: usize,
    },

    /// Follower refusing an `AppendEntries`, with the accelerated
    /// conflict-resolution hint the leader should retry from.
    #[serde(rename = "false")]
    AppendEntriesFail {
        term: u64,
        #[serde(rename = "nextIndex")]
        next_index: Option<usize>,
    },
}

impl MessageBody {
    /// A short name for logging, independent of the serde wire tag.
    pub fn kind(&self) -> &'static str {
        match self {
            MessageBody::Hello => "hello",
            MessageBody::Get { .. } => "get",
            MessageBody::Put { .. } => "put",
            MessageBody::Ok { .. } => "ok",
            MessageBody::Fail { .. } => "fail",
            MessageBody::Redirect { .. } => "redirect",
            MessageBody::Vote { .. } => "vote",
            MessageBody::VoteResponse { .. } => "response",
            MessageBody::AppendEntries { .. } => "append_entries",
            MessageBody::AppendEntriesOk { .. } => "true",
            MessageBody::AppendEntriesFail { .. } => "false",
        }
    }
}
