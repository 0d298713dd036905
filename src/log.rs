use crate::message::{ReplicaId, RequestId};
use serde::{Deserialize, Serialize};

/// A single entry in the replicated log. Index 0 is reserved for a sentinel
/// entry (`term: 0`, no command) that every replica's log starts with;
/// entries at index ≥ 1 carry a client command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub term: u64,
    /// `None` only for the index-0 sentinel.
    pub key: Option<String>,
    pub value: Option<String>,
    pub origin_client: Option<ReplicaId>,
    pub request_id: Option<RequestId>,
}

impl LogEntry {
    fn sentinel() -> LogEntry {
        LogEntry {
            term: 0,
            key: None,
            value: None,
            origin_client: None,
            request_id: None,
        }
    }

    pub fn command(
        term: u64,
        key: String,
        value: String,
        origin_client: ReplicaId,
        request_id: RequestId,
    ) -> LogEntry {
        LogEntry {
            term,
            key: Some(key),
            value: Some(value),
            origin_client: Some(origin_client),
            request_id: Some(request_id),
        }
    }
}

/// The ordered, 1-indexed log: `entries[0]` is always the sentinel. All
/// public indexing here uses the Raft log index directly, not the
/// underlying `Vec` offset, so callers never need to know about the
/// sentinel's bookkeeping.
#[derive(Clone, Debug)]
pub struct Log {
    entries: Vec<LogEntry>,
}

impl Default for Log {
    fn default() -> Log {
        Log {
            entries: vec![LogEntry::sentinel()],
        }
    }
}

impl Log {
    pub fn new() -> Log {
        Log::default()
    }

    /// Highest valid log index (one less than the number of entries stored,
    /// counting the sentinel).
    pub fn last_index(&self) -> usize {
        self.entries.len() - 1
    }

    /// Term of the entry at `last_index`; 0 on an empty (sentinel-only) log.
    pub fn last_term(&self) -> u64 {
        self.entries[self.last_index()].term
    }

    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        self.entries.get(index)
    }

    /// Entries from `from` (inclusive) to the end of the log, for
    /// replication to a peer whose `next_index` is `from`.
    pub fn slice_from(&self, from: usize) -> &[LogEntry] {
        if from >= self.entries.len() {
            &[]
        } else {
            &self.entries[from..]
        }
    }

    pub fn append(&mut self, entry: LogEntry) -> usize {
        self.entries.push(entry);
        self.last_index()
    }

    /// Truncates the log to its first `len` entries (indices `0..len`),
    /// then appends `extra` in order. A leader never calls this on its own
    /// log; only a follower processing `AppendEntries` does.
    pub fn truncate_and_extend(&mut self, len: usize, extra: &[LogEntry]) {
        self.entries.truncate(len);
        self.entries.extend_from_slice(extra);
    }

    /// The first index whose entry's term equals `conflicting_term`. Used to
    /// build the accelerated conflict-resolution hint in an `AppendEntries`
    /// refusal: per the standard Raft description, the leader should retry
    /// with `prev_log_index` set to just before this index, skipping the
    /// entire conflicting term in one round trip instead of backing off one
    /// index at a time.
    pub fn first_index_of_term(&self, conflicting_term: u64) -> usize {
        self.entries
            .iter()
            .position(|e| e.term == conflicting_term)
            .unwrap_or(self.entries.len())
    }
}
