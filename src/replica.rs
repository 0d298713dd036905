use crate::clock::{self, HEARTBEAT_INTERVAL};
use crate::log::Log;
use crate::message::{Message, MessageBody, ReplicaId, BROADCAST};
use crate::role::Role;
use crate::state_machine::KvStore;
use crate::transport::Transport;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Fixed cluster membership for a single replica process: its own id and
/// the ids of every peer. Membership is static; no mechanism exists to
/// add or remove a peer after construction.
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    pub id: ReplicaId,
    pub peer_ids: Vec<ReplicaId>,
}

/// A single Raft replica maintaining a replicated key-value map. All
/// mutable state lives here; the log, the applied map, and the role state
/// are owned exclusively by the one event loop in [`Replica::start`], so
/// no locks are required.
pub struct Replica<C: Transport> {
    pub(crate) id: ReplicaId,
    pub(crate) peer_ids: Vec<ReplicaId>,
    pub(crate) transport: C,

    pub(crate) term: u64,
    pub(crate) voted_for: Option<ReplicaId>,
    pub(crate) role: Role,
    pub(crate) leader_hint: ReplicaId,

    pub(crate) log: Log,
    pub(crate) commit_index: usize,
    pub(crate) last_applied: usize,
    pub(crate) kv: KvStore,

    /// Leader-only: next log index to send to each peer.
    pub(crate) next_index: BTreeMap<ReplicaId, usize>,
    /// Leader-only: highest log index known replicated on each peer.
    pub(crate) match_index: BTreeMap<ReplicaId, usize>,
    /// Candidate-only: peers who voted for us this election.
    pub(crate) votes_received: BTreeSet<ReplicaId>,

    pub(crate) election_deadline: Instant,
    pub(crate) last_heartbeat: Instant,
}

impl<C: Transport> Replica<C> {
    pub fn new(config: ClusterConfig, transport: C) -> Replica<C> {
        let now = Instant::now();
        Replica {
            id: config.id,
            peer_ids: config.peer_ids,
            transport,
            term: 0,
            voted_for: None,
            role: Role::Follower,
            leader_hint: BROADCAST.to_string(),
            log: Log::new(),
            commit_index: 0,
            last_applied: 0,
            kv: KvStore::new(),
            next_index: BTreeMap::new(),
            match_index: BTreeMap::new(),
            votes_received: BTreeSet::new(),
            election_deadline: clock::election_deadline(false),
            // Due immediately: a fresh Follower need not wait a full
            // heartbeat interval before its first opportunity to broadcast,
            // should it win an election right away.
            last_heartbeat: now - HEARTBEAT_INTERVAL,
        }
    }

    /// Read-only accessor for the applied key-value map.
    pub fn kv(&self) -> &KvStore {
        &self.kv
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn term(&self) -> u64 {
        self.term
    }

    pub fn leader_hint(&self) -> &str {
        &self.leader_hint
    }

    /// Sends `body` to `dst`, stamping the envelope with our own id as
    /// `src` and our current best-known leader as the `leader` hint. Used
    /// for every outgoing message this replica produces.
    pub(crate) fn reply(&self, dst: ReplicaId, body: MessageBody) {
        self.transport
            .send(Message::new(self.id.clone(), dst, self.leader_hint.clone(), body));
    }

    /// Starts the replica and blocks forever. On every iteration: if
    /// Leader, emit a heartbeat when due; block on the transport for the
    /// nearer of the election deadline and (for Leader) the next heartbeat
    /// due time; dispatch the received message, if any; then check whether
    /// the election deadline has elapsed.
    pub fn start(&mut self) -> ! {
        self.reply(BROADCAST.to_string(), MessageBody::Hello);

        loop {
            if self.role == Role::Leader && self.last_heartbeat.elapsed() >= HEARTBEAT_INTERVAL {
                self.broadcast_append_entries();
                self.last_heartbeat = Instant::now();
            }

            let deadline = self.next_wakeup();
            let timeout = deadline.saturating_duration_since(Instant::now());
            if let Some(msg) = self.transport.recv_timeout(timeout) {
                self.dispatch(msg);
            }

            if self.role != Role::Leader && Instant::now() >= self.election_deadline {
                self.start_election();
            }
        }
    }

    fn next_wakeup(&self) -> Instant {
        if self.role == Role::Leader {
            std::cmp::min(
                self.election_deadline,
                self.last_heartbeat + HEARTBEAT_INTERVAL,
            )
        } else {
            self.election_deadline
        }
    }

    pub(crate) fn dispatch(&mut self, msg: Message) {
        let src = msg.src.clone();
        match msg.body {
            MessageBody::Hello => { /* liveness announcement only */ }
            MessageBody::Get { mid, key } => self.handle_get(src, mid, key),
            MessageBody::Put { mid, key, value } => self.handle_put(src, mid, key, value),
            MessageBody::Ok { .. } | MessageBody::Fail { .. } | MessageBody::Redirect { .. } => {
                // Client-facing responses; a replica never acts on these.
            }
            MessageBody::Vote {
                term,
                last_log_index,
                last_log_term,
            } => self.handle_vote_request(src, term, last_log_index, last_log_term),
            MessageBody::VoteResponse { term, vote_granted } => {
                if self.check_higher_term(term) {
                    return;
                }
                if self.role == Role::Candidate {
                    self.handle_vote_response(src, vote_granted);
                }
            }
            MessageBody::AppendEntries {
                term,
                prev_log_index,
                prev_log_term,
                entries,
                leader_commit,
            } => self.handle_append_entries(
                src,
                msg.leader,
                term,
                prev_log_index,
                prev_log_term,
                entries,
                leader_commit,
            ),
            MessageBody::AppendEntriesOk { term, next_index } => {
                if self.check_higher_term(term) {
                    return;
                }
                if self.role == Role::Leader {
                    self.handle_append_entries_ok(src, next_index);
                }
            }
            MessageBody::AppendEntriesFail { term, next_index } => {
                if self.check_higher_term(term) {
                    return;
                }
                if self.role == Role::Leader {
                    self.handle_append_entries_fail(src, next_index);
                }
            }
        }
    }

    /// Any message carrying a term greater than our own demotes us.
    /// Returns whether a demotion happened, so callers can skip
    /// role-specific handling of a now-stale message.
    pub(crate) fn check_higher_term(&mut self, term: u64) -> bool {
        if term > self.term {
            self.become_follower_due_to_higher_term(term);
            true
        } else {
            false
        }
    }

    pub(crate) fn become_follower_due_to_higher_term(&mut self, term: u64) {
        tracing::debug!(id = %self.id, old_term = self.term, new_term = term, "stepping down: higher term observed");
        self.term = term;
        self.voted_for = None;
        self.votes_received.clear();
        self.role = Role::Follower;
        self.election_deadline = clock::election_deadline(self.leader_hint != BROADCAST);
    }

    /// While `last_applied < commit_index`, applies the next entry to the
    /// key-value map and, if we are Leader and the entry carries a client
    /// origin, emits the deferred `ok` response.
    pub(crate) fn apply_committed_entries(&mut self) {
        while self.last_applied < self.commit_index {
            self.last_applied += 1;
            let entry = self.log.get(self.last_applied).expect("applied index must exist").clone();

            if let (Some(key), Some(value)) = (entry.key.clone(), entry.value.clone()) {
                self.kv.apply(key, value);
            }

            if self.role == Role::Leader {
                if let (Some(client), Some(request_id)) =
                    (entry.origin_client.clone(), entry.request_id.clone())
                {
                    self.reply(client, MessageBody::Ok { mid: request_id, value: None });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogEntry;
    use crate::transport::mem::InMemoryTransport;
    use std::time::Duration;

    const RECV_TIMEOUT: Duration = Duration::from_millis(200);

    fn replica(id: &str, peer_ids: &[&str], transport: InMemoryTransport) -> Replica<InMemoryTransport> {
        Replica::new(
            ClusterConfig {
                id: id.to_string(),
                peer_ids: peer_ids.iter().map(|s| s.to_string()).collect(),
            },
            transport,
        )
    }

    /// Delivers at most one pending message to `r`, if any is already
    /// queued. Unlike [`Replica::start`], never blocks waiting for a
    /// message that was never going to arrive.
    fn step(r: &mut Replica<InMemoryTransport>) -> bool {
        match r.transport.recv_timeout(Duration::from_millis(1)) {
            Some(msg) => {
                r.dispatch(msg);
                true
            }
            None => false,
        }
    }

    fn client_message(r: &Replica<InMemoryTransport>) -> Message {
        r.transport
            .recv_timeout(RECV_TIMEOUT)
            .expect("expected a message to have been sent")
    }

    #[test]
    fn single_node_cluster_commits_put_and_serves_get_locally() {
        let mut mesh = InMemoryTransport::cluster(&["A".to_string(), "client".to_string()]);
        let mut a = replica("A", &[], mesh.remove("A").unwrap());
        let client = mesh.remove("client").unwrap();

        a.start_election();
        // No peers to vote-request or heartbeat, so leadership is immediate
        // and "client" has received nothing yet.
        assert_eq!(a.role(), Role::Leader);

        a.dispatch(Message::new(
            "client".into(),
            "A".into(),
            BROADCAST.into(),
            MessageBody::Put { mid: "1".into(), key: "x".into(), value: "1".into() },
        ));
        assert_eq!(a.kv().get("x"), "1");

        let reply = client_message(&client);
        match reply.body {
            MessageBody::Ok { mid, value } => {
                assert_eq!(mid, "1");
                assert_eq!(value, None);
            }
            other => panic!("expected ok, got {:?}", other),
        }

        a.dispatch(Message::new(
            "client".into(),
            "A".into(),
            BROADCAST.into(),
            MessageBody::Get { mid: "2".into(), key: "x".into() },
        ));
        match client_message(&client).body {
            MessageBody::Ok { mid, value } => {
                assert_eq!(mid, "2");
                assert_eq!(value, Some("1".to_string()));
            }
            other => panic!("expected ok, got {:?}", other),
        }
    }

    #[test]
    fn fresh_follower_fails_client_before_leader_known() {
        let mut mesh = InMemoryTransport::cluster(&["A".to_string(), "client".to_string()]);
        let mut a = replica("A", &["B"], mesh.remove("A").unwrap());
        let client = mesh.remove("client").unwrap();

        a.dispatch(Message::new(
            "client".into(),
            "A".into(),
            BROADCAST.into(),
            MessageBody::Get { mid: "1".into(), key: "x".into() },
        ));

        match client_message(&client).body {
            MessageBody::Fail { mid } => assert_eq!(mid, "1"),
            other => panic!("expected fail, got {:?}", other),
        }
    }

    /// Elects "A" leader of a 3-node cluster using only "B"'s vote. "C" is
    /// never stepped, standing in for a replica that is merely slow rather
    /// than absent. Drains the post-election heartbeat into "B" so its
    /// `leader_hint` is populated.
    fn elect_a_with_b(a: &mut Replica<InMemoryTransport>, b: &mut Replica<InMemoryTransport>) {
        a.start_election();
        assert!(step(b)); // B receives the vote request, grants it
        assert_eq!(b.term(), 1);
        assert!(step(a)); // A receives B's VoteResponse, reaches a majority
        assert_eq!(a.role(), Role::Leader);

        assert!(step(b)); // B receives the no-op heartbeat, learns the leader
        assert_eq!(b.leader_hint(), "A");
    }

    #[test]
    fn three_node_election_converges_and_follower_redirects() {
        let ids = ["A".to_string(), "B".to_string(), "C".to_string(), "client".to_string()];
        let mut mesh = InMemoryTransport::cluster(&ids);
        let mut a = replica("A", &["B", "C"], mesh.remove("A").unwrap());
        let mut b = replica("B", &["A", "C"], mesh.remove("B").unwrap());
        let client = mesh.remove("client").unwrap();

        elect_a_with_b(&mut a, &mut b);

        b.dispatch(Message::new(
            "client".into(),
            "B".into(),
            BROADCAST.into(),
            MessageBody::Put { mid: "1".into(), key: "x".into(), value: "1".into() },
        ));
        let reply = client_message(&client);
        assert_eq!(reply.leader, "A");
        match reply.body {
            MessageBody::Redirect { mid } => assert_eq!(mid, "1"),
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[test]
    fn committed_put_replicates_and_client_receives_ok() {
        let ids = ["A".to_string(), "B".to_string(), "C".to_string(), "client".to_string()];
        let mut mesh = InMemoryTransport::cluster(&ids);
        let mut a = replica("A", &["B", "C"], mesh.remove("A").unwrap());
        let mut b = replica("B", &["A", "C"], mesh.remove("B").unwrap());
        let client = mesh.remove("client").unwrap();

        elect_a_with_b(&mut a, &mut b);

        a.dispatch(Message::new(
            "client".into(),
            "A".into(),
            BROADCAST.into(),
            MessageBody::Put { mid: "1".into(), key: "x".into(), value: "1".into() },
        ));
        // Not yet committed: only self has this entry, one vote short of
        // a majority of 3.
        assert_eq!(a.kv().get("x"), "");

        assert!(step(&mut b)); // B appends the new entry and acks
        // Drain A's mailbox: the no-op's own (already-majority) ack may
        // still be queued ahead of this put's ack.
        while step(&mut a) {}

        assert_eq!(a.kv().get("x"), "1");
        match client_message(&client).body {
            MessageBody::Ok { mid, value } => {
                assert_eq!(mid, "1");
                assert_eq!(value, None);
            }
            other => panic!("expected ok, got {:?}", other),
        }

        a.dispatch(Message::new(
            "client".into(),
            "A".into(),
            BROADCAST.into(),
            MessageBody::Get { mid: "2".into(), key: "x".into() },
        ));
        match client_message(&client).body {
            MessageBody::Ok { value, .. } => assert_eq!(value, Some("1".to_string())),
            other => panic!("expected ok, got {:?}", other),
        }
    }

    #[test]
    fn commit_blocked_without_majority_acks() {
        let ids = ["A".to_string(), "B".to_string(), "C".to_string(), "client".to_string()];
        let mut mesh = InMemoryTransport::cluster(&ids);
        let mut a = replica("A", &["B", "C"], mesh.remove("A").unwrap());
        let mut b = replica("B", &["A", "C"], mesh.remove("B").unwrap());
        let _client = mesh.remove("client").unwrap();

        elect_a_with_b(&mut a, &mut b);
        let committed_before = a.commit_index;

        a.dispatch(Message::new(
            "client".into(),
            "A".into(),
            BROADCAST.into(),
            MessageBody::Put { mid: "1".into(), key: "x".into(), value: "1".into() },
        ));

        // Neither B nor C (both unreachable in this round) ever acks;
        // commit_index must not move past what a majority has confirmed.
        assert_eq!(a.commit_index, committed_before);
        assert_eq!(a.kv().get("x"), "");
    }

    #[test]
    fn append_entries_conflict_emits_accelerated_hint() {
        let mut mesh = InMemoryTransport::cluster(&["F".to_string(), "L".to_string()]);
        let mut f = replica("F", &["L"], mesh.remove("F").unwrap());
        let l = mesh.remove("L").unwrap();

        f.log.append(LogEntry::command(1, "a".into(), "1".into(), "L".into(), "1".into()));
        f.log.append(LogEntry::command(1, "b".into(), "2".into(), "L".into(), "2".into()));
        f.log.append(LogEntry::command(3, "c".into(), "3".into(), "L".into(), "3".into()));
        f.term = 3;

        f.dispatch(Message::new(
            "L".into(),
            "F".into(),
            "L".into(),
            MessageBody::AppendEntries {
                term: 4,
                prev_log_index: 3,
                prev_log_term: 2,
                entries: vec![],
                leader_commit: 0,
            },
        ));

        match client_message(&l).body {
            MessageBody::AppendEntriesFail { term, next_index } => {
                assert_eq!(term, 4);
                assert_eq!(next_index, Some(3));
            }
            other => panic!("expected append_entries fail, got {:?}", other),
        }
    }

    #[test]
    fn append_entries_too_far_ahead_emits_next_index_hint() {
        let mut mesh = InMemoryTransport::cluster(&["F".to_string(), "L".to_string()]);
        let mut f = replica("F", &["L"], mesh.remove("F").unwrap());
        let l = mesh.remove("L").unwrap();

        f.dispatch(Message::new(
            "L".into(),
            "F".into(),
            "L".into(),
            MessageBody::AppendEntries {
                term: 1,
                prev_log_index: 5,
                prev_log_term: 1,
                entries: vec![],
                leader_commit: 0,
            },
        ));

        match client_message(&l).body {
            MessageBody::AppendEntriesFail { term, next_index } => {
                assert_eq!(term, 1);
                assert_eq!(next_index, Some(1));
            }
            other => panic!("expected append_entries fail, got {:?}", other),
        }
    }
}
