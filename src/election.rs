use crate::clock;
use crate::log::LogEntry;
use crate::message::{MessageBody, ReplicaId, BROADCAST};
use crate::replica::Replica;
use crate::role::Role;
use crate::transport::Transport;

impl<C: Transport> Replica<C> {
    /// Becomes Candidate, clears the leader hint, bumps the term, votes
    /// for self, broadcasts a vote request to every peer, and resets the
    /// election deadline. A replica with no peers wins immediately: it can
    /// never receive a competing vote.
    pub(crate) fn start_election(&mut self) {
        self.role = Role::Candidate;
        self.leader_hint = BROADCAST.to_string();
        self.term += 1;
        self.voted_for = Some(self.id.clone());
        self.votes_received.clear();
        self.votes_received.insert(self.id.clone());

        tracing::info!(id = %self.id, term = self.term, "starting election");

        if self.peer_ids.is_empty() {
            self.become_leader();
            return;
        }

        let body = MessageBody::Vote {
            term: self.term,
            last_log_index: self.log.last_index(),
            last_log_term: self.log.last_term(),
        };
        self.reply(BROADCAST.to_string(), body);
        self.election_deadline = clock::election_deadline(false);
    }

    /// Applicable regardless of this replica's current role: any replica
    /// may grant a vote.
    pub(crate) fn handle_vote_request(
        &mut self,
        src: ReplicaId,
        term: u64,
        last_log_index: usize,
        last_log_term: u64,
    ) {
        if term > self.term {
            self.become_follower_due_to_higher_term(term);
        }

        let can_vote = match &self.voted_for {
            None => true,
            Some(who) => who == &src,
        };
        let log_up_to_date =
            self.log.last_index() <= last_log_index && self.log.last_term() <= last_log_term;
        let grant = term >= self.term && can_vote && log_up_to_date;

        if grant {
            self.voted_for = Some(src.clone());
            self.election_deadline = clock::election_deadline(self.leader_hint != BROADCAST);
            tracing::debug!(id = %self.id, term = self.term, candidate = %src, "granting vote");
            self.reply(src, MessageBody::VoteResponse { term: self.term, vote_granted: true });
        } else {
            self.reply(src, MessageBody::VoteResponse { term: self.term, vote_granted: false });
        }
    }

    /// The caller has already applied the higher-term check and confirmed
    /// we are still a Candidate.
    pub(crate) fn handle_vote_response(&mut self, src: ReplicaId, vote_granted: bool) {
        if !vote_granted {
            return;
        }

        self.votes_received.insert(src);
        let total_replicas = self.peer_ids.len() + 1;
        if self.votes_received.len() * 2 > total_replicas {
            self.become_leader();
        }
    }

    /// Resets per-peer replication cursors, appends a no-op entry in the
    /// new term so commit advancement is never stuck on an inherited,
    /// uncommitted tail from a prior leader, and immediately broadcasts
    /// the first heartbeat.
    pub(crate) fn become_leader(&mut self) {
        tracing::info!(id = %self.id, term = self.term, "became leader");
        self.role = Role::Leader;
        self.leader_hint = self.id.clone();
        self.votes_received.clear();

        self.next_index.clear();
        self.match_index.clear();
        for peer in self.peer_ids.clone() {
            self.next_index.insert(peer.clone(), self.log.last_index() + 1);
            self.match_index.insert(peer, 0);
        }

        self.log.append(LogEntry {
            term: self.term,
            key: None,
            value: None,
            origin_client: None,
            request_id: None,
        });

        self.broadcast_append_entries();
        self.last_heartbeat = std::time::Instant::now();
        self.advance_commit_index();
    }
}
