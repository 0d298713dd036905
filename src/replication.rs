use crate::clock;
use crate::message::{MessageBody, ReplicaId};
use crate::replica::Replica;
use crate::role::Role;
use crate::transport::Transport;
use std::cmp;

impl<C: Transport> Replica<C> {
    /// Sends (or retries) an `AppendEntries` to one peer, built from this
    /// leader's `next_index` for that peer. Carries no entries (a
    /// heartbeat) when the peer is already caught up.
    pub(crate) fn send_append_entries_to(&self, peer: &ReplicaId) {
        let next = *self
            .next_index
            .get(peer)
            .unwrap_or(&(self.log.last_index() + 1));
        let prev_log_index = next.saturating_sub(1);
        let prev_log_term = self.log.get(prev_log_index).map(|e| e.term).unwrap_or(0);
        let entries = self.log.slice_from(next).to_vec();

        self.reply(
            peer.clone(),
            MessageBody::AppendEntries {
                term: self.term,
                prev_log_index,
                prev_log_term,
                entries,
                leader_commit: self.commit_index,
            },
        );
    }

    /// Broadcasts (or retries) `AppendEntries` to every peer. Doubles as
    /// the heartbeat: a peer already caught up simply receives an
    /// entry-free message.
    pub(crate) fn broadcast_append_entries(&self) {
        for peer in &self.peer_ids {
            self.send_append_entries_to(peer);
        }
    }

    /// Runs regardless of this replica's current role: a Leader or
    /// Candidate that hears from a legitimate current-or-newer-term leader
    /// must step down.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn handle_append_entries(
        &mut self,
        src: ReplicaId,
        leader_field: ReplicaId,
        term: u64,
        prev_log_index: usize,
        prev_log_term: u64,
        entries: Vec<crate::log::LogEntry>,
        leader_commit: usize,
    ) {
        if term < self.term {
            // Stale leader: silently ignored, no reply sent.
            return;
        }

        self.role = Role::Follower;
        self.term = term;
        self.voted_for = None;
        self.votes_received.clear();
        self.leader_hint = leader_field;
        self.election_deadline = clock::election_deadline(true);

        if prev_log_index > self.log.last_index() {
            self.reply(
                src,
                MessageBody::AppendEntriesFail {
                    term: self.term,
                    next_index: Some(self.log.last_index() + 1),
                },
            );
            return;
        }

        let prev_term_here = self
            .log
            .get(prev_log_index)
            .expect("checked above: prev_log_index <= last_index")
            .term;
        if prev_term_here != prev_log_term {
            let hint = self.log.first_index_of_term(prev_term_here);
            self.reply(
                src,
                MessageBody::AppendEntriesFail { term: self.term, next_index: Some(hint) },
            );
            return;
        }

        let had_entries = !entries.is_empty();
        self.log.truncate_and_extend(prev_log_index + 1, &entries);

        if leader_commit > self.commit_index {
            self.commit_index = cmp::min(leader_commit, self.log.last_index());
            self.apply_committed_entries();
        }

        // Empty heartbeats do not require a response; a follower that has
        // caught up will respond `true` to the next non-empty
        // `AppendEntries` instead.
        if had_entries {
            self.reply(
                src,
                MessageBody::AppendEntriesOk { term: self.term, next_index: self.log.last_index() + 1 },
            );
        }
    }

    /// Records the peer's progress, then sees whether a new index can be
    /// committed.
    pub(crate) fn handle_append_entries_ok(&mut self, src: ReplicaId, next_index: usize) {
        self.next_index.insert(src.clone(), next_index);
        self.match_index.insert(src, next_index.saturating_sub(1));
        self.advance_commit_index();
    }

    /// Backs off `next_index` using the accelerated hint if present, else
    /// by one, and retries immediately.
    pub(crate) fn handle_append_entries_fail(&mut self, src: ReplicaId, next_index: Option<usize>) {
        let current = *self.next_index.get(&src).unwrap_or(&1);
        let new_next = match next_index {
            Some(hint) => hint,
            None => current.saturating_sub(1),
        }
        .max(1);
        self.next_index.insert(src.clone(), new_next);
        self.send_append_entries_to(&src);
    }

    /// Advances `commit_index` to the highest index replicated on a strict
    /// majority of the cluster, restricted to entries of this leader's own
    /// current term.
    pub(crate) fn advance_commit_index(&mut self) {
        if self.role != Role::Leader {
            return;
        }

        let total_replicas = self.peer_ids.len() + 1;
        let mut idx = self.log.last_index();
        while idx > self.commit_index {
            let entry_term = self.log.get(idx).expect("idx within log bounds").term;
            if entry_term == self.term {
                let replicated = 1 + self.match_index.values().filter(|&&m| m >= idx).count();
                if replicated * 2 > total_replicas {
                    self.commit_index = idx;
                    break;
                }
            }
            idx -= 1;
        }

        self.apply_committed_entries();
    }
}
