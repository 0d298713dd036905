use crate::log::LogEntry;
use crate::message::{MessageBody, ReplicaId, RequestId, BROADCAST};
use crate::replica::Replica;
use crate::role::Role;
use crate::transport::Transport;

impl<C: Transport> Replica<C> {
    /// Served only by the Leader, directly against the applied map. A
    /// non-leader replies `fail` if no leader is known, else `redirect`.
    pub(crate) fn handle_get(&mut self, src: ReplicaId, mid: RequestId, key: String) {
        match self.role {
            Role::Leader => {
                let value = self.kv.get(&key);
                self.reply(src, MessageBody::Ok { mid, value: Some(value) });
            }
            _ => self.reply_fail_or_redirect(src, mid),
        }
    }

    /// The Leader appends the command to its log and broadcasts
    /// `AppendEntries`. The client does not get a response here; it is
    /// emitted later, when the entry commits. A non-leader replies `fail`
    /// or `redirect` exactly as `get` does.
    pub(crate) fn handle_put(&mut self, src: ReplicaId, mid: RequestId, key: String, value: String) {
        match self.role {
            Role::Leader => {
                let entry = LogEntry::command(self.term, key, value, src, mid);
                self.log.append(entry);
                self.broadcast_append_entries();
                // Handles the cluster-size-1 case, where no peer ever acks
                // and advance_commit_index would otherwise never run: self
                // alone is already a majority.
                self.advance_commit_index();
            }
            _ => self.reply_fail_or_redirect(src, mid),
        }
    }

    fn reply_fail_or_redirect(&self, src: ReplicaId, mid: RequestId) {
        if self.leader_hint == BROADCAST {
            self.reply(src, MessageBody::Fail { mid });
        } else {
            self.reply(src, MessageBody::Redirect { mid });
        }
    }
}
