use std::collections::HashMap;

/// The applied key-value map. A pure `String -> String` mapping, mutated
/// only by [`Replica`](crate::replica::Replica) as it applies committed log
/// entries. Reads are served only by the leader against this map, never
/// against uncommitted entries.
#[derive(Clone, Debug, Default)]
pub struct KvStore {
    entries: HashMap<String, String>,
}

impl KvStore {
    pub fn new() -> KvStore {
        KvStore::default()
    }

    /// Applies a committed `put`: overwrites any prior mapping for `key`.
    pub fn apply(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    /// Returns the value for `key`, or an empty string if absent, per this
    /// store's `get` response convention.
    pub fn get(&self, key: &str) -> String {
        self.entries.get(key).cloned().unwrap_or_default()
    }
}
