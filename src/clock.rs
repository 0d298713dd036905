use rand::Rng;
use std::time::{Duration, Instant};

/// How often a Leader broadcasts a heartbeat (empty `AppendEntries`) in the
/// absence of real log traffic.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(200);

/// Timeout range used while `leader_hint` is the unknown sentinel.
const NO_LEADER_RANGE_SECS: (f64, f64) = (0.15, 0.30);

/// Timeout range used once a leader is known.
const KNOWN_LEADER_RANGE_SECS: (f64, f64) = (0.25, 0.40);

/// Draws a fresh randomized election timeout from the range appropriate to
/// whether a leader is currently known.
pub fn random_election_timeout(leader_known: bool) -> Duration {
    let (low, high) = if leader_known {
        KNOWN_LEADER_RANGE_SECS
    } else {
        NO_LEADER_RANGE_SECS
    };
    Duration::from_secs_f64(rand::thread_rng().gen_range(low..high))
}

/// Convenience wrapper returning an absolute deadline `now + timeout`.
pub fn election_deadline(leader_known: bool) -> Instant {
    Instant::now() + random_election_timeout(leader_known)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_leader_timeout_is_in_range() {
        for _ in 0..1000 {
            let d = random_election_timeout(false);
            assert!(d >= Duration::from_secs_f64(0.15));
            assert!(d < Duration::from_secs_f64(0.30));
        }
    }

    #[test]
    fn known_leader_timeout_is_in_range() {
        for _ in 0..1000 {
            let d = random_election_timeout(true);
            assert!(d >= Duration::from_secs_f64(0.25));
            assert!(d < Duration::from_secs_f64(0.40));
        }
    }
}
