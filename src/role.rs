/// The three Raft roles: Follower -> Candidate on election timeout;
/// Candidate -> Leader on a strict majority of votes; Candidate/Leader ->
/// Follower on discovering a higher term or, for a Candidate, a valid
/// leader in the current term.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Follower => "follower",
            Role::Candidate => "candidate",
            Role::Leader => "leader",
        };
        write!(f, "{}", s)
    }
}
