use thiserror::Error;

/// Errors raised at the transport boundary only. The Raft core itself
/// never returns a `Result` from its message-processing path; a malformed
/// message is simply dropped rather than propagated.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[from] serde_json::Error),
}
