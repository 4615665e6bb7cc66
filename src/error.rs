use thiserror::Error;

/// Failures the session recovers from; each one ends up as a single log line.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    StartRejected(String),

    #[error("{0}")]
    StopRejected(String),

    #[error("{0}")]
    NoActiveSession(String),

    #[error("malformed status snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("{context}: {message}")]
    Transport {
        context: &'static str,
        message: String,
    },

    #[error("status polling is already active")]
    AlreadyPolling,
}

impl ClientError {
    pub(crate) fn transport(context: &'static str, err: impl std::fmt::Display) -> Self {
        ClientError::Transport {
            context,
            message: err.to_string(),
        }
    }
}
