//! Error types for roster validation and guard prompting

/// Failures that stay inside a single account.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("roster entry #{position}: {reason}")]
    InvalidAccount { position: usize, reason: String },

    #[error("guard code was not supplied")]
    GuardAbandoned,

    #[error("guard prompt I/O failed: {0}")]
    PromptIo(#[from] std::io::Error),

    #[error("guard prompt queue is closed")]
    PromptQueueClosed,
}

impl Error {
    /// True when a human chose not to answer, as opposed to the console failing.
    pub fn is_declined(&self) -> bool {
        matches!(self, Error::GuardAbandoned)
    }
}

/// Result alias for session pool operations.
pub type Result<T> = std::result::Result<T, Error>;
