//! Session-level errors.

use state_kernel::{ErrorSeverity, KernelError, ProtocolViolation};
use thiserror::Error;

use crate::repository::RepositoryError;

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A recorded action that failed against the freshly rebuilt state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("replay interrupted at step {step}: {reason}")]
pub struct ReplayFailure {
    /// 1-based position of the action in the saved log.
    pub step: usize,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The game collaborator could not build its initial state.
    #[error("failed to build the initial game state")]
    Build(#[source] BoxedError),

    /// The game refused an action; every change it made was cancelled.
    #[error("action {step} ({label}) rejected")]
    ActionRejected {
        step: usize,
        label: String,
        #[source]
        source: BoxedError,
    },

    #[error(transparent)]
    Replay(#[from] ReplayFailure),

    #[error("checksum mismatch after replay: saved {expected}, replayed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("change-set protocol violated: {0}")]
    Protocol(ProtocolViolation),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("failed to encode snapshot: {0}")]
    Snapshot(String),
}

impl KernelError for SessionError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ActionRejected { .. } => ErrorSeverity::Validation,
            Self::Protocol(violation) => violation.severity(),
            Self::Repository(err) => err.severity(),
            Self::Snapshot(_) => ErrorSeverity::Internal,
            Self::Build(_) | Self::Replay(_) | Self::ChecksumMismatch { .. } => {
                ErrorSeverity::Fatal
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Build(_) => "SESSION_BUILD",
            Self::ActionRejected { .. } => "SESSION_ACTION_REJECTED",
            Self::Replay(_) => "SESSION_REPLAY_FAILURE",
            Self::ChecksumMismatch { .. } => "SESSION_CHECKSUM_MISMATCH",
            Self::Protocol(violation) => violation.error_code(),
            Self::Repository(err) => err.error_code(),
            Self::Snapshot(_) => "SESSION_SNAPSHOT",
        }
    }
}

impl From<bincode::Error> for SessionError {
    fn from(err: bincode::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}
