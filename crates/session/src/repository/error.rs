//! Error types raised by the save-file repository.

use state_kernel::{ErrorSeverity, KernelError};
use thiserror::Error;

/// Errors surfaced while writing or reading save files.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("log already exists: {0}")]
    LogAlreadyExists(String),

    #[error("partial write detected at offset {offset}: expected {expected} bytes, found {actual}")]
    PartialWrite {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("unexpected record at offset {offset}: expected {expected}")]
    UnexpectedRecord { offset: u64, expected: &'static str },

    #[error("unsupported save format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

impl KernelError for RepositoryError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Io(_) => ErrorSeverity::Recoverable,
            Self::LogAlreadyExists(_) | Self::UnsupportedVersion { .. } => {
                ErrorSeverity::Validation
            }
            Self::Serialization(_) => ErrorSeverity::Internal,
            Self::CorruptedData(_) | Self::PartialWrite { .. } | Self::UnexpectedRecord { .. } => {
                ErrorSeverity::Fatal
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "REPOSITORY_IO",
            Self::Serialization(_) => "REPOSITORY_SERIALIZATION",
            Self::CorruptedData(_) => "REPOSITORY_CORRUPTED_DATA",
            Self::LogAlreadyExists(_) => "REPOSITORY_LOG_ALREADY_EXISTS",
            Self::PartialWrite { .. } => "REPOSITORY_PARTIAL_WRITE",
            Self::UnexpectedRecord { .. } => "REPOSITORY_UNEXPECTED_RECORD",
            Self::UnsupportedVersion { .. } => "REPOSITORY_UNSUPPORTED_VERSION",
        }
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
