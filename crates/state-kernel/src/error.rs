//! Common error infrastructure for the state kernel.
//!
//! Two families exist. [`StateError`] is returned as a `Result` by cell
//! construction and dynamic assignment. [`ProtocolViolation`] describes misuse
//! of the change-set lifecycle; the stack reports it as a `false` return value
//! and keeps the last one for diagnostics, it never propagates it as an error.

use crate::cell::CellId;

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the caller may retry, possibly with different input
/// - **Validation**: invalid input that should be rejected without retry
/// - **Internal**: unexpected inconsistency that requires investigation
/// - **Fatal**: state can no longer be trusted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    Recoverable,
    Validation,
    Internal,
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable | Self::Validation)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all kernel errors.
///
/// Provides a uniform interface for classification across error types.
/// Implementors derive `thiserror::Error` for `Display`.
pub trait KernelError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a stable identifier for this error variant.
    fn error_code(&self) -> &'static str;
}

/// Errors raised by cell construction and assignment.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The cell could not be created; it is left unusable.
    #[error("cell '{cell}' rejected: {reason}")]
    Configuration {
        /// The requested identifier.
        cell: String,
        /// Why construction was refused.
        reason: &'static str,
    },

    /// A value of the wrong type was assigned; the prior value is retained.
    #[error("cell {cell} holds {expected}, refused a value of type {found}")]
    TypeMismatch {
        cell: CellId,
        expected: &'static str,
        found: &'static str,
    },

    /// Collection cells change element by element only.
    #[error("cell {cell} is a collection and cannot be assigned as a whole")]
    NotAssignable { cell: CellId },

    /// No live cell carries the requested identifier.
    #[error("no live cell named '{cell}'")]
    UnknownCell { cell: String },

    /// A sequence position outside the current bounds.
    #[error("index {index} out of bounds for cell {cell} (len {len})")]
    IndexOutOfBounds {
        cell: CellId,
        index: usize,
        len: usize,
    },
}

impl KernelError for StateError {
    fn severity(&self) -> ErrorSeverity {
        use StateError::*;
        match self {
            // A cell that cannot be built means the entity graph is wrong
            Configuration { .. } => ErrorSeverity::Fatal,
            TypeMismatch { .. } | NotAssignable { .. } | IndexOutOfBounds { .. } => {
                ErrorSeverity::Validation
            }
            UnknownCell { .. } => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        use StateError::*;
        match self {
            Configuration { .. } => "KERNEL_CONFIGURATION",
            TypeMismatch { .. } => "KERNEL_TYPE_MISMATCH",
            NotAssignable { .. } => "KERNEL_NOT_ASSIGNABLE",
            UnknownCell { .. } => "KERNEL_UNKNOWN_CELL",
            IndexOutOfBounds { .. } => "KERNEL_INDEX_OUT_OF_BOUNDS",
        }
    }
}

/// Misuse of the change-set lifecycle.
///
/// Every stack operation that can be misused returns `false` instead of
/// failing; callers treat that as a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProtocolViolation {
    #[error("a change set is already open")]
    AlreadyOpen,

    #[error("no change set is open")]
    NothingOpen,

    #[error("history has nothing left to undo")]
    NothingToUndo,

    #[error("history has nothing left to redo")]
    NothingToRedo,

    #[error("undo and redo are unavailable while a change set is open")]
    ActionOpen,
}

impl KernelError for ProtocolViolation {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        use ProtocolViolation::*;
        match self {
            AlreadyOpen => "PROTOCOL_ALREADY_OPEN",
            NothingOpen => "PROTOCOL_NOTHING_OPEN",
            NothingToUndo => "PROTOCOL_NOTHING_TO_UNDO",
            NothingToRedo => "PROTOCOL_NOTHING_TO_REDO",
            ActionOpen => "PROTOCOL_ACTION_OPEN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_classification() {
        let err = StateError::Configuration {
            cell: String::new(),
            reason: "empty id",
        };
        assert_eq!(err.severity(), ErrorSeverity::Fatal);
        assert!(err.severity().is_internal());
        assert_eq!(err.error_code(), "KERNEL_CONFIGURATION");

        let violation = ProtocolViolation::AlreadyOpen;
        assert!(violation.severity().is_recoverable());
        assert_eq!(violation.to_string(), "a change set is already open");
    }
}
