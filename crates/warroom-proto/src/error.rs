//! Error types for the War Room message bus.

use crate::QuestionId;
use thiserror::Error;

/// Errors that can occur on the message bus.
///
/// All variants are local, synchronous, and recoverable — none of them should
/// tear down a session. The web layer maps each variant to a distinct error
/// kind so callers can tell "retry later" ([`BusError::Rejected`]) apart from
/// "your input was malformed" ([`BusError::InvalidMessage`]).
#[derive(Debug, Error)]
pub enum BusError {
    /// Malformed message draft; rejected at submission, never partially applied.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Reference to a participant outside the fixed roster.
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    /// Turn violation: the sender or message type is not permitted in the
    /// current scheduler state. The caller is expected to retry later.
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// Answer addressed to an unknown or already-resolved question.
    /// Callers tolerate this as a recoverable no-op.
    #[error("question not found: {0}")]
    QuestionNotFound(QuestionId),

    /// `resume` called while the session is not paused. Caller bug; no state change.
    #[error("resume called while not paused")]
    NotPaused,
}

impl BusError {
    /// Returns true if the caller should retry the same call later.
    ///
    /// Only turn violations are retryable; everything else indicates a
    /// malformed or stale request that retrying verbatim cannot fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BusError::Rejected(_))
    }

    /// Stable machine-readable kind for transport error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            BusError::InvalidMessage(_) => "invalid_message",
            BusError::UnknownParticipant(_) => "unknown_participant",
            BusError::Rejected(_) => "rejected",
            BusError::QuestionNotFound(_) => "question_not_found",
            BusError::NotPaused => "not_paused",
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, BusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rejected_is_retryable() {
        assert!(BusError::Rejected("not your turn".into()).is_retryable());
        assert!(!BusError::InvalidMessage("empty".into()).is_retryable());
        assert!(!BusError::NotPaused.is_retryable());
    }

    #[test]
    fn test_kind_is_stable() {
        assert_eq!(BusError::NotPaused.kind(), "not_paused");
        assert_eq!(BusError::Rejected(String::new()).kind(), "rejected");
        assert_eq!(
            BusError::UnknownParticipant("oracle".into()).kind(),
            "unknown_participant"
        );
    }
}
