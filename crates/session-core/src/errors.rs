//! Error types for call session coordination

use crate::types::FailureReason;
use thiserror::Error;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by the call session manager
///
/// Every variant is local to a single call session. Errors raised while a
/// transition is executing move the session to `Failed` before they are
/// returned; `Precondition` never mutates the session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Camera/microphone access was denied or no device is available
    #[error("Media acquisition failed: {0}")]
    MediaAcquisition(String),

    /// The operation is not valid in the session's current state
    #[error("Operation '{operation}' is not allowed in state {state}")]
    Precondition { operation: String, state: String },

    /// The signaling channel disconnected
    #[error("Signaling channel lost: {0}")]
    SignalingLost(String),

    /// The peer connection adapter could not complete negotiation
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// A signaling message could not be delivered
    #[error("Signaling error: {0}")]
    Signaling(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    pub fn precondition(operation: impl Into<String>, state: impl std::fmt::Display) -> Self {
        SessionError::Precondition {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    /// The failure reason a session records when this error terminates it
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            SessionError::MediaAcquisition(_) => FailureReason::MediaAcquisition,
            SessionError::SignalingLost(_) | SessionError::Signaling(_) => FailureReason::SignalingLost,
            SessionError::Handshake(_) => FailureReason::Handshake,
            SessionError::Precondition { .. } | SessionError::Config(_) | SessionError::Internal(_) => {
                FailureReason::Internal
            }
        }
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, SessionError::Precondition { .. })
    }
}

impl From<medcall_infra_common::Error> for SessionError {
    fn from(err: medcall_infra_common::Error) -> Self {
        SessionError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Signaling(format!("Malformed signaling message: {}", err))
    }
}
