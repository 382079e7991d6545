use serde::{Deserialize, Serialize};

use crate::types::{CallState, FailureReason, Identity, MediaStream, SessionId, TerminationReason};

/// Notifications for the consultation screen
///
/// Every transition that changes state publishes `StateChanged` first,
/// followed by the events listed on the transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CallEvent {
    StateChanged {
        session_id: SessionId,
        old_state: CallState,
        new_state: CallState,
    },
    /// Show the accept/decline prompt
    IncomingCall { session_id: SessionId, from: Identity },
    /// Bind the local preview
    LocalStreamReady { session_id: SessionId, stream: MediaStream },
    RemoteStreamReady { session_id: SessionId, stream: MediaStream },
    CallConnected { session_id: SessionId, remote: Identity },
    /// Discard both streams
    CallEnded {
        session_id: SessionId,
        reason: Option<TerminationReason>,
    },
    CallFailed {
        session_id: SessionId,
        reason: FailureReason,
        message: String,
    },
}

impl CallEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            CallEvent::StateChanged { session_id, .. }
            | CallEvent::IncomingCall { session_id, .. }
            | CallEvent::LocalStreamReady { session_id, .. }
            | CallEvent::RemoteStreamReady { session_id, .. }
            | CallEvent::CallConnected { session_id, .. }
            | CallEvent::CallEnded { session_id, .. }
            | CallEvent::CallFailed { session_id, .. } => session_id,
        }
    }
}
