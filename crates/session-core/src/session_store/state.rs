use chrono::Utc;

use super::history::{SessionHistory, TransitionRecord};
use crate::state_table::{Action, EventKind};
use crate::types::{
    CallState, Identity, MediaStream, Role, SessionId, SignalPayload, TerminationReason,
};

/// Everything the manager knows about one call attempt
///
/// A new `SessionState` is created for each call. Once it reaches a
/// terminal state it is kept only for inspection.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: SessionId,
    pub local_identity: Identity,
    pub remote_identity: Option<Identity>,
    /// Assigned on the first place_call or incoming offer, never changed after
    pub role: Option<Role>,
    pub call_state: CallState,

    pub local_stream: Option<MediaStream>,
    pub remote_stream: Option<MediaStream>,

    /// Offer received but not yet answered
    pub pending_remote_signal: Option<SignalPayload>,
    pub local_description: Option<SignalPayload>,
    pub remote_description: Option<SignalPayload>,

    pub failure: Option<String>,
    pub termination: Option<TerminationReason>,

    history: SessionHistory,
}

impl SessionState {
    pub fn new(local_identity: Identity, history_limit: usize) -> Self {
        Self {
            session_id: SessionId::new(),
            local_identity,
            remote_identity: None,
            role: None,
            call_state: CallState::Idle,
            local_stream: None,
            remote_stream: None,
            pending_remote_signal: None,
            local_description: None,
            remote_description: None,
            failure: None,
            termination: None,
            history: SessionHistory::new(history_limit),
        }
    }

    /// Move to `new_state` and log the transition
    pub fn transition_to(&mut self, new_state: CallState, event: EventKind, actions: Vec<Action>) {
        self.history.record(TransitionRecord {
            timestamp: Utc::now(),
            from_state: self.call_state,
            event,
            to_state: new_state,
            actions,
        });
        self.call_state = new_state;
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn is_terminal(&self) -> bool {
        self.call_state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = SessionState::new(Identity::from("doc-1"), 8);
        assert_eq!(session.call_state, CallState::Idle);
        assert!(session.role.is_none());
        assert!(session.history().is_empty());
        assert!(session.session_id.0.starts_with("session-"));
    }

    #[test]
    fn test_transition_records_history() {
        let mut session = SessionState::new(Identity::from("doc-1"), 8);
        session.transition_to(
            CallState::AwaitingLocalMedia,
            EventKind::RequestMedia,
            vec![Action::AcquireLocalMedia],
        );

        assert_eq!(session.call_state, CallState::AwaitingLocalMedia);
        let last = session.history().last().unwrap();
        assert_eq!(last.from_state, CallState::Idle);
        assert_eq!(last.to_state, CallState::AwaitingLocalMedia);
        assert_eq!(last.actions, vec![Action::AcquireLocalMedia]);
    }
}
